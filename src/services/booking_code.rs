use chrono::{DateTime, Utc};

/// Human-facing booking reference, `BK-YYYY-MMDDHH-NNNN`.
///
/// Display only: the random suffix can collide, so never key on it.
pub fn generate(at: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().as_u128() % 10_000;
    format!("BK-{}-{suffix:04}", at.format("%Y-%m%d%H"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_code_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 9, 5, 0).unwrap();
        let code = generate(at);

        assert!(code.starts_with("BK-2024-031009-"), "{code}");
        let suffix = &code["BK-2024-031009-".len()..];
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }
}
