use chrono::{Datelike, NaiveDate};

use crate::services::store::StaffDirectory;

/// Whether anyone other than `rejecting_staff` could take over `service_id`.
///
/// This is an existence check, not a free-slot search. Lookup failures count
/// as "no alternative", which leads the caller toward cancellation.
pub async fn has_alternative(
    directory: &dyn StaffDirectory,
    tenant: &str,
    service_id: &str,
    rejecting_staff: &str,
    branch_id: Option<&str>,
    date: NaiveDate,
) -> bool {
    let staff = match directory.list_active_staff(tenant).await {
        Ok(staff) => staff,
        Err(e) => {
            tracing::error!(tenant, service_id, error = %e, "staff lookup failed, assuming no alternative");
            return false;
        }
    };

    let allow_list = match directory.service_allow_list(tenant, service_id).await {
        Ok(list) => list,
        Err(e) => {
            tracing::error!(tenant, service_id, error = %e, "allow-list lookup failed, assuming no alternative");
            return false;
        }
    };

    let weekday = date.weekday();
    let found = staff
        .iter()
        .filter(|s| s.is_active())
        .filter(|s| s.id != rejecting_staff)
        .filter(|s| match &allow_list {
            Some(ids) => ids.iter().any(|id| id == &s.id),
            None => true,
        })
        .any(|s| match branch_id {
            Some(branch) => s.branch_on(weekday) == Some(branch),
            None => true,
        });

    tracing::debug!(tenant, service_id, rejecting_staff, found, "alternative staff lookup");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ServiceRecord, StaffRecord, StaffStatus};
    use async_trait::async_trait;
    use chrono::Weekday;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockDirectory {
        staff: Vec<StaffRecord>,
        allow_lists: HashMap<String, Vec<String>>,
        fail_staff: bool,
        fail_allow_list: bool,
    }

    #[async_trait]
    impl StaffDirectory for MockDirectory {
        async fn list_active_staff(&self, _tenant: &str) -> anyhow::Result<Vec<StaffRecord>> {
            if self.fail_staff {
                anyhow::bail!("directory offline");
            }
            Ok(self.staff.clone())
        }

        async fn service_allow_list(
            &self,
            _tenant: &str,
            service_id: &str,
        ) -> anyhow::Result<Option<Vec<String>>> {
            if self.fail_allow_list {
                anyhow::bail!("directory offline");
            }
            Ok(self.allow_lists.get(service_id).cloned())
        }

        async fn upsert_staff(&self, _: &str, _: &StaffRecord) -> anyhow::Result<()> {
            Ok(())
        }

        async fn upsert_service(&self, _: &str, _: &ServiceRecord) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn member(id: &str, branch: Option<&str>, schedule: &[(Weekday, &str)]) -> StaffRecord {
        StaffRecord {
            id: id.to_string(),
            name: id.to_string(),
            phone: None,
            status: StaffStatus::Active,
            branch_id: branch.map(str::to_string),
            weekly_schedule: schedule.iter().map(|(d, b)| (*d, b.to_string())).collect(),
        }
    }

    // 2024-03-10 is a Sunday
    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[tokio::test]
    async fn test_other_active_staff_is_an_alternative() {
        let dir = MockDirectory {
            staff: vec![member("s1", None, &[]), member("s2", None, &[])],
            ..Default::default()
        };
        assert!(has_alternative(&dir, "t", "cut", "s1", None, sunday()).await);
    }

    #[tokio::test]
    async fn test_rejecting_staff_is_excluded() {
        let dir = MockDirectory {
            staff: vec![member("s1", None, &[])],
            ..Default::default()
        };
        assert!(!has_alternative(&dir, "t", "cut", "s1", None, sunday()).await);
    }

    #[tokio::test]
    async fn test_inactive_staff_are_excluded() {
        let mut suspended = member("s2", None, &[]);
        suspended.status = StaffStatus::Suspended;
        let dir = MockDirectory {
            staff: vec![member("s1", None, &[]), suspended],
            ..Default::default()
        };
        assert!(!has_alternative(&dir, "t", "cut", "s1", None, sunday()).await);
    }

    #[tokio::test]
    async fn test_allow_list_filters_candidates() {
        let mut allow_lists = HashMap::new();
        allow_lists.insert("color".to_string(), vec!["s1".to_string(), "s3".to_string()]);
        let dir = MockDirectory {
            staff: vec![member("s1", None, &[]), member("s2", None, &[])],
            allow_lists,
            ..Default::default()
        };
        // s2 is active but not qualified for color
        assert!(!has_alternative(&dir, "t", "color", "s1", None, sunday()).await);
        // no allow-list for cut
        assert!(has_alternative(&dir, "t", "cut", "s1", None, sunday()).await);
    }

    #[tokio::test]
    async fn test_branch_matched_by_weekly_schedule() {
        let dir = MockDirectory {
            staff: vec![
                member("s1", Some("north"), &[]),
                member("s2", Some("north"), &[(Weekday::Sun, "south"), (Weekday::Mon, "north")]),
            ],
            ..Default::default()
        };
        // s2 works south on Sundays despite a north primary branch
        assert!(!has_alternative(&dir, "t", "cut", "s1", Some("north"), sunday()).await);
        assert!(has_alternative(&dir, "t", "cut", "s1", Some("south"), sunday()).await);
    }

    #[tokio::test]
    async fn test_branch_falls_back_to_primary_assignment() {
        let dir = MockDirectory {
            staff: vec![member("s1", Some("north"), &[]), member("s2", Some("north"), &[])],
            ..Default::default()
        };
        assert!(has_alternative(&dir, "t", "cut", "s1", Some("north"), sunday()).await);
        assert!(!has_alternative(&dir, "t", "cut", "s1", Some("south"), sunday()).await);
    }

    #[tokio::test]
    async fn test_lookup_failure_means_no_alternative() {
        let dir = MockDirectory {
            staff: vec![member("s1", None, &[]), member("s2", None, &[])],
            fail_staff: true,
            ..Default::default()
        };
        assert!(!has_alternative(&dir, "t", "cut", "s1", None, sunday()).await);

        let dir = MockDirectory {
            staff: vec![member("s1", None, &[]), member("s2", None, &[])],
            fail_allow_list: true,
            ..Default::default()
        };
        assert!(!has_alternative(&dir, "t", "cut", "s1", None, sunday()).await);
    }
}
