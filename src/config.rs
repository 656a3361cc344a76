use std::env;

/// What slot-conflict validation does when existing bookings cannot be read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictCheckPolicy {
    /// Reject the booking with `DependencyUnavailable`.
    FailClosed,
    /// Admit the booking and log a warning.
    FailOpen,
}

impl ConflictCheckPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" | "fail_closed" | "closed" => Some(ConflictCheckPolicy::FailClosed),
            "allow" | "fail_open" | "open" => Some(ConflictCheckPolicy::FailOpen),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub conflict_check_policy: ConflictCheckPolicy,
    pub event_channel_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "salonbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            conflict_check_policy: env::var("CONFLICT_CHECK_ON_STORAGE_ERROR")
                .ok()
                .and_then(|v| ConflictCheckPolicy::parse(&v))
                .unwrap_or(ConflictCheckPolicy::FailClosed),
            event_channel_capacity: env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(256),
        }
    }

    pub fn sms_enabled(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_phone_number.is_empty()
    }
}
