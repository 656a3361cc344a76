use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::BookingError;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Booking-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Customer submission not yet routed to staff.
    Pending,
    AwaitingStaffApproval,
    /// Some services accepted, others still outstanding.
    PartiallyApproved,
    Confirmed,
    StaffRejected,
    Completed,
    Canceled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 7] = [
        BookingStatus::Pending,
        BookingStatus::AwaitingStaffApproval,
        BookingStatus::PartiallyApproved,
        BookingStatus::Confirmed,
        BookingStatus::StaffRejected,
        BookingStatus::Completed,
        BookingStatus::Canceled,
    ];

    /// Statuses that hold their time slot.
    pub const BLOCKING: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::AwaitingStaffApproval,
        BookingStatus::PartiallyApproved,
        BookingStatus::Confirmed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::AwaitingStaffApproval => "awaiting_staff_approval",
            BookingStatus::PartiallyApproved => "partially_approved",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::StaffRejected => "staff_rejected",
            BookingStatus::Completed => "completed",
            BookingStatus::Canceled => "canceled",
        }
    }

    /// Parses a stored or client-supplied status. Case, separators and the
    /// British `cancelled` spelling are normalised here and nowhere else.
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "pending" => Some(BookingStatus::Pending),
            "awaitingstaffapproval" => Some(BookingStatus::AwaitingStaffApproval),
            "partiallyapproved" => Some(BookingStatus::PartiallyApproved),
            "confirmed" => Some(BookingStatus::Confirmed),
            "staffrejected" => Some(BookingStatus::StaffRejected),
            "completed" => Some(BookingStatus::Completed),
            "canceled" | "cancelled" => Some(BookingStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_blocking(&self) -> bool {
        Self::BLOCKING.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Canceled)
    }

    /// Statuses computed from the services' approvals rather than set directly.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            BookingStatus::AwaitingStaffApproval
                | BookingStatus::PartiallyApproved
                | BookingStatus::Confirmed
                | BookingStatus::StaffRejected
        )
    }

    /// Whether staff responses and reassignments may still change this booking.
    pub fn is_open_for_approval(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending
                | BookingStatus::AwaitingStaffApproval
                | BookingStatus::PartiallyApproved
                | BookingStatus::StaffRejected
        )
    }

    pub fn allowed_next(&self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            Pending => &[AwaitingStaffApproval, Canceled],
            AwaitingStaffApproval => &[PartiallyApproved, Confirmed, StaffRejected, Canceled],
            PartiallyApproved => &[Confirmed, StaffRejected, Canceled],
            StaffRejected => &[AwaitingStaffApproval, PartiallyApproved, Canceled],
            Confirmed => &[Completed, Canceled],
            Completed | Canceled => &[],
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn validate_transition(&self, next: BookingStatus) -> Result<(), BookingError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(BookingError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-service approval state set by the assigned staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    NeedsAssignment,
    Pending,
    Accepted,
    Rejected,
}

impl ApprovalStatus {
    pub const ALL: [ApprovalStatus; 4] = [
        ApprovalStatus::NeedsAssignment,
        ApprovalStatus::Pending,
        ApprovalStatus::Accepted,
        ApprovalStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::NeedsAssignment => "needs_assignment",
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Accepted => "accepted",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    /// Staff responses only: reassignment resets through a separate path.
    pub fn can_become(&self, next: ApprovalStatus) -> bool {
        matches!(
            (self, next),
            (ApprovalStatus::NeedsAssignment, ApprovalStatus::Accepted)
                | (ApprovalStatus::Pending, ApprovalStatus::Accepted)
                | (ApprovalStatus::Pending, ApprovalStatus::Rejected)
        )
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One deliverable within a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingService {
    pub service_id: String,
    pub name: String,
    /// `None` means any qualified staff member.
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default, with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub approval: ApprovalStatus,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_by: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub tenant_id: String,
    pub id: String,
    pub code: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    pub client: ClientInfo,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    pub status: BookingStatus,
    #[serde(default)]
    pub services: Vec<BookingService>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    pub created_by: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// `[start, end)` of a service in minutes since midnight.
    pub fn service_window(&self, service: &BookingService) -> (u32, u32) {
        let start = minutes_of(service.start_time.unwrap_or(self.time));
        let duration = service.duration_minutes.unwrap_or(self.duration_minutes);
        (start, start.saturating_add(duration))
    }

    pub fn approvals(&self) -> Vec<ApprovalStatus> {
        self.services.iter().map(|s| s.approval).collect()
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    /// Distinct assigned staff ids in service order.
    pub fn staff_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.services.iter().filter_map(|s| s.staff_id.as_ref()) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    pub fn is_assigned_to(&self, staff_id: &str) -> bool {
        self.services
            .iter()
            .any(|s| s.staff_id.as_deref() == Some(staff_id))
            || self.staff_id.as_deref() == Some(staff_id)
    }

    pub fn service_index(&self, service_id: &str) -> Option<usize> {
        self.services.iter().position(|s| s.service_id == service_id)
    }

    /// Keeps the primary staff field in step with the first service.
    pub fn sync_primary_staff(&mut self) {
        if let Some(first) = self.services.first() {
            self.staff_id = first.staff_id.clone();
        }
    }
}

pub fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Parses `HH:MM`, also accepting a trailing `:SS`.
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw).ok_or_else(|| de::Error::custom(format!("invalid time: {raw}")))
    }
}

pub(crate) mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.collect_str(&t.format("%H:%M")),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => super::parse_hhmm(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid time: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_normalises_spellings() {
        assert_eq!(BookingStatus::parse("cancelled"), Some(BookingStatus::Canceled));
        assert_eq!(BookingStatus::parse("Canceled"), Some(BookingStatus::Canceled));
        assert_eq!(
            BookingStatus::parse("AwaitingStaffApproval"),
            Some(BookingStatus::AwaitingStaffApproval)
        );
        assert_eq!(
            BookingStatus::parse("staff-rejected"),
            Some(BookingStatus::StaffRejected)
        );
        assert_eq!(BookingStatus::parse("archived"), None);
    }

    #[test]
    fn test_status_as_str_parses_back() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_documented_edges_are_allowed() {
        use BookingStatus::*;
        let edges = [
            (Pending, AwaitingStaffApproval),
            (Pending, Canceled),
            (AwaitingStaffApproval, Confirmed),
            (AwaitingStaffApproval, StaffRejected),
            (StaffRejected, AwaitingStaffApproval),
            (StaffRejected, Canceled),
            (Confirmed, Completed),
            (Confirmed, Canceled),
        ];
        for (from, to) in edges {
            assert!(from.validate_transition(to).is_ok(), "{from} -> {to}");
        }
    }

    #[test]
    fn test_undocumented_edges_are_rejected() {
        use BookingStatus::*;
        assert!(Pending.validate_transition(Confirmed).is_err());
        assert!(Pending.validate_transition(Completed).is_err());
        assert!(Confirmed.validate_transition(Pending).is_err());
        assert!(StaffRejected.validate_transition(Confirmed).is_err());
        assert!(AwaitingStaffApproval.validate_transition(Completed).is_err());
        for status in BookingStatus::ALL {
            assert!(Completed.validate_transition(status).is_err());
            assert!(Canceled.validate_transition(status).is_err());
            // self-edges are never transitions
            assert!(status.validate_transition(status).is_err());
        }
    }

    #[test]
    fn test_blocking_statuses() {
        assert!(BookingStatus::Pending.is_blocking());
        assert!(BookingStatus::Confirmed.is_blocking());
        assert!(!BookingStatus::StaffRejected.is_blocking());
        assert!(!BookingStatus::Completed.is_blocking());
        assert!(!BookingStatus::Canceled.is_blocking());
    }

    #[test]
    fn test_service_edges() {
        use ApprovalStatus::*;
        assert!(NeedsAssignment.can_become(Accepted));
        assert!(Pending.can_become(Accepted));
        assert!(Pending.can_become(Rejected));
        assert!(!NeedsAssignment.can_become(Rejected));
        assert!(!Accepted.can_become(Rejected));
        assert!(!Rejected.can_become(Accepted));
        assert!(!Accepted.can_become(Pending));
    }

    #[test]
    fn test_hhmm_accepts_seconds() {
        assert_eq!(parse_hhmm("10:30"), NaiveTime::from_hms_opt(10, 30, 0));
        assert_eq!(parse_hhmm("10:30:00"), NaiveTime::from_hms_opt(10, 30, 0));
        assert_eq!(parse_hhmm("25:00"), None);
    }

    #[test]
    fn test_service_deserializes_without_optional_fields() {
        let json = r#"{"service_id":"cut","name":"Haircut","approval":"pending","start_time":"11:15"}"#;
        let svc: BookingService = serde_json::from_str(json).unwrap();
        assert_eq!(svc.staff_id, None);
        assert_eq!(svc.start_time, NaiveTime::from_hms_opt(11, 15, 0));
        assert_eq!(svc.approval, ApprovalStatus::Pending);
    }
}
