use std::collections::HashMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffStatus {
    Active,
    Suspended,
    Inactive,
}

impl StaffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffStatus::Active => "active",
            StaffStatus::Suspended => "suspended",
            StaffStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(StaffStatus::Active),
            "suspended" => Some(StaffStatus::Suspended),
            "inactive" | "disabled" => Some(StaffStatus::Inactive),
            _ => None,
        }
    }
}

/// A staff member as the directory knows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub status: StaffStatus,
    /// Primary branch, used when no weekly schedule is set.
    #[serde(default)]
    pub branch_id: Option<String>,
    /// Day of week -> branch worked that day.
    #[serde(default)]
    pub weekly_schedule: HashMap<Weekday, String>,
}

impl StaffRecord {
    pub fn is_active(&self) -> bool {
        self.status == StaffStatus::Active
    }

    /// Branch this staff member works at on `day`, if any.
    pub fn branch_on(&self, day: Weekday) -> Option<&str> {
        if self.weekly_schedule.is_empty() {
            self.branch_id.as_deref()
        } else {
            self.weekly_schedule.get(&day).map(String::as_str)
        }
    }
}

/// Staff qualification allow-list for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    /// `None` means every active staff member may perform it.
    #[serde(default)]
    pub staff_ids: Option<Vec<String>>,
}
