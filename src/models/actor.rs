use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    BranchAdmin,
    Staff,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::BranchAdmin => "branch_admin",
            Role::Staff => "staff",
            Role::Customer => "customer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "owner" | "salon_owner" => Some(Role::Owner),
            "branch_admin" | "admin" => Some(Role::BranchAdmin),
            "staff" | "stylist" => Some(Role::Staff),
            "customer" | "client" => Some(Role::Customer),
            _ => None,
        }
    }

    /// Owners and branch admins manage bookings on behalf of the salon.
    pub fn is_manager(&self) -> bool {
        matches!(self, Role::Owner | Role::BranchAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ANONYMOUS_ID: &str = "anonymous";

/// Whoever triggered a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_ID, Role::Customer)
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == ANONYMOUS_ID
    }
}
