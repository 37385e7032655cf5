use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Membership of a user in a salon's team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalonStaff {
    pub id: String,
    pub salon_id: String,
    pub user_id: String,
    /// Job title shown on the salon page, e.g. "stylist".
    pub role: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    pub user_id: String,
    pub role: String,
}

impl NewStaff {
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("Staff member must reference a user".to_string());
        }
        if self.role.trim().is_empty() {
            return Err("Staff role cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn into_staff(self, salon_id: String, now: DateTime<Utc>) -> SalonStaff {
        SalonStaff {
            id: Uuid::new_v4().to_string(),
            salon_id,
            user_id: self.user_id.trim().to_string(),
            role: self.role.trim().to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl StaffUpdate {
    pub fn validate(&self) -> Result<(), String> {
        match &self.role {
            Some(role) if role.trim().is_empty() => Err("Staff role cannot be empty".to_string()),
            _ => Ok(()),
        }
    }
}
