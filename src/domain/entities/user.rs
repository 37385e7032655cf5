use crate::domain::entities::role::Role;
use crate::domain::ports::data_store::{Filter, Filters};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to an authenticated identity: id + role for evaluation, email for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_salon_owner(&self) -> bool {
        self.role == Role::SalonOwner
    }
}

/// Session user as reported by the authentication backend, before the profile is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
}

/// Row of the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            email: email.into(),
            full_name: None,
            avatar_url: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive substring match on full name and email.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self.email.to_lowercase().contains(&needle)
            || self
                .full_name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
    }
}

/// Filters for the admin user list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        match self.role {
            // Legacy profiles still carry "user"
            Some(Role::Customer) => filters.push(Filter::in_values("role", ["customer", "user"])),
            Some(role) => filters.push(Filter::eq("role", role.as_str())),
            None => {}
        }
        filters
    }
}
