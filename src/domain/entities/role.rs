use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exactly one role is held by each identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    // Profiles written by the hosted backend spell this role "user".
    #[serde(alias = "user")]
    Customer,
    SalonOwner,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::SalonOwner, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::SalonOwner => "salon_owner",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" | "user" => Ok(Role::Customer),
            "salon_owner" => Ok(Role::SalonOwner),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Admin,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Admin => "admin",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "admin" => Ok(Action::Admin),
            other => Err(format!("Unknown action: {}", other)),
        }
    }
}

/// A (resource, action) grant. Defined at build time, never created by users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Permission {
    pub resource: &'static str,
    pub action: Action,
}

impl Permission {
    pub const fn new(resource: &'static str, action: Action) -> Self {
        Self { resource, action }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

/// Resource tags permissions apply to.
pub mod resources {
    pub const USERS: &str = "users";
    pub const SALONS: &str = "salons";
    pub const SERVICES: &str = "services";
    pub const BOOKINGS: &str = "bookings";
    pub const REVIEWS: &str = "reviews";
    pub const STAFF: &str = "staff";
    pub const ANALYTICS: &str = "analytics";
    pub const PROFILE: &str = "profile";
    pub const DASHBOARD: &str = "dashboard";
}
