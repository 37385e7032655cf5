use chrono::{DateTime, Utc};

/// Source of "now" for scheduling guards.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
