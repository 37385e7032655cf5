use crate::domain::ports::data_store::{Filter, Filters};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalonStatus {
    Active,
    Pending,
    Suspended,
}

impl SalonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalonStatus::Active => "active",
            SalonStatus::Pending => "pending",
            SalonStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for SalonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salon {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub status: SalonStatus,
    /// Sum of review stars. Kept next to `total_reviews` so both move by increments.
    #[serde(default)]
    pub rating_total: i64,
    #[serde(default)]
    pub total_reviews: i64,
    #[serde(default)]
    pub total_bookings: i64,
    #[serde(default)]
    pub total_revenue: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Salon {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }

    pub fn accepts_bookings(&self) -> bool {
        self.status == SalonStatus::Active
    }

    /// Mean review rating rounded to two decimals, `None` before the first review.
    pub fn rating(&self) -> Option<f64> {
        if self.total_reviews <= 0 {
            return None;
        }
        let mean = self.rating_total as f64 / self.total_reviews as f64;
        Some((mean * 100.0).round() / 100.0)
    }

    /// Case-insensitive substring match on name and description.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// Listing filters for the salon directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalonFilter {
    pub status: Option<SalonStatus>,
    pub city: Option<String>,
    /// Free text matched against name and description.
    pub search: Option<String>,
}

impl SalonFilter {
    pub fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        if let Some(status) = self.status {
            filters.push(Filter::eq("status", status.as_str()));
        }
        if let Some(city) = &self.city {
            filters.push(Filter::eq("city", city.as_str()));
        }
        filters
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSalon {
    pub name: String,
    pub description: Option<String>,
    /// Only honoured when an admin registers the salon on someone's behalf.
    pub owner_id: Option<String>,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
}

impl NewSalon {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Salon name cannot be empty".to_string());
        }
        if !email_address::EmailAddress::is_valid(self.email.trim()) {
            return Err(format!("Invalid salon email: {}", self.email));
        }
        if self.phone.trim().is_empty() {
            return Err("Salon phone cannot be empty".to_string());
        }
        if self.address.trim().is_empty() || self.city.trim().is_empty() {
            return Err("Salon address and city are required".to_string());
        }
        Ok(())
    }

    pub fn into_salon(self, owner_id: Option<String>, status: SalonStatus, now: DateTime<Utc>) -> Salon {
        Salon {
            id: Uuid::new_v4().to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            owner_id,
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            status,
            rating_total: 0,
            total_reviews: 0,
            total_bookings: 0,
            total_revenue: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Profile fields an owner may edit. Status and counters are not part of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalonUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl SalonUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Salon name cannot be empty".to_string());
            }
        }
        if let Some(email) = &self.email {
            if !email_address::EmailAddress::is_valid(email.trim()) {
                return Err(format!("Invalid salon email: {}", email));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salon(description: Option<&str>) -> Salon {
        NewSalon {
            name: "Glow Studio".to_string(),
            description: description.map(str::to_string),
            owner_id: None,
            email: "hello@glow.example.com".to_string(),
            phone: "555-0100".to_string(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
        }
        .into_salon(None, SalonStatus::Active, Utc::now())
    }

    #[test]
    fn test_rating_is_mean_of_stars() {
        let mut s = salon(None);
        assert_eq!(s.rating(), None);

        s.rating_total = 14;
        s.total_reviews = 3;
        assert_eq!(s.rating(), Some(4.67));
    }

    #[test]
    fn test_search_matches_name_or_description() {
        let s = salon(Some("Balayage and colour"));
        assert!(s.matches_search("glow"));
        assert!(s.matches_search("BALAYAGE"));
        assert!(s.matches_search("  "));
        assert!(!s.matches_search("barber"));
        assert!(!salon(None).matches_search("colour"));
    }
}
