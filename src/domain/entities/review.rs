use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub booking_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub salon_id: String,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub booking_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}

impl NewReview {
    pub fn validate(&self) -> Result<(), String> {
        validate_rating(self.rating)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewUpdate {
    pub fn validate(&self) -> Result<(), String> {
        self.rating.map_or(Ok(()), validate_rating)
    }
}

fn validate_rating(rating: i32) -> Result<(), String> {
    if !(1..=5).contains(&rating) {
        return Err(format!("Rating must be between 1 and 5, got {}", rating));
    }
    Ok(())
}
