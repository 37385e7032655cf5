use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable offering of a salon (haircut, colouring, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub salon_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price: Decimal,
    pub category: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price: Decimal,
    pub category: String,
}

impl NewService {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Service name cannot be empty".to_string());
        }
        validate_terms(Some(self.duration_minutes), Some(self.price))
    }

    pub fn into_service(self, salon_id: String, now: DateTime<Utc>) -> Service {
        Service {
            id: Uuid::new_v4().to_string(),
            salon_id,
            name: self.name.trim().to_string(),
            description: self.description,
            duration_minutes: self.duration_minutes,
            price: self.price,
            category: self.category,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ServiceUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Service name cannot be empty".to_string());
            }
        }
        validate_terms(self.duration_minutes, self.price)
    }
}

fn validate_terms(duration_minutes: Option<i32>, price: Option<Decimal>) -> Result<(), String> {
    if let Some(duration) = duration_minutes {
        if duration <= 0 {
            return Err(format!("Service duration must be positive, got {}", duration));
        }
    }
    if let Some(price) = price {
        if price.is_sign_negative() {
            return Err(format!("Service price cannot be negative, got {}", price));
        }
    }
    Ok(())
}
