use crate::domain::services::SlotGrid;
use chrono::NaiveTime;
use chrono_tz::Tz;
use std::env;

/// `DATABASE_URL` value selecting the in-process store.
pub const MEMORY_STORE_URL: &str = "memory";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub timezone: Tz,
    pub slot_grid: SlotGrid,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source, `from_env` being the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let database_url = var("DATABASE_URL", "sqlite::memory:");

        let timezone_name = var("SALON_TIMEZONE", "UTC");
        let timezone = timezone_name
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(timezone_name.clone()))?;

        let open = parse_time("SLOT_OPEN", var("SLOT_OPEN", "09:00"))?;
        let close = parse_time("SLOT_CLOSE", var("SLOT_CLOSE", "20:00"))?;

        let interval_minutes = var("SLOT_INTERVAL_MINUTES", "30")
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidInterval)?;

        let slot_grid = SlotGrid::new(open, close, interval_minutes).map_err(ConfigError::InvalidSlotGrid)?;

        Ok(Config {
            database_url,
            timezone,
            slot_grid,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_STORE_URL
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: MEMORY_STORE_URL.to_string(),
            timezone: Tz::UTC,
            slot_grid: SlotGrid::default(),
        }
    }
}

fn parse_time(var: &'static str, raw: String) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| ConfigError::InvalidTime { var, value: raw })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown timezone in SALON_TIMEZONE: {0}")]
    InvalidTimezone(String),

    #[error("{var} must be HH:MM, got {value:?}")]
    InvalidTime { var: &'static str, value: String },

    #[error("SLOT_INTERVAL_MINUTES must be a positive integer")]
    InvalidInterval,

    #[error("Invalid slot grid: {0}")]
    InvalidSlotGrid(String),
}
