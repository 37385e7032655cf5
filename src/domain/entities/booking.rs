use crate::domain::ports::data_store::{Filter, Filters};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingConfirmation,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Statuses that keep a (salon, date, time) slot occupied.
    pub const ACTIVE: [BookingStatus; 2] = [BookingStatus::PendingConfirmation, BookingStatus::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingConfirmation => "pending_confirmation",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    pub fn holds_slot(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_confirmation" => Ok(BookingStatus::PendingConfirmation),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "no_show" | "no-show" => Ok(BookingStatus::NoShow),
            other => Err(format!("Invalid booking status: {}", other)),
        }
    }
}

/// Payment is settled at the salon; only the bookkeeping flag lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// Start time of a booking slot, minute precision.
///
/// Stored as `HH:MM`; parsed from either `14:00` or the `2:00 PM` labels shown to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn new(time: NaiveTime) -> Self {
        // Seconds never matter for a slot.
        Self(time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// 12-hour label, e.g. `2:00 PM`.
    pub fn label(&self) -> String {
        self.0.format("%-I:%M %p").to_string()
    }

    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.0)
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for SlotTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"]
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
            .map(SlotTime::new)
            .ok_or_else(|| format!("Invalid booking time: {}", s))
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub salon_id: String,
    pub service_id: String,
    pub booking_date: NaiveDate,
    pub booking_time: SlotTime,
    pub duration_minutes: i32,
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Salon-local start of the appointment.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.booking_time.on(self.booking_date)
    }

    pub fn is_booked_by(&self, user_id: &str) -> bool {
        self.customer_id.as_deref() == Some(user_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBooking {
    pub salon_id: String,
    pub service_id: String,
    pub booking_date: NaiveDate,
    pub booking_time: SlotTime,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub notes: Option<String>,
    /// Customer the booking is made for. Customers may only name themselves; admins may book on behalf of anyone.
    #[serde(default)]
    pub customer_id: Option<String>,
}

impl CreateBooking {
    pub fn validate(&self) -> Result<(), String> {
        if self.customer_name.trim().is_empty() {
            return Err("Customer name is required".to_string());
        }
        if self.customer_phone.trim().is_empty() {
            return Err("Customer phone is required".to_string());
        }
        if !email_address::EmailAddress::is_valid(self.customer_email.trim()) {
            return Err(format!("Invalid customer email: {}", self.customer_email));
        }
        Ok(())
    }
}

/// Dashboard filters for the bookings tab.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub salon_id: Option<String>,
    pub customer_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl BookingFilter {
    pub fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        if let Some(status) = self.status {
            filters.push(Filter::eq("status", status.as_str()));
        }
        if let Some(salon_id) = &self.salon_id {
            filters.push(Filter::eq("salon_id", salon_id.as_str()));
        }
        if let Some(customer_id) = &self.customer_id {
            filters.push(Filter::eq("customer_id", customer_id.as_str()));
        }
        if let Some(from) = self.date_from {
            filters.push(Filter::gte("booking_date", from.to_string()));
        }
        if let Some(to) = self.date_to {
            filters.push(Filter::lte("booking_date", to.to_string()));
        }
        filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_time_parses_labels_and_24h() {
        let from_label: SlotTime = "2:00 PM".parse().unwrap();
        let from_24h: SlotTime = "14:00".parse().unwrap();
        assert_eq!(from_label, from_24h);
        assert_eq!(from_label.to_string(), "14:00");
        assert_eq!(from_label.label(), "2:00 PM");
        assert_eq!("9:30 AM".parse::<SlotTime>().unwrap(), SlotTime::from_hm(9, 30).unwrap());
    }

    #[test]
    fn test_slot_time_rejects_garbage() {
        assert!("half past two".parse::<SlotTime>().is_err());
        assert!("25:00".parse::<SlotTime>().is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::PendingConfirmation).unwrap(),
            "\"pending_confirmation\""
        );
        assert_eq!(serde_json::to_string(&BookingStatus::NoShow).unwrap(), "\"no_show\"");
        assert_eq!("no-show".parse::<BookingStatus>().unwrap(), BookingStatus::NoShow);
    }

    #[test]
    fn test_only_active_statuses_hold_slot() {
        assert!(BookingStatus::PendingConfirmation.holds_slot());
        assert!(BookingStatus::Confirmed.holds_slot());
        assert!(!BookingStatus::Cancelled.holds_slot());
        assert!(!BookingStatus::Completed.holds_slot());
        assert!(!BookingStatus::NoShow.holds_slot());
    }

    #[test]
    fn test_booking_filter_builds_date_range() {
        let filter = BookingFilter {
            status: Some(BookingStatus::Confirmed),
            date_from: NaiveDate::from_ymd_opt(2024, 6, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 6, 30),
            ..Default::default()
        };
        let filters = filter.to_filters();
        assert_eq!(filters.len(), 3);
        assert!(filters.iter().any(|f| f == &Filter::gte("booking_date", "2024-06-01")));
    }
}
