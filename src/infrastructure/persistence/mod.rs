pub mod memory;
pub mod sql;

pub use memory::{MemoryStore, UniqueIndex};
pub use sql::SqlStore;

use crate::domain::entities::BookingStatus;
use crate::domain::ports::data_store::{Filter, Filters, Table};

/// Mirrors `idx_records_active_slot`: one pending or confirmed booking per (salon, date, time).
pub fn booking_slot_index() -> UniqueIndex {
    UniqueIndex::new(
        "idx_records_active_slot",
        Table::Bookings,
        &["salon_id", "booking_date", "booking_time"],
        Filters::new().with(Filter::in_values(
            "status",
            BookingStatus::ACTIVE.iter().map(|s| s.as_str()),
        )),
    )
}

/// Mirrors `idx_records_review_booking`: one review per booking.
pub fn review_booking_index() -> UniqueIndex {
    UniqueIndex::new("idx_records_review_booking", Table::Reviews, &["booking_id"], Filters::new())
}

/// Memory store carrying the same unique indexes as the SQL schema.
pub fn memory_store() -> MemoryStore {
    MemoryStore::new()
        .with_unique_index(booking_slot_index())
        .with_unique_index(review_booking_index())
}
