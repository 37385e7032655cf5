use crate::domain::entities::{Booking, BookingStatus, Role, SalonStatus, SlotTime};
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot move booking from {from} to {to}")]
    IllegalEdge {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("slot no longer available")]
    SlotUnavailable,
    #[error("service is not active")]
    ServiceInactive,
    #[error("salon is not accepting bookings")]
    SalonUnavailable,
    #[error("booking date is in the past")]
    DateInPast,
    #[error("{0} is not a bookable time")]
    OffGrid(SlotTime),
    #[error("booking has already started")]
    AlreadyStarted,
    #[error("booking has not started yet")]
    NotYetStarted,
    #[error("customer checked in")]
    CheckedIn,
    #[error("cannot check in a {0} booking")]
    CheckInUnavailable(BookingStatus),
    #[error("cannot move salon from {from} to {to}")]
    IllegalSalonStatus { from: SalonStatus, to: SalonStatus },
}

/// Context for a booking transition, including who triggered it.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub booking_id: String,
    pub from_status: BookingStatus,
    pub to_status: BookingStatus,
    pub actor_id: String,
    /// Salon-local wall clock at the time of the request.
    pub now: NaiveDateTime,
}

/// Validates that `from -> to` is an edge of the booking lifecycle.
pub fn validate_transition(from: BookingStatus, to: BookingStatus) -> Result<(), TransitionError> {
    use BookingStatus::*;

    match (from, to) {
        (PendingConfirmation, Confirmed) => Ok(()),
        (PendingConfirmation, Cancelled) => Ok(()),
        (Confirmed, Cancelled) => Ok(()),
        (Confirmed, Completed) => Ok(()),
        (Confirmed, NoShow) => Ok(()),

        // Terminal states have no way out, and no state loops onto itself
        _ => Err(TransitionError::IllegalEdge { from, to }),
    }
}

/// Roles allowed to move a booking into `to`. Non-admin roles are further limited to their own scope.
pub fn allowed_actors(to: BookingStatus) -> &'static [Role] {
    match to {
        BookingStatus::PendingConfirmation => &[Role::Customer, Role::Admin],
        BookingStatus::Confirmed => &[Role::SalonOwner, Role::Admin],
        BookingStatus::Cancelled => &[Role::Customer, Role::SalonOwner, Role::Admin],
        BookingStatus::Completed | BookingStatus::NoShow => &[Role::SalonOwner, Role::Admin],
    }
}

/// Time-based guards of a transition.
pub fn check_preconditions(booking: &Booking, to: BookingStatus, now: NaiveDateTime) -> Result<(), TransitionError> {
    let started = booking.starts_at() <= now;

    match to {
        BookingStatus::Cancelled if started => Err(TransitionError::AlreadyStarted),
        BookingStatus::Completed if !started => Err(TransitionError::NotYetStarted),
        BookingStatus::NoShow if !started => Err(TransitionError::NotYetStarted),
        BookingStatus::NoShow if booking.checked_in_at.is_some() => Err(TransitionError::CheckedIn),
        _ => Ok(()),
    }
}

/// Full validation of a transition for an already loaded booking.
pub fn plan_transition(context: &TransitionContext, booking: &Booking) -> Result<(), TransitionError> {
    validate_transition(context.from_status, context.to_status)?;
    check_preconditions(booking, context.to_status, context.now)?;

    tracing::debug!(
        "Booking {} may move from {} to {} (actor {})",
        context.booking_id,
        context.from_status,
        context.to_status,
        context.actor_id
    );

    Ok(())
}

/// Admin-only salon moderation edges.
pub fn validate_salon_status(from: SalonStatus, to: SalonStatus) -> Result<(), TransitionError> {
    use SalonStatus::*;

    match (from, to) {
        (Pending, Active) | (Pending, Suspended) => Ok(()),
        (Active, Suspended) | (Suspended, Active) => Ok(()),
        _ => Err(TransitionError::IllegalSalonStatus { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PaymentStatus;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    const ALL: [BookingStatus; 5] = [
        BookingStatus::PendingConfirmation,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
    ];

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            id: "b1".to_string(),
            customer_id: Some("c1".to_string()),
            salon_id: "s1".to_string(),
            service_id: "svc1".to_string(),
            booking_date: NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(),
            booking_time: SlotTime::from_hm(14, 0).unwrap(),
            duration_minutes: 30,
            total_amount: Decimal::new(40, 0),
            status,
            payment_status: PaymentStatus::Pending,
            customer_name: "Jane".to_string(),
            customer_phone: "555-0100".to_string(),
            customer_email: "jane@example.com".to_string(),
            notes: None,
            checked_in_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_edges_follow_lifecycle_table() {
        let allowed = [
            (BookingStatus::PendingConfirmation, BookingStatus::Confirmed),
            (BookingStatus::PendingConfirmation, BookingStatus::Cancelled),
            (BookingStatus::Confirmed, BookingStatus::Cancelled),
            (BookingStatus::Confirmed, BookingStatus::Completed),
            (BookingStatus::Confirmed, BookingStatus::NoShow),
        ];

        for from in ALL {
            for to in ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(validate_transition(from, to).is_ok(), expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_same_state_is_rejected() {
        assert!(matches!(
            validate_transition(BookingStatus::Confirmed, BookingStatus::Confirmed),
            Err(TransitionError::IllegalEdge { .. })
        ));
    }

    #[test]
    fn test_cancel_requires_future_start() {
        let b = booking(BookingStatus::Confirmed);
        assert!(check_preconditions(&b, BookingStatus::Cancelled, at(19, 10)).is_ok());
        assert_eq!(
            check_preconditions(&b, BookingStatus::Cancelled, at(20, 14)),
            Err(TransitionError::AlreadyStarted)
        );
    }

    #[test]
    fn test_complete_requires_elapsed_start() {
        let b = booking(BookingStatus::Confirmed);
        assert_eq!(
            check_preconditions(&b, BookingStatus::Completed, at(20, 13)),
            Err(TransitionError::NotYetStarted)
        );
        assert!(check_preconditions(&b, BookingStatus::Completed, at(20, 15)).is_ok());
    }

    #[test]
    fn test_no_show_requires_missing_check_in() {
        let mut b = booking(BookingStatus::Confirmed);
        assert!(check_preconditions(&b, BookingStatus::NoShow, at(20, 15)).is_ok());
        b.checked_in_at = Some(Utc::now());
        assert_eq!(
            check_preconditions(&b, BookingStatus::NoShow, at(20, 15)),
            Err(TransitionError::CheckedIn)
        );
    }

    #[test]
    fn test_allowed_actors() {
        assert_eq!(allowed_actors(BookingStatus::Confirmed), &[Role::SalonOwner, Role::Admin]);
        assert!(!allowed_actors(BookingStatus::Completed).contains(&Role::Customer));
        assert!(!allowed_actors(BookingStatus::PendingConfirmation).contains(&Role::SalonOwner));
    }

    #[test]
    fn test_salon_status_edges() {
        assert!(validate_salon_status(SalonStatus::Pending, SalonStatus::Active).is_ok());
        assert!(validate_salon_status(SalonStatus::Suspended, SalonStatus::Active).is_ok());
        assert!(validate_salon_status(SalonStatus::Active, SalonStatus::Pending).is_err());
        assert!(validate_salon_status(SalonStatus::Active, SalonStatus::Active).is_err());
    }
}
