use crate::domain::entities::resources::BOOKINGS;
use crate::domain::entities::{
    Action, Booking, BookingStatus, CreateBooking, Identity, PaymentStatus, Role, Salon, Service, SlotTime,
};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ports::clock::Clock;
use crate::domain::ports::data_store::{
    fetch_by_id, from_row, patch, to_row, DataStore, Filter, Filters, Mutation, Table,
};
use crate::domain::services::access::{require_identity, PermissionChecker};
use crate::domain::services::slots::SlotGrid;
use crate::domain::services::state_machine::{
    allowed_actors, plan_transition, TransitionContext, TransitionError,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Executes booking lifecycle transitions.
///
/// Checks run in a fixed order: role permission, ownership, state-machine edge, preconditions.
/// Nothing is written unless all of them pass, and every write is a single `apply` batch.
#[derive(Clone)]
pub struct BookingWorkflow {
    store: Arc<dyn DataStore>,
    permissions: Arc<dyn PermissionChecker>,
    clock: Arc<dyn Clock>,
    grid: SlotGrid,
    timezone: Tz,
}

impl BookingWorkflow {
    pub fn new(
        store: Arc<dyn DataStore>,
        permissions: Arc<dyn PermissionChecker>,
        clock: Arc<dyn Clock>,
        grid: SlotGrid,
        timezone: Tz,
    ) -> Self {
        Self {
            store,
            permissions,
            clock,
            grid,
            timezone,
        }
    }

    /// Salon-local wall clock.
    fn local_now(&self) -> NaiveDateTime {
        self.clock.now().with_timezone(&self.timezone).naive_local()
    }

    async fn load_booking(&self, booking_id: &str) -> CoreResult<Booking> {
        fetch_by_id(self.store.as_ref(), Table::Bookings, booking_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking {} not found", booking_id)))
    }

    async fn load_salon(&self, salon_id: &str) -> CoreResult<Salon> {
        fetch_by_id(self.store.as_ref(), Table::Salons, salon_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Salon {} not found", salon_id)))
    }

    async fn load_service(&self, service_id: &str) -> CoreResult<Service> {
        fetch_by_id(self.store.as_ref(), Table::Services, service_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Service {} not found", service_id)))
    }

    /// Role and ownership gate for moving an existing booking into `to`.
    fn authorize_transition(
        &self,
        identity: &Identity,
        booking: &Booking,
        salon: &Salon,
        to: BookingStatus,
    ) -> CoreResult<()> {
        self.permissions.require(identity, BOOKINGS, Action::Update)?;

        let actors = allowed_actors(to);
        if !actors.contains(&identity.role) {
            tracing::warn!("{} ({}) may not move bookings to {}", identity.email, identity.role, to);
            return Err(CoreError::access_denied(
                actors,
                format!("Cannot move booking {} to {}", booking.id, to),
            ));
        }

        let owns = match identity.role {
            Role::Admin => true,
            Role::SalonOwner => salon.is_owned_by(&identity.id),
            Role::Customer => booking.is_booked_by(&identity.id),
        };
        if !owns {
            tracing::warn!(
                "{} ({}) is outside the scope of booking {}",
                identity.email,
                identity.role,
                booking.id
            );
            let scope = match identity.role {
                Role::Customer => "Booking belongs to another customer",
                _ => "Booking belongs to a salon you do not own",
            };
            return Err(CoreError::access_denied(&[Role::Admin], scope));
        }

        Ok(())
    }

    /// Creation preconditions for a slot, evaluated against the salon-local `now`.
    /// `releasing` names a booking the same batch cancels, so its slot counts as free.
    async fn check_slot(
        &self,
        salon: &Salon,
        service: &Service,
        date: NaiveDate,
        time: SlotTime,
        now: NaiveDateTime,
        releasing: Option<&str>,
    ) -> CoreResult<()> {
        if service.salon_id != salon.id {
            return Err(CoreError::Validation(format!(
                "Service {} is not offered by salon {}",
                service.id, salon.id
            )));
        }
        if !service.is_active {
            return Err(TransitionError::ServiceInactive.into());
        }
        if !salon.accepts_bookings() {
            return Err(TransitionError::SalonUnavailable.into());
        }
        if !self.grid.contains(time) {
            return Err(TransitionError::OffGrid(time).into());
        }
        if date < now.date() || time.on(date) <= now {
            return Err(TransitionError::DateInPast.into());
        }

        let taken = self.slot_holders(&salon.id, date, Some(time)).await?;
        if taken.iter().any(|b| Some(b.id.as_str()) != releasing) {
            return Err(TransitionError::SlotUnavailable.into());
        }
        Ok(())
    }

    /// Bookings currently holding slots at a salon on a date, optionally a single time.
    async fn slot_holders(&self, salon_id: &str, date: NaiveDate, time: Option<SlotTime>) -> CoreResult<Vec<Booking>> {
        let mut filters = Filters::new()
            .with(Filter::eq("salon_id", salon_id))
            .with(Filter::eq("booking_date", date.to_string()))
            .with(Filter::in_values(
                "status",
                BookingStatus::ACTIVE.iter().map(|s| s.as_str()),
            ));
        if let Some(time) = time {
            filters.push(Filter::eq("booking_time", time.to_string()));
        }

        let rows = self.store.query(Table::Bookings, &filters, None).await?;
        Ok(rows.into_iter().map(from_row).collect::<Result<Vec<Booking>, _>>()?)
    }

    fn new_booking(
        &self,
        request: CreateBooking,
        customer_id: Option<String>,
        service: &Service,
        now: DateTime<Utc>,
    ) -> Booking {
        Booking {
            id: Uuid::new_v4().to_string(),
            customer_id,
            salon_id: request.salon_id,
            service_id: request.service_id,
            booking_date: request.booking_date,
            booking_time: request.booking_time,
            duration_minutes: service.duration_minutes,
            total_amount: service.price,
            status: BookingStatus::PendingConfirmation,
            payment_status: PaymentStatus::Pending,
            customer_name: request.customer_name.trim().to_string(),
            customer_phone: request.customer_phone.trim().to_string(),
            customer_email: request.customer_email.trim().to_string(),
            notes: request.notes,
            checked_in_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a `pending_confirmation` booking priced from the service's current price.
    #[tracing::instrument(skip(self, identity, request), fields(salon_id = %request.salon_id))]
    pub async fn create(&self, identity: Option<&Identity>, request: CreateBooking) -> CoreResult<Booking> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, BOOKINGS, Action::Create)?;

        let actors = allowed_actors(BookingStatus::PendingConfirmation);
        if !actors.contains(&identity.role) {
            return Err(CoreError::access_denied(actors, "Cannot create bookings"));
        }

        let customer_id = match identity.role {
            Role::Admin => request.customer_id.clone(),
            _ => {
                if request.customer_id.as_deref().is_some_and(|id| id != identity.id) {
                    tracing::warn!("{} tried to book on behalf of another customer", identity.email);
                    return Err(CoreError::access_denied(
                        &[Role::Admin],
                        "Cannot create bookings for another customer",
                    ));
                }
                Some(identity.id.clone())
            }
        };

        request.validate().map_err(CoreError::Validation)?;

        let service = self.load_service(&request.service_id).await?;
        let salon = self.load_salon(&request.salon_id).await?;
        self.check_slot(&salon, &service, request.booking_date, request.booking_time, self.local_now(), None)
            .await?;

        let now = self.clock.now();
        let booking = self.new_booking(request, customer_id, &service, now);

        self.store
            .apply(vec![
                Mutation::Insert {
                    table: Table::Bookings,
                    row: to_row(&booking)?,
                },
                Mutation::increment(Table::Salons, salon.id.as_str(), "total_bookings", 1),
                Mutation::Update {
                    table: Table::Salons,
                    id: salon.id.clone(),
                    patch: patch(json!({ "updated_at": now })),
                },
            ])
            .await?;

        tracing::info!(
            "Booking {} created at salon {} for {} {} ({})",
            booking.id,
            salon.id,
            booking.booking_date,
            booking.booking_time,
            booking.total_amount
        );
        Ok(booking)
    }

    async fn transition(&self, identity: Option<&Identity>, booking_id: &str, to: BookingStatus) -> CoreResult<Booking> {
        let identity = require_identity(identity)?;
        let booking = self.load_booking(booking_id).await?;
        let salon = self.load_salon(&booking.salon_id).await?;

        self.authorize_transition(identity, &booking, &salon, to)?;

        let context = TransitionContext {
            booking_id: booking.id.clone(),
            from_status: booking.status,
            to_status: to,
            actor_id: identity.id.clone(),
            now: self.local_now(),
        };
        plan_transition(&context, &booking)?;

        let now = self.clock.now();
        let mut updated = booking.clone();
        updated.status = to;
        updated.updated_at = now;

        let mut booking_patch = patch(json!({ "status": to, "updated_at": now }));
        let mut batch = Vec::with_capacity(3);

        let counter = match to {
            BookingStatus::Cancelled => {
                Some(Mutation::increment(Table::Salons, salon.id.as_str(), "total_bookings", -1))
            }
            BookingStatus::Completed => {
                updated.payment_status = PaymentStatus::Paid;
                booking_patch.insert("payment_status".to_string(), json!(PaymentStatus::Paid));
                Some(Mutation::increment(
                    Table::Salons,
                    salon.id.as_str(),
                    "total_revenue",
                    booking.total_amount,
                ))
            }
            _ => None,
        };
        if let Some(counter) = counter {
            batch.push(counter);
            batch.push(Mutation::Update {
                table: Table::Salons,
                id: salon.id.clone(),
                patch: patch(json!({ "updated_at": now })),
            });
        }

        batch.insert(
            0,
            Mutation::Update {
                table: Table::Bookings,
                id: booking.id.clone(),
                patch: booking_patch,
            },
        );
        self.store.apply(batch).await?;

        tracing::info!(
            "Booking {} moved from {} to {} by {} ({})",
            booking.id,
            booking.status,
            to,
            identity.email,
            identity.role
        );
        Ok(updated)
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn confirm(&self, identity: Option<&Identity>, booking_id: &str) -> CoreResult<Booking> {
        self.transition(identity, booking_id, BookingStatus::Confirmed).await
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn cancel(&self, identity: Option<&Identity>, booking_id: &str) -> CoreResult<Booking> {
        self.transition(identity, booking_id, BookingStatus::Cancelled).await
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn complete(&self, identity: Option<&Identity>, booking_id: &str) -> CoreResult<Booking> {
        self.transition(identity, booking_id, BookingStatus::Completed).await
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn mark_no_show(&self, identity: Option<&Identity>, booking_id: &str) -> CoreResult<Booking> {
        self.transition(identity, booking_id, BookingStatus::NoShow).await
    }

    /// Records the customer's arrival on a confirmed booking. Repeated check-ins keep the first time.
    #[tracing::instrument(skip(self, identity))]
    pub async fn check_in(&self, identity: Option<&Identity>, booking_id: &str) -> CoreResult<Booking> {
        let identity = require_identity(identity)?;
        let booking = self.load_booking(booking_id).await?;
        let salon = self.load_salon(&booking.salon_id).await?;

        // Check-in gates the no-show edge, so it takes the same actors
        self.authorize_transition(identity, &booking, &salon, BookingStatus::NoShow)?;

        if booking.status != BookingStatus::Confirmed {
            return Err(TransitionError::CheckInUnavailable(booking.status).into());
        }
        if booking.checked_in_at.is_some() {
            return Ok(booking);
        }

        let now = self.clock.now();
        self.store
            .apply(vec![Mutation::Update {
                table: Table::Bookings,
                id: booking.id.clone(),
                patch: patch(json!({ "checked_in_at": now, "updated_at": now })),
            }])
            .await?;

        tracing::info!("Booking {} checked in by {}", booking.id, identity.email);
        Ok(Booking {
            checked_in_at: Some(now),
            updated_at: now,
            ..booking
        })
    }

    /// Cancels the booking and creates a replacement at the new slot in one batch.
    ///
    /// The replacement is a fresh booking priced from the service's current price.
    #[tracing::instrument(skip(self, identity))]
    pub async fn reschedule(
        &self,
        identity: Option<&Identity>,
        booking_id: &str,
        booking_date: NaiveDate,
        booking_time: SlotTime,
    ) -> CoreResult<Booking> {
        let identity = require_identity(identity)?;
        let booking = self.load_booking(booking_id).await?;
        let salon = self.load_salon(&booking.salon_id).await?;

        // Both halves must be allowed: cancelling the old booking and creating the new one
        self.authorize_transition(identity, &booking, &salon, BookingStatus::Cancelled)?;
        self.permissions.require(identity, BOOKINGS, Action::Create)?;
        let creators = allowed_actors(BookingStatus::PendingConfirmation);
        if !creators.contains(&identity.role) {
            return Err(CoreError::access_denied(creators, "Cannot create bookings"));
        }

        let local_now = self.local_now();
        let context = TransitionContext {
            booking_id: booking.id.clone(),
            from_status: booking.status,
            to_status: BookingStatus::Cancelled,
            actor_id: identity.id.clone(),
            now: local_now,
        };
        plan_transition(&context, &booking)?;

        let service = self.load_service(&booking.service_id).await?;
        self.check_slot(&salon, &service, booking_date, booking_time, local_now, Some(booking.id.as_str()))
            .await?;

        let now = self.clock.now();
        let request = CreateBooking {
            salon_id: booking.salon_id.clone(),
            service_id: booking.service_id.clone(),
            booking_date,
            booking_time,
            customer_name: booking.customer_name.clone(),
            customer_phone: booking.customer_phone.clone(),
            customer_email: booking.customer_email.clone(),
            notes: booking.notes.clone(),
            customer_id: booking.customer_id.clone(),
        };
        let replacement = self.new_booking(request, booking.customer_id.clone(), &service, now);

        // Cancel and recreate leave total_bookings unchanged
        self.store
            .apply(vec![
                Mutation::Update {
                    table: Table::Bookings,
                    id: booking.id.clone(),
                    patch: patch(json!({ "status": BookingStatus::Cancelled, "updated_at": now })),
                },
                Mutation::Insert {
                    table: Table::Bookings,
                    row: to_row(&replacement)?,
                },
            ])
            .await?;

        tracing::info!(
            "Booking {} rescheduled as {} on {} {}",
            booking.id,
            replacement.id,
            replacement.booking_date,
            replacement.booking_time
        );
        Ok(replacement)
    }

    /// Free slots of a salon on a date. Past dates and already started slots are never offered.
    #[tracing::instrument(skip(self))]
    pub async fn availability(&self, salon_id: &str, date: NaiveDate) -> CoreResult<Vec<SlotTime>> {
        let now = self.local_now();
        if date < now.date() {
            return Ok(Vec::new());
        }

        let taken = self
            .slot_holders(salon_id, date, None)
            .await?
            .into_iter()
            .map(|b| b.booking_time);

        Ok(self
            .grid
            .available(taken)
            .into_iter()
            .filter(|slot| slot.on(date) > now)
            .collect())
    }
}
