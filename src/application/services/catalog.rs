use crate::domain::entities::resources::{REVIEWS, SALONS, SERVICES, STAFF, USERS};
use crate::domain::entities::{
    Action, Booking, Identity, NewReview, NewSalon, NewService, NewStaff, Review, ReviewUpdate, Role, Salon,
    SalonStaff, SalonStatus, SalonUpdate, Service, ServiceUpdate, StaffUpdate, UserFilter, UserProfile,
};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ports::clock::Clock;
use crate::domain::ports::data_store::{
    fetch_all, fetch_by_id, from_row, patch, to_row, DataStore, Filter, Filters, Mutation, OrderBy, Row, Table,
};
use crate::domain::ports::identity_provider::IdentityProvider;
use crate::domain::services::access::{authorize, require_identity, PermissionChecker};
use crate::domain::services::state_machine::validate_salon_status;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Salons, services, staff, user roles and reviews.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn DataStore>,
    permissions: Arc<dyn PermissionChecker>,
    clock: Arc<dyn Clock>,
    identity_provider: Arc<dyn IdentityProvider>,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn DataStore>,
        permissions: Arc<dyn PermissionChecker>,
        clock: Arc<dyn Clock>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            permissions,
            clock,
            identity_provider,
        }
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

    async fn load_staff(&self, staff_id: &str) -> CoreResult<SalonStaff> {
        fetch_by_id(self.store.as_ref(), Table::Staff, staff_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Staff member {} not found", staff_id)))
    }

    /// Admins manage every salon; owners only their own.
    fn ensure_manages(&self, identity: &Identity, salon: &Salon) -> CoreResult<()> {
        if identity.is_admin() || (identity.is_salon_owner() && salon.is_owned_by(&identity.id)) {
            return Ok(());
        }
        tracing::warn!("{} ({}) does not manage salon {}", identity.email, identity.role, salon.id);
        Err(CoreError::access_denied(
            &[Role::Admin],
            format!("Salon {} belongs to another owner", salon.id),
        ))
    }

    /// Admins register active salons for any owner; salon owners self-register a pending salon.
    #[tracing::instrument(skip(self, identity, request))]
    pub async fn register_salon(&self, identity: Option<&Identity>, request: NewSalon) -> CoreResult<Salon> {
        authorize(identity, &[Role::SalonOwner, Role::Admin])?;
        let identity = require_identity(identity)?;
        request.validate().map_err(CoreError::Validation)?;

        let now = self.clock.now();
        let salon = if identity.is_admin() {
            self.permissions.require(identity, SALONS, Action::Create)?;
            let owner_id = request.owner_id.clone();
            request.into_salon(owner_id, SalonStatus::Active, now)
        } else {
            request.into_salon(Some(identity.id.clone()), SalonStatus::Pending, now)
        };

        self.store.insert(Table::Salons, to_row(&salon)?).await?;

        tracing::info!("Salon {} registered by {} with status {}", salon.id, identity.email, salon.status);
        Ok(salon)
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn set_salon_status(
        &self,
        identity: Option<&Identity>,
        salon_id: &str,
        status: SalonStatus,
    ) -> CoreResult<Salon> {
        authorize(identity, &[Role::Admin])?;
        let identity = require_identity(identity)?;
        self.permissions.require(identity, SALONS, Action::Update)?;

        let salon = self.load_salon(salon_id).await?;
        validate_salon_status(salon.status, status)?;

        let now = self.clock.now();
        let row = self
            .store
            .update(Table::Salons, salon_id, patch(json!({ "status": status, "updated_at": now })))
            .await?;

        tracing::info!("Salon {} moved from {} to {} by {}", salon_id, salon.status, status, identity.email);
        Ok(from_row(row)?)
    }

    #[tracing::instrument(skip(self, identity, update))]
    pub async fn update_salon(
        &self,
        identity: Option<&Identity>,
        salon_id: &str,
        update: SalonUpdate,
    ) -> CoreResult<Salon> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, SALONS, Action::Update)?;

        let salon = self.load_salon(salon_id).await?;
        self.ensure_manages(identity, &salon)?;
        update.validate().map_err(CoreError::Validation)?;

        let row = self
            .store
            .update(Table::Salons, salon_id, with_timestamp(to_row(&update)?, self.clock.now()))
            .await?;

        tracing::info!("Salon {} updated by {}", salon_id, identity.email);
        Ok(from_row(row)?)
    }

    #[tracing::instrument(skip(self, identity, request))]
    pub async fn create_service(
        &self,
        identity: Option<&Identity>,
        salon_id: &str,
        request: NewService,
    ) -> CoreResult<Service> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, SERVICES, Action::Create)?;

        let salon = self.load_salon(salon_id).await?;
        self.ensure_manages(identity, &salon)?;
        request.validate().map_err(CoreError::Validation)?;

        let service = request.into_service(salon.id.clone(), self.clock.now());
        self.store.insert(Table::Services, to_row(&service)?).await?;

        tracing::info!("Service {} ({}) added to salon {}", service.id, service.name, salon.id);
        Ok(service)
    }

    /// Existing bookings keep the price and duration they were created with.
    #[tracing::instrument(skip(self, identity, update))]
    pub async fn update_service(
        &self,
        identity: Option<&Identity>,
        service_id: &str,
        update: ServiceUpdate,
    ) -> CoreResult<Service> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, SERVICES, Action::Update)?;

        let service = self.load_service(service_id).await?;
        let salon = self.load_salon(&service.salon_id).await?;
        self.ensure_manages(identity, &salon)?;
        update.validate().map_err(CoreError::Validation)?;

        let row = self
            .store
            .update(Table::Services, service_id, with_timestamp(to_row(&update)?, self.clock.now()))
            .await?;

        tracing::info!("Service {} updated by {}", service_id, identity.email);
        Ok(from_row(row)?)
    }

    /// Soft delete: the service stays referenced by past bookings but takes no new ones.
    #[tracing::instrument(skip(self, identity))]
    pub async fn deactivate_service(&self, identity: Option<&Identity>, service_id: &str) -> CoreResult<Service> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, SERVICES, Action::Delete)?;

        let service = self.load_service(service_id).await?;
        let salon = self.load_salon(&service.salon_id).await?;
        self.ensure_manages(identity, &salon)?;

        let now = self.clock.now();
        let row = self
            .store
            .update(Table::Services, service_id, patch(json!({ "is_active": false, "updated_at": now })))
            .await?;

        tracing::info!("Service {} deactivated by {}", service_id, identity.email);
        Ok(from_row(row)?)
    }

    /// Public listing used by the salon page and the booking form.
    pub async fn list_active_services(&self, salon_id: &str) -> CoreResult<Vec<Service>> {
        let filters = Filters::new()
            .with(Filter::eq("salon_id", salon_id))
            .with(Filter::eq("is_active", true));
        Ok(fetch_all(self.store.as_ref(), Table::Services, &filters, Some(&OrderBy::asc("name"))).await?)
    }

    #[tracing::instrument(skip(self, identity, filter))]
    pub async fn list_users(&self, identity: Option<&Identity>, filter: &UserFilter) -> CoreResult<Vec<UserProfile>> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, USERS, Action::Read)?;

        let users: Vec<UserProfile> = fetch_all(
            self.store.as_ref(),
            Table::Users,
            &filter.to_filters(),
            Some(&OrderBy::desc("created_at")),
        )
        .await?;

        Ok(match filter.search.as_deref() {
            Some(needle) => users.into_iter().filter(|u| u.matches_search(needle)).collect(),
            None => users,
        })
    }

    /// Changes a user's role and tells the identity provider so a live session refreshes.
    #[tracing::instrument(skip(self, identity))]
    pub async fn update_user_role(
        &self,
        identity: Option<&Identity>,
        user_id: &str,
        role: Role,
    ) -> CoreResult<UserProfile> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, USERS, Action::Update)?;

        if identity.id == user_id {
            return Err(CoreError::Validation("Admins cannot change their own role".to_string()));
        }

        let profile: UserProfile = fetch_by_id(self.store.as_ref(), Table::Users, user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("User {} not found", user_id)))?;

        let now = self.clock.now();
        let row = self
            .store
            .update(Table::Users, user_id, patch(json!({ "role": role, "updated_at": now })))
            .await?;

        tracing::info!(
            "User {} role changed from {} to {} by {}",
            profile.email,
            profile.role,
            role,
            identity.email
        );
        self.identity_provider.role_changed(user_id, role);

        Ok(from_row(row)?)
    }

    /// Reviews a booking the customer made. The salon's rating and review count move in the same batch.
    #[tracing::instrument(skip(self, identity, request))]
    pub async fn create_review(&self, identity: Option<&Identity>, request: NewReview) -> CoreResult<Review> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, REVIEWS, Action::Create)?;
        request.validate().map_err(CoreError::Validation)?;

        let booking: Booking = fetch_by_id(self.store.as_ref(), Table::Bookings, &request.booking_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking {} not found", request.booking_id)))?;

        if !identity.is_admin() && !booking.is_booked_by(&identity.id) {
            tracing::warn!("{} tried to review booking {} of another customer", identity.email, booking.id);
            return Err(CoreError::access_denied(
                &[Role::Admin],
                "Only the customer who made the booking can review it",
            ));
        }

        let existing = self
            .store
            .query(Table::Reviews, &Filters::new().with(Filter::eq("booking_id", booking.id.as_str())), None)
            .await?;
        if !existing.is_empty() {
            return Err(CoreError::Validation(format!("Booking {} has already been reviewed", booking.id)));
        }

        let salon = self.load_salon(&booking.salon_id).await?;
        let now = self.clock.now();
        let review = Review {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            customer_id: booking.customer_id.clone(),
            salon_id: salon.id.clone(),
            rating: request.rating,
            comment: request.comment,
            is_verified: true,
            created_at: now,
            updated_at: now,
        };

        self.store
            .apply(vec![
                Mutation::Insert {
                    table: Table::Reviews,
                    row: to_row(&review)?,
                },
                Mutation::increment(Table::Salons, salon.id.as_str(), "total_reviews", 1),
                Mutation::increment(Table::Salons, salon.id.as_str(), "rating_total", review.rating),
                Mutation::Update {
                    table: Table::Salons,
                    id: salon.id.clone(),
                    patch: patch(json!({ "updated_at": now })),
                },
            ])
            .await?;

        tracing::info!("Review {} ({} stars) added to salon {}", review.id, review.rating, salon.id);
        Ok(review)
    }

    /// Edits a review. Only its author or an admin may; a new star count moves the salon rating in the same batch.
    #[tracing::instrument(skip(self, identity, update))]
    pub async fn update_review(
        &self,
        identity: Option<&Identity>,
        review_id: &str,
        update: ReviewUpdate,
    ) -> CoreResult<Review> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, REVIEWS, Action::Update)?;

        let review: Review = fetch_by_id(self.store.as_ref(), Table::Reviews, review_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Review {} not found", review_id)))?;

        if !identity.is_admin() && review.customer_id.as_deref() != Some(identity.id.as_str()) {
            tracing::warn!("{} tried to edit review {} of another customer", identity.email, review.id);
            return Err(CoreError::access_denied(&[Role::Admin], "Only the author can edit a review"));
        }
        update.validate().map_err(CoreError::Validation)?;

        let now = self.clock.now();
        let mut batch = vec![Mutation::Update {
            table: Table::Reviews,
            id: review.id.clone(),
            patch: with_timestamp(to_row(&update)?, now),
        }];

        let delta = update.rating.map_or(0, |rating| rating - review.rating);
        if delta != 0 {
            batch.push(Mutation::increment(Table::Salons, review.salon_id.as_str(), "rating_total", delta));
            batch.push(Mutation::Update {
                table: Table::Salons,
                id: review.salon_id.clone(),
                patch: patch(json!({ "updated_at": now })),
            });
        }

        let written = self.store.apply(batch).await?;
        let row = written
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound(format!("Review {} not found", review_id)))?;

        tracing::info!("Review {} edited by {} (rating moved by {})", review.id, identity.email, delta);
        Ok(from_row(row)?)
    }

    /// Active team members of a salon.
    #[tracing::instrument(skip(self, identity))]
    pub async fn list_staff(&self, identity: Option<&Identity>, salon_id: &str) -> CoreResult<Vec<SalonStaff>> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, STAFF, Action::Read)?;

        let salon = self.load_salon(salon_id).await?;
        self.ensure_manages(identity, &salon)?;

        let filters = Filters::new()
            .with(Filter::eq("salon_id", salon.id.as_str()))
            .with(Filter::eq("is_active", true));
        Ok(fetch_all(self.store.as_ref(), Table::Staff, &filters, Some(&OrderBy::asc("created_at"))).await?)
    }

    #[tracing::instrument(skip(self, identity, request))]
    pub async fn add_staff(
        &self,
        identity: Option<&Identity>,
        salon_id: &str,
        request: NewStaff,
    ) -> CoreResult<SalonStaff> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, STAFF, Action::Create)?;

        let salon = self.load_salon(salon_id).await?;
        self.ensure_manages(identity, &salon)?;
        request.validate().map_err(CoreError::Validation)?;

        let user: Option<UserProfile> = fetch_by_id(self.store.as_ref(), Table::Users, request.user_id.trim()).await?;
        let user = user.ok_or_else(|| CoreError::NotFound(format!("User {} not found", request.user_id)))?;

        let already = self
            .store
            .query(
                Table::Staff,
                &Filters::new()
                    .with(Filter::eq("salon_id", salon.id.as_str()))
                    .with(Filter::eq("user_id", user.id.as_str()))
                    .with(Filter::eq("is_active", true)),
                None,
            )
            .await?;
        if !already.is_empty() {
            return Err(CoreError::Validation(format!(
                "{} is already on the team of salon {}",
                user.email, salon.id
            )));
        }

        let staff = request.into_staff(salon.id.clone(), self.clock.now());
        self.store.insert(Table::Staff, to_row(&staff)?).await?;

        tracing::info!("{} joined salon {} as {}", user.email, salon.id, staff.role);
        Ok(staff)
    }

    #[tracing::instrument(skip(self, identity, update))]
    pub async fn update_staff(
        &self,
        identity: Option<&Identity>,
        staff_id: &str,
        update: StaffUpdate,
    ) -> CoreResult<SalonStaff> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, STAFF, Action::Update)?;

        let staff = self.load_staff(staff_id).await?;
        let salon = self.load_salon(&staff.salon_id).await?;
        self.ensure_manages(identity, &salon)?;
        update.validate().map_err(CoreError::Validation)?;

        let row = self
            .store
            .update(Table::Staff, staff_id, with_timestamp(to_row(&update)?, self.clock.now()))
            .await?;

        tracing::info!("Staff member {} of salon {} updated by {}", staff_id, salon.id, identity.email);
        Ok(from_row(row)?)
    }

    /// Soft delete: the membership is kept but no longer listed.
    #[tracing::instrument(skip(self, identity))]
    pub async fn remove_staff(&self, identity: Option<&Identity>, staff_id: &str) -> CoreResult<SalonStaff> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, STAFF, Action::Delete)?;

        let staff = self.load_staff(staff_id).await?;
        let salon = self.load_salon(&staff.salon_id).await?;
        self.ensure_manages(identity, &salon)?;

        let now = self.clock.now();
        let row = self
            .store
            .update(Table::Staff, staff_id, patch(json!({ "is_active": false, "updated_at": now })))
            .await?;

        tracing::info!("Staff member {} removed from salon {} by {}", staff_id, salon.id, identity.email);
        Ok(from_row(row)?)
    }
}

fn with_timestamp(mut row: Row, now: DateTime<Utc>) -> Row {
    row.insert("updated_at".to_string(), json!(now));
    row.remove("id");
    row.retain(|_, v| !v.is_null());
    row
}
