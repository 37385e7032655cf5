use crate::domain::entities::resources::DASHBOARD;
use crate::domain::entities::{
    Action, Booking, BookingFilter, BookingStatus, Identity, Review, Role, Salon, SalonFilter, SalonStaff,
    SalonStatus, Service, UserProfile,
};
use crate::domain::errors::CoreResult;
use crate::domain::ports::clock::Clock;
use crate::domain::ports::data_store::{from_row, DataStore, Filter, Filters, OrderBy, Row, Table};
use crate::domain::services::access::{authorize, require_identity, PermissionChecker};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStats {
    pub total_salons: usize,
    pub active_salons: usize,
    pub pending_salons: usize,
    pub total_users: usize,
    pub total_bookings: usize,
    pub confirmed_bookings: usize,
    pub completed_bookings: usize,
    /// Sum of the salons' `total_revenue` counters, which only grow when a booking completes.
    /// Amounts of pending, confirmed or cancelled bookings are not included.
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerStats {
    pub salons: usize,
    pub total_bookings: usize,
    pub pending_bookings: usize,
    pub confirmed_bookings: usize,
    pub completed_bookings: usize,
    pub revenue: Decimal,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerOverview {
    /// Pending or confirmed bookings that have not started, soonest first.
    pub upcoming: Vec<Booking>,
    /// Everything else, most recent first.
    pub past: Vec<Booking>,
}

/// Role-scoped reads for the dashboards.
///
/// Every read goes through [`DashboardAssembler::scoped_query`], which conjoins the
/// mandatory tenant filters before the request reaches the store.
#[derive(Clone)]
pub struct DashboardAssembler {
    store: Arc<dyn DataStore>,
    permissions: Arc<dyn PermissionChecker>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl DashboardAssembler {
    pub fn new(
        store: Arc<dyn DataStore>,
        permissions: Arc<dyn PermissionChecker>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            store,
            permissions,
            clock,
            timezone,
        }
    }

    pub async fn owned_salon_ids(&self, identity: &Identity) -> CoreResult<Vec<String>> {
        let filters = Filters::new().with(Filter::eq("owner_id", identity.id.as_str()));
        let rows = self.store.query(Table::Salons, &filters, None).await?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get("id").and_then(|id| id.as_str()).map(str::to_string))
            .collect())
    }

    /// Conjoins the identity's mandatory scope onto `raw`. Caller-supplied scoping is kept
    /// but never relied on.
    #[tracing::instrument(skip(self, identity, raw), fields(table = %table))]
    pub async fn scoped_query(&self, identity: Option<&Identity>, table: Table, raw: Filters) -> CoreResult<Filters> {
        let identity = require_identity(identity)?;
        self.permissions.require(identity, table.as_str(), Action::Read)?;

        let mut filters = raw;
        match (identity.role, table) {
            (Role::Admin, _) => {}

            (Role::SalonOwner, Table::Salons) => {
                filters.push(Filter::eq("owner_id", identity.id.as_str()));
            }
            (Role::SalonOwner, Table::Bookings | Table::Services | Table::Reviews | Table::Staff) => {
                let owned = self.owned_salon_ids(identity).await?;
                filters.push(Filter::in_values("salon_id", owned));
            }

            (Role::Customer, Table::Bookings | Table::Reviews) => {
                filters.push(Filter::eq("customer_id", identity.id.as_str()));
            }
            (Role::Customer, Table::Salons | Table::Services) => {}
            (Role::Customer, Table::Staff) => {
                filters.push(Filter::eq("user_id", identity.id.as_str()));
            }

            // Only admins hold users:read; anyone else may at most see their own profile
            (_, Table::Users) => {
                filters.push(Filter::eq("id", identity.id.as_str()));
            }
        }

        tracing::debug!("Scoped {} query for {} to {} filter(s)", table, identity.role, filters.len());
        Ok(filters)
    }

    pub async fn list(
        &self,
        identity: Option<&Identity>,
        table: Table,
        raw: Filters,
        order: Option<&OrderBy>,
    ) -> CoreResult<Vec<Row>> {
        let filters = self.scoped_query(identity, table, raw).await?;
        Ok(self.store.query(table, &filters, order).await?)
    }

    pub async fn list_as<T: DeserializeOwned>(
        &self,
        identity: Option<&Identity>,
        table: Table,
        raw: Filters,
        order: Option<&OrderBy>,
    ) -> CoreResult<Vec<T>> {
        let rows = self.list(identity, table, raw, order).await?;
        Ok(rows.into_iter().map(from_row).collect::<Result<Vec<T>, _>>()?)
    }

    pub async fn salons(&self, identity: Option<&Identity>, filter: &SalonFilter) -> CoreResult<Vec<Salon>> {
        let salons: Vec<Salon> = self
            .list_as(identity, Table::Salons, filter.to_filters(), Some(&OrderBy::desc("created_at")))
            .await?;

        Ok(match filter.search.as_deref() {
            Some(needle) => salons.into_iter().filter(|s| s.matches_search(needle)).collect(),
            None => salons,
        })
    }

    pub async fn bookings(&self, identity: Option<&Identity>, filter: &BookingFilter) -> CoreResult<Vec<Booking>> {
        self.list_as(
            identity,
            Table::Bookings,
            filter.to_filters(),
            Some(&OrderBy::desc("booking_date")),
        )
        .await
    }

    pub async fn services(&self, identity: Option<&Identity>, salon_id: Option<&str>) -> CoreResult<Vec<Service>> {
        let mut raw = Filters::new();
        if let Some(salon_id) = salon_id {
            raw.push(Filter::eq("salon_id", salon_id));
        }
        self.list_as(identity, Table::Services, raw, Some(&OrderBy::asc("name")))
            .await
    }

    pub async fn reviews(&self, identity: Option<&Identity>) -> CoreResult<Vec<Review>> {
        self.list_as(identity, Table::Reviews, Filters::new(), Some(&OrderBy::desc("created_at")))
            .await
    }

    /// Active team members of the salons in scope, optionally one salon.
    pub async fn staff(&self, identity: Option<&Identity>, salon_id: Option<&str>) -> CoreResult<Vec<SalonStaff>> {
        let mut raw = Filters::new().with(Filter::eq("is_active", true));
        if let Some(salon_id) = salon_id {
            raw.push(Filter::eq("salon_id", salon_id));
        }
        self.list_as(identity, Table::Staff, raw, Some(&OrderBy::asc("created_at")))
            .await
    }

    pub async fn users(&self, identity: Option<&Identity>) -> CoreResult<Vec<UserProfile>> {
        self.list_as(identity, Table::Users, Filters::new(), Some(&OrderBy::desc("created_at")))
            .await
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn admin_stats(&self, identity: Option<&Identity>) -> CoreResult<AdminStats> {
        let admin = require_identity(identity)?;
        self.permissions.require(admin, DASHBOARD, Action::Admin)?;

        let salons: Vec<Salon> = self.list_as(identity, Table::Salons, Filters::new(), None).await?;
        let users = self.list(identity, Table::Users, Filters::new(), None).await?;
        let bookings: Vec<Booking> = self.list_as(identity, Table::Bookings, Filters::new(), None).await?;

        let count_status = |status: BookingStatus| bookings.iter().filter(|b| b.status == status).count();

        Ok(AdminStats {
            total_salons: salons.len(),
            active_salons: salons.iter().filter(|s| s.status == SalonStatus::Active).count(),
            pending_salons: salons.iter().filter(|s| s.status == SalonStatus::Pending).count(),
            total_users: users.len(),
            total_bookings: bookings.len(),
            confirmed_bookings: count_status(BookingStatus::Confirmed),
            completed_bookings: count_status(BookingStatus::Completed),
            total_revenue: salons.iter().map(|s| s.total_revenue).sum(),
        })
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn owner_stats(&self, identity: Option<&Identity>) -> CoreResult<OwnerStats> {
        authorize(identity, &[Role::SalonOwner, Role::Admin])?;

        let salons = self.salons(identity, &SalonFilter::default()).await?;
        let bookings = self.bookings(identity, &BookingFilter::default()).await?;
        let count_status = |status: BookingStatus| bookings.iter().filter(|b| b.status == status).count();

        let ratings: Vec<f64> = salons.iter().filter_map(Salon::rating).collect();
        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        };

        Ok(OwnerStats {
            salons: salons.len(),
            total_bookings: bookings.len(),
            pending_bookings: count_status(BookingStatus::PendingConfirmation),
            confirmed_bookings: count_status(BookingStatus::Confirmed),
            completed_bookings: count_status(BookingStatus::Completed),
            revenue: salons.iter().map(|s| s.total_revenue).sum(),
            average_rating,
        })
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn customer_overview(&self, identity: Option<&Identity>) -> CoreResult<CustomerOverview> {
        authorize(identity, &[Role::Customer])?;

        let now = self.clock.now().with_timezone(&self.timezone).naive_local();
        let bookings = self.bookings(identity, &BookingFilter::default()).await?;

        let (mut upcoming, mut past): (Vec<Booking>, Vec<Booking>) = bookings
            .into_iter()
            .partition(|b| b.status.holds_slot() && b.starts_at() > now);

        upcoming.sort_by_key(|b| b.starts_at());
        past.sort_by_key(|b| std::cmp::Reverse(b.starts_at()));

        Ok(CustomerOverview { upcoming, past })
    }
}
