use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use salonbook::bootstrap::{build_with_store, AppState};
use salonbook::config::Config;
use salonbook::domain::entities::{
    Booking, CreateBooking, Identity, Role, Salon, SalonStatus, Service, UserProfile,
};
use salonbook::domain::ports::clock::Clock;
use salonbook::domain::ports::data_store::{fetch_by_id, to_row, DataStore, Table};
use salonbook::infrastructure::identity::SessionIdentityProvider;
use salonbook::infrastructure::persistence::memory_store;
use salonbook::infrastructure::runtime::FixedClock;
use std::sync::Arc;
use uuid::Uuid;

/// Fully wired core with a controllable clock.
pub struct TestCore {
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub session: Arc<SessionIdentityProvider>,
}

impl TestCore {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn store(&self) -> &dyn DataStore {
        self.state.store.as_ref()
    }

    pub async fn booking(&self, id: &str) -> Booking {
        fetch_by_id(self.store(), Table::Bookings, id)
            .await
            .expect("Failed to load booking")
            .expect("Booking missing")
    }

    pub async fn salon(&self, id: &str) -> Salon {
        fetch_by_id(self.store(), Table::Salons, id)
            .await
            .expect("Failed to load salon")
            .expect("Salon missing")
    }
}

/// 2024-06-19 10:00 UTC, the day before the scenario bookings.
pub fn start_time() -> DateTime<Utc> {
    at(2024, 6, 19, 10, 0)
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn setup_core() -> TestCore {
    setup_core_at(start_time())
}

pub fn setup_core_at(now: DateTime<Utc>) -> TestCore {
    setup_core_with(Arc::new(memory_store()), now)
}

pub fn setup_core_with(store: Arc<dyn DataStore>, now: DateTime<Utc>) -> TestCore {
    setup_core_configured(Config::default(), store, now)
}

pub fn setup_core_configured(config: Config, store: Arc<dyn DataStore>, now: DateTime<Utc>) -> TestCore {
    salonbook::infrastructure::observability::init_test_tracing();

    let clock = Arc::new(FixedClock::new(now));
    let session = Arc::new(SessionIdentityProvider::new());
    let state = build_with_store(config, store, clock.clone(), session.clone());

    TestCore { state, clock, session }
}

pub fn admin() -> Identity {
    Identity::new("admin-1", "admin@example.com", Role::Admin)
}

pub fn owner(id: &str) -> Identity {
    Identity::new(id, format!("{}@salons.example.com", id), Role::SalonOwner)
}

pub fn customer(id: &str) -> Identity {
    Identity::new(id, format!("{}@example.com", id), Role::Customer)
}

pub async fn seed_profile(core: &TestCore, identity: &Identity) -> UserProfile {
    let mut profile = UserProfile::new(identity.id.clone(), identity.email.clone(), identity.role);
    profile.created_at = core.now();
    profile.updated_at = profile.created_at;
    core.store()
        .insert(Table::Users, to_row(&profile).unwrap())
        .await
        .expect("Failed to seed profile");
    profile
}

/// Inserts an active salon directly, bypassing registration.
pub async fn seed_salon(core: &TestCore, owner: Option<&Identity>, name: &str) -> Salon {
    seed_salon_with_status(core, owner, name, SalonStatus::Active).await
}

pub async fn seed_salon_with_status(
    core: &TestCore,
    owner: Option<&Identity>,
    name: &str,
    status: SalonStatus,
) -> Salon {
    let now = core.now();
    let salon = Salon {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: None,
        owner_id: owner.map(|o| o.id.clone()),
        email: "hello@salon.example.com".to_string(),
        phone: "555-0100".to_string(),
        address: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        status,
        rating_total: 0,
        total_reviews: 0,
        total_bookings: 0,
        total_revenue: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    };
    core.store()
        .insert(Table::Salons, to_row(&salon).unwrap())
        .await
        .expect("Failed to seed salon");
    salon
}

pub async fn seed_service(core: &TestCore, salon: &Salon, name: &str, price: i64, duration_minutes: i32) -> Service {
    let now = core.now();
    let service = Service {
        id: Uuid::new_v4().to_string(),
        salon_id: salon.id.clone(),
        name: name.to_string(),
        description: None,
        duration_minutes,
        price: Decimal::new(price, 0),
        category: "hair".to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    core.store()
        .insert(Table::Services, to_row(&service).unwrap())
        .await
        .expect("Failed to seed service");
    service
}

pub fn booking_request(salon: &Salon, service: &Service, day: NaiveDate, time: &str) -> CreateBooking {
    CreateBooking {
        salon_id: salon.id.clone(),
        service_id: service.id.clone(),
        booking_date: day,
        booking_time: time.parse().expect("Invalid slot time"),
        customer_name: "Jane Doe".to_string(),
        customer_phone: "555-0199".to_string(),
        customer_email: "jane@example.com".to_string(),
        notes: None,
        customer_id: None,
    }
}

/// Salon "Glow" owned by `owner-s` with a 40/30min "Haircut", plus a customer.
pub struct Scenario {
    pub owner: Identity,
    pub customer: Identity,
    pub salon: Salon,
    pub haircut: Service,
}

pub async fn seed_scenario(core: &TestCore) -> Scenario {
    let owner = owner("owner-s");
    let customer = customer("customer-1");
    seed_profile(core, &owner).await;
    seed_profile(core, &customer).await;

    let salon = seed_salon(core, Some(&owner), "Glow").await;
    let haircut = seed_service(core, &salon, "Haircut", 40, 30).await;

    Scenario {
        owner,
        customer,
        salon,
        haircut,
    }
}
