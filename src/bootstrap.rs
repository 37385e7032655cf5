use crate::application::services::{
    BookingDispatcher, BookingWorkflow, CatalogService, DashboardAssembler, IdentityService,
};
use crate::config::Config;
use crate::domain::entities::Identity;
use crate::domain::ports::clock::Clock;
use crate::domain::ports::data_store::DataStore;
use crate::domain::ports::identity_provider::IdentityProvider;
use crate::domain::services::access::{PermissionChecker, RegistryPermissionChecker};
use crate::infrastructure::identity::SessionIdentityProvider;
use crate::infrastructure::persistence::{memory_store, SqlStore};
use crate::infrastructure::runtime::SystemClock;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Failed to connect to data store: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Failed to apply migrations: {0}")]
    Migrate(#[source] sqlx::Error),
}

/// Wired core: every service shares the same store, permission checker and clock.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DataStore>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub clock: Arc<dyn Clock>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub identities: IdentityService,
    pub workflow: Arc<BookingWorkflow>,
    pub dispatcher: BookingDispatcher,
    pub dashboard: DashboardAssembler,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn current_identity(&self) -> Option<Identity> {
        self.identity_provider.current_identity()
    }
}

/// Opens the store named by `DATABASE_URL` and applies migrations.
pub async fn connect_store(config: &Config) -> Result<Arc<dyn DataStore>, BootstrapError> {
    if config.uses_memory_store() {
        tracing::info!("Using in-process data store");
        return Ok(Arc::new(memory_store()));
    }

    let store = SqlStore::connect(&config.database_url)
        .await
        .map_err(BootstrapError::Connect)?;
    store.run_migrations().await.map_err(BootstrapError::Migrate)?;
    tracing::info!("Data store migrations applied");

    Ok(Arc::new(store))
}

pub async fn build_app_state(config: Config) -> Result<AppState, BootstrapError> {
    let store = connect_store(&config).await?;
    Ok(build_with_store(
        config,
        store,
        Arc::new(SystemClock::new()),
        Arc::new(SessionIdentityProvider::new()),
    ))
}

pub fn build_with_store(
    config: Config,
    store: Arc<dyn DataStore>,
    clock: Arc<dyn Clock>,
    identity_provider: Arc<dyn IdentityProvider>,
) -> AppState {
    let permissions: Arc<dyn PermissionChecker> = Arc::new(RegistryPermissionChecker);

    let workflow = Arc::new(BookingWorkflow::new(
        store.clone(),
        permissions.clone(),
        clock.clone(),
        config.slot_grid.clone(),
        config.timezone,
    ));
    let dispatcher = BookingDispatcher::new(workflow.clone());
    let dashboard = DashboardAssembler::new(store.clone(), permissions.clone(), clock.clone(), config.timezone);
    let catalog = CatalogService::new(
        store.clone(),
        permissions.clone(),
        clock.clone(),
        identity_provider.clone(),
    );
    let identities = IdentityService::new(store.clone(), clock.clone());

    tracing::info!(
        "Core initialized (timezone {}, {} slots per day)",
        config.timezone,
        config.slot_grid.slots().len()
    );

    AppState {
        config,
        store,
        permissions,
        clock,
        identity_provider,
        identities,
        workflow,
        dispatcher,
        dashboard,
        catalog,
    }
}
