pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::services::*;
pub use bootstrap::{build_app_state, build_with_store, AppState, BootstrapError};
pub use config::{Config, ConfigError};
pub use domain::entities::*;
pub use domain::errors::{CoreError, CoreResult, ErrorKind};
pub use domain::ports::{Clock, DataStore, Filter, Filters, IdentityProvider, OrderBy, StoreError, Table};
pub use domain::services::{authorize, has_permission, PermissionChecker, RegistryPermissionChecker, SlotGrid};
