pub mod clock;
pub mod data_store;
pub mod identity_provider;

pub use clock::*;
pub use data_store::*;
pub use identity_provider::*;
