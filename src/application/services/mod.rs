pub mod booking_workflow;
pub mod catalog;
pub mod dashboard;
pub mod dispatcher;
pub mod identity;

pub use booking_workflow::BookingWorkflow;
pub use catalog::CatalogService;
pub use dashboard::{AdminStats, CustomerOverview, DashboardAssembler, OwnerStats};
pub use dispatcher::{BookingAction, BookingDispatcher, DispatchOutcome};
pub use identity::IdentityService;
