pub mod booking;
pub mod review;
pub mod role;
pub mod salon;
pub mod service;
pub mod staff;
pub mod user;

pub use booking::*;
pub use review::*;
pub use role::*;
pub use salon::*;
pub use service::*;
pub use staff::*;
pub use user::*;
