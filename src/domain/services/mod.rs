pub mod access;
pub mod slots;
pub mod state_machine;

pub use access::*;
pub use slots::*;
pub use state_machine::*;
