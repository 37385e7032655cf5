use crate::domain::entities::{Identity, Role};
use std::sync::Arc;

/// Invoked with the new identity on sign-in and role change, and with `None` on sign-out.
pub type IdentityCallback = Arc<dyn Fn(Option<&Identity>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Session/identity collaborator. The core only reads from it.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    fn on_identity_change(&self, callback: IdentityCallback) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);

    /// Told about admin role changes so the signed-in session can refresh itself.
    fn role_changed(&self, _user_id: &str, _role: Role) {}
}
