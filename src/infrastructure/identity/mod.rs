use crate::domain::entities::{Identity, Role};
use crate::domain::ports::identity_provider::{IdentityCallback, IdentityProvider, SubscriptionId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// In-process session: holds the signed-in identity and fans changes out to subscribers.
#[derive(Default)]
pub struct SessionIdentityProvider {
    current: RwLock<Option<Identity>>,
    subscribers: RwLock<HashMap<u64, IdentityCallback>>,
    next_id: AtomicU64,
}

impl SessionIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: Identity) -> Self {
        let provider = Self::new();
        *provider.current.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
        provider
    }

    pub fn sign_in(&self, identity: Identity) {
        tracing::info!("Session started for {} ({})", identity.email, identity.role);
        self.replace(Some(identity));
    }

    pub fn sign_out(&self) {
        tracing::info!("Session ended");
        self.replace(None);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn replace(&self, identity: Option<Identity>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = identity.clone();
        self.notify(identity.as_ref());
    }

    fn notify(&self, identity: Option<&Identity>) {
        // Snapshot the callbacks so a subscriber may unsubscribe from inside its callback
        let callbacks: Vec<IdentityCallback> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for callback in callbacks {
            callback(identity);
        }
    }
}

impl IdentityProvider for SessionIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn on_identity_change(&self, callback: IdentityCallback) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, callback);
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.0);
    }

    /// Refreshes the session when the signed-in user's role is changed.
    fn role_changed(&self, user_id: &str, role: Role) {
        let refreshed = match self.current_identity() {
            Some(identity) if identity.id == user_id && identity.role != role => Identity { role, ..identity },
            _ => return,
        };

        tracing::info!("Session role refreshed for {} to {}", refreshed.email, role);
        self.replace(Some(refreshed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_subscribers_see_sign_in_and_out() {
        let provider = SessionIdentityProvider::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = provider.on_identity_change(Arc::new(move |identity: Option<&Identity>| {
            sink.lock().unwrap().push(identity.map(|i| i.role));
        }));

        provider.sign_in(Identity::new("u1", "u1@example.com", Role::Customer));
        provider.sign_out();
        provider.unsubscribe(sub);
        provider.sign_in(Identity::new("u1", "u1@example.com", Role::Customer));

        assert_eq!(*seen.lock().unwrap(), vec![Some(Role::Customer), None]);
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[test]
    fn test_role_change_refreshes_only_matching_session() {
        let provider = SessionIdentityProvider::signed_in(Identity::new("u1", "u1@example.com", Role::Customer));

        provider.role_changed("someone-else", Role::Admin);
        assert_eq!(provider.current_identity().map(|i| i.role), Some(Role::Customer));

        provider.role_changed("u1", Role::SalonOwner);
        assert_eq!(provider.current_identity().map(|i| i.role), Some(Role::SalonOwner));
    }
}
