use crate::domain::entities::{AuthenticatedUser, Identity, Role, UserProfile};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ports::clock::Clock;
use crate::domain::ports::data_store::{fetch_by_id, to_row, DataStore, Table};
use crate::domain::services::access::resolve_role;
use std::sync::Arc;

/// Turns an authenticated session user into an [`Identity`] by loading their profile.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn DataStore>,
    clock: Arc<dyn Clock>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn DataStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// `None` when nobody is signed in. A signed-in user without a profile row is a customer.
    #[tracing::instrument(skip(self, user))]
    pub async fn resolve(&self, user: Option<&AuthenticatedUser>) -> CoreResult<Option<Identity>> {
        let user = match user {
            Some(user) => user,
            None => return Ok(None),
        };

        let profile: Option<UserProfile> = fetch_by_id(self.store.as_ref(), Table::Users, &user.id).await?;
        if profile.is_none() {
            tracing::info!("No profile for {}; treating as customer", user.email);
        }

        Ok(resolve_role(true, profile.map(|p| p.role)).map(|role| Identity::new(user.id.clone(), user.email.clone(), role)))
    }

    /// Creates the profile row at sign-up. New profiles are always customers.
    #[tracing::instrument(skip(self, user))]
    pub async fn create_profile(&self, user: &AuthenticatedUser, full_name: Option<String>) -> CoreResult<UserProfile> {
        if !email_address::EmailAddress::is_valid(user.email.trim()) {
            return Err(CoreError::Validation(format!("Invalid email: {}", user.email)));
        }

        let now = self.clock.now();
        let profile = UserProfile {
            id: user.id.clone(),
            email: user.email.trim().to_string(),
            full_name,
            avatar_url: None,
            role: Role::Customer,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(Table::Users, to_row(&profile)?).await?;

        tracing::info!("Profile created for {}", profile.email);
        Ok(profile)
    }
}
