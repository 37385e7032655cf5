use crate::domain::entities::resources::*;
use crate::domain::entities::{Action, Identity, Permission, Role};
use crate::domain::errors::{CoreError, CoreResult};
use std::collections::HashSet;
use std::sync::LazyLock;

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::new(USERS, Action::Read),
    Permission::new(USERS, Action::Create),
    Permission::new(USERS, Action::Update),
    Permission::new(USERS, Action::Delete),
    Permission::new(SALONS, Action::Read),
    Permission::new(SALONS, Action::Create),
    Permission::new(SALONS, Action::Update),
    Permission::new(SALONS, Action::Delete),
    Permission::new(SERVICES, Action::Read),
    Permission::new(SERVICES, Action::Create),
    Permission::new(SERVICES, Action::Update),
    Permission::new(SERVICES, Action::Delete),
    Permission::new(BOOKINGS, Action::Read),
    Permission::new(BOOKINGS, Action::Create),
    Permission::new(BOOKINGS, Action::Update),
    Permission::new(BOOKINGS, Action::Delete),
    Permission::new(REVIEWS, Action::Read),
    Permission::new(REVIEWS, Action::Create),
    Permission::new(REVIEWS, Action::Update),
    Permission::new(REVIEWS, Action::Delete),
    Permission::new(STAFF, Action::Read),
    Permission::new(STAFF, Action::Create),
    Permission::new(STAFF, Action::Update),
    Permission::new(STAFF, Action::Delete),
    Permission::new(ANALYTICS, Action::Read),
    Permission::new(DASHBOARD, Action::Admin),
];

// Updates are further restricted to owned salons by the ownership checks.
const SALON_OWNER_PERMISSIONS: &[Permission] = &[
    Permission::new(SALONS, Action::Read),
    Permission::new(SALONS, Action::Update),
    Permission::new(SERVICES, Action::Read),
    Permission::new(SERVICES, Action::Create),
    Permission::new(SERVICES, Action::Update),
    Permission::new(SERVICES, Action::Delete),
    Permission::new(BOOKINGS, Action::Read),
    Permission::new(BOOKINGS, Action::Update),
    Permission::new(REVIEWS, Action::Read),
    Permission::new(STAFF, Action::Read),
    Permission::new(STAFF, Action::Create),
    Permission::new(STAFF, Action::Update),
    Permission::new(STAFF, Action::Delete),
];

const CUSTOMER_PERMISSIONS: &[Permission] = &[
    Permission::new(SALONS, Action::Read),
    Permission::new(SERVICES, Action::Read),
    Permission::new(BOOKINGS, Action::Read),
    Permission::new(BOOKINGS, Action::Create),
    Permission::new(BOOKINGS, Action::Update),
    Permission::new(REVIEWS, Action::Read),
    Permission::new(REVIEWS, Action::Create),
    Permission::new(REVIEWS, Action::Update),
    Permission::new(PROFILE, Action::Read),
    Permission::new(PROFILE, Action::Update),
];

static REGISTRY: LazyLock<RoleRegistry> = LazyLock::new(RoleRegistry::build);

/// Static role → permission table, precomputed into `role|resource|action` keys.
#[derive(Debug)]
pub struct RoleRegistry {
    keys: HashSet<String>,
}

impl RoleRegistry {
    pub fn global() -> &'static RoleRegistry {
        &REGISTRY
    }

    fn build() -> Self {
        let keys = Role::ALL
            .iter()
            .flat_map(|role| {
                Self::permissions(*role)
                    .iter()
                    .map(move |p| key(*role, p.resource, p.action))
            })
            .collect();
        Self { keys }
    }

    pub fn permissions(role: Role) -> &'static [Permission] {
        match role {
            Role::Admin => ADMIN_PERMISSIONS,
            Role::SalonOwner => SALON_OWNER_PERMISSIONS,
            Role::Customer => CUSTOMER_PERMISSIONS,
        }
    }

    /// Exact membership test. No role means no permission.
    pub fn has_permission(&self, role: Option<Role>, resource: &str, action: Action) -> bool {
        match role {
            Some(role) => self.keys.contains(&key(role, resource, action)),
            None => false,
        }
    }

    /// Roles whose table contains the pair, used to explain denials.
    pub fn roles_granting(&self, resource: &str, action: Action) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.has_permission(Some(*role), resource, action))
            .collect()
    }
}

fn key(role: Role, resource: &str, action: Action) -> String {
    format!("{}|{}|{}", role.as_str(), resource, action.as_str())
}

pub fn has_permission(role: Option<Role>, resource: &str, action: Action) -> bool {
    RoleRegistry::global().has_permission(role, resource, action)
}

/// Permission gate for conditional rendering.
pub fn identity_can(identity: Option<&Identity>, resource: &str, action: Action) -> bool {
    has_permission(identity.map(|i| i.role), resource, action)
}

/// Injected into every component that makes an access decision.
pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, role: Option<Role>, resource: &str, action: Action) -> bool;

    fn roles_granting(&self, resource: &str, action: Action) -> Vec<Role>;

    fn require(&self, identity: &Identity, resource: &str, action: Action) -> CoreResult<()> {
        if self.has_permission(Some(identity.role), resource, action) {
            return Ok(());
        }

        tracing::warn!(
            "Permission denied: {} ({}) lacks {}:{}",
            identity.email,
            identity.role,
            resource,
            action
        );

        Err(CoreError::access_denied(
            &self.roles_granting(resource, action),
            format!("Missing permission {}:{}", resource, action),
        ))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryPermissionChecker;

impl PermissionChecker for RegistryPermissionChecker {
    fn has_permission(&self, role: Option<Role>, resource: &str, action: Action) -> bool {
        RoleRegistry::global().has_permission(role, resource, action)
    }

    fn roles_granting(&self, resource: &str, action: Action) -> Vec<Role> {
        RoleRegistry::global().roles_granting(resource, action)
    }
}

pub fn require_identity(identity: Option<&Identity>) -> CoreResult<&Identity> {
    identity.ok_or_else(CoreError::unauthenticated)
}

/// Role guard run at the start of a handler.
pub fn authorize(identity: Option<&Identity>, required_roles: &[Role]) -> CoreResult<()> {
    let identity = require_identity(identity)?;
    if required_roles.contains(&identity.role) {
        return Ok(());
    }

    tracing::warn!(
        "Access denied: {} has role {}, needs one of {:?}",
        identity.email,
        identity.role,
        required_roles
    );

    Err(CoreError::access_denied(
        required_roles,
        "You don't have permission to access this page",
    ))
}

/// Role of a session: a loaded profile wins, a signed-in user without a profile is a customer,
/// and nobody signed in has no role.
pub fn resolve_role(authenticated: bool, profile_role: Option<Role>) -> Option<Role> {
    match (authenticated, profile_role) {
        (false, _) => None,
        (true, Some(role)) => Some(role),
        (true, None) => Some(Role::Customer),
    }
}
