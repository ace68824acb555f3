use tracing::warn;
use uuid::Uuid;

use crate::database::models::{Role, User};
use crate::services::ServiceError;

/// The authenticated caller, loaded from the users collection on every request
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub shops: Vec<Uuid>,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            shops: user.shops.clone(),
        }
    }
}

impl Principal {
    pub fn owns_shop(&self, shop_id: Uuid) -> bool {
        self.shops.contains(&shop_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Platform-wide administration: dashboards, user, shop and order admin, categories
    Platform,
    /// Changing another user's role
    UserRole,
    Shop(Uuid),
    Notification { owner: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Manage,
}

/// Single authorization decision point for every protected operation
pub fn authorize(principal: &Principal, resource: Resource, action: Action) -> Result<(), ServiceError> {
    let allowed = match resource {
        Resource::Platform => principal.role.is_admin(),
        Resource::UserRole => principal.role == Role::SuperAdmin,
        Resource::Shop(shop_id) => principal.role.is_admin() || principal.owns_shop(shop_id),
        Resource::Notification { owner } => principal.id == owner,
    };

    if allowed {
        return Ok(());
    }

    warn!(
        "Denied {:?} on {:?} for user {} ({})",
        action,
        resource,
        principal.id,
        principal.role.as_str()
    );
    Err(match resource {
        Resource::Platform => ServiceError::forbidden("Admin access required"),
        Resource::UserRole => ServiceError::forbidden("Super admin access required"),
        Resource::Shop(_) => ServiceError::forbidden("Access denied to this shop"),
        Resource::Notification { .. } => ServiceError::not_found("Notification not found"),
    })
}
