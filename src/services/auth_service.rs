use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::error::{ServiceError, ServiceResult};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{generate_jwt, Claims, Principal};
use crate::database::models::{PublicUser, Role, User};
use crate::database::{Collection, DocumentStore, Repository, StoreError};
use crate::types::now;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[validate(length(min = 2, message = "Full name must be at least 2 characters"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 10, message = "Phone number must be at least 10 digits"))]
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: PublicUser,
    pub token: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct AuthService {
    users: Repository<User>,
}

impl AuthService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: Repository::new(Collection::Users, store),
        }
    }

    fn session(user: User) -> ServiceResult<Session> {
        let token = generate_jwt(&Claims::for_user(&user)).map_err(|e| {
            error!("Failed to issue token for {}: {}", user.id, e);
            ServiceError::unauthorized("Unable to issue token")
        })?;
        Ok(Session { user: user.into(), token })
    }

    /// Creates a regular user account with a hashed password
    pub async fn create_user(&self, input: Registration, role: Role) -> ServiceResult<User> {
        let password_hash = hash_password(&input.password).map_err(|e| {
            error!("Password hashing failed: {}", e);
            ServiceError::validation("Password could not be processed")
        })?;

        let now = now();
        let user = User {
            id: Uuid::new_v4(),
            full_name: input.full_name.trim().to_string(),
            email: normalize_email(&input.email),
            password_hash,
            phone: input.phone,
            role,
            is_active: true,
            shops: vec![],
            created_at: now,
            updated_at: now,
        };

        match self.users.insert(&user).await {
            Ok(user) => {
                info!("Registered user {} with role {}", user.id, user.role.as_str());
                Ok(user)
            }
            Err(StoreError::Duplicate { .. }) => {
                Err(ServiceError::conflict("User with this email already exists"))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn register(&self, input: Registration) -> ServiceResult<Session> {
        let user = self.create_user(input, Role::User).await?;
        Self::session(user)
    }

    /// Unknown email and wrong password fail identically
    pub async fn login(&self, credentials: Credentials) -> ServiceResult<Session> {
        let email = normalize_email(&credentials.email);
        let user = self
            .users
            .select_one(serde_json::json!({ "email": email }))
            .await?
            .filter(|user| verify_password(&credentials.password, &user.password_hash))
            .ok_or_else(|| {
                warn!("Failed login for {}", email);
                ServiceError::unauthorized("Invalid email or password")
            })?;

        if !user.is_active {
            return Err(ServiceError::forbidden("Account is deactivated"));
        }
        Self::session(user)
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .users
            .select_one(serde_json::json!({ "email": normalize_email(email) }))
            .await?)
    }

    /// Loads the caller named by a verified token
    pub async fn load_principal(&self, user_id: Uuid) -> ServiceResult<Principal> {
        let user = self
            .users
            .select_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::unauthorized("User no longer exists"))?;
        if !user.is_active {
            return Err(ServiceError::forbidden("Account is deactivated"));
        }
        Ok(Principal::from(&user))
    }

    pub async fn me(&self, principal: &Principal) -> ServiceResult<PublicUser> {
        self.users
            .select_id(principal.id)
            .await?
            .map(PublicUser::from)
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn registration(email: &str) -> Registration {
        Registration {
            full_name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            password: "analytical".to_string(),
            phone: "5550001111".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let service = AuthService::new(Arc::new(MemoryStore::new()));
        let session = service.register(registration("Ada@Example.com ")).await.unwrap();
        assert_eq!(session.user.email, "ada@example.com");
        assert_eq!(session.user.role, Role::User);

        let login = service
            .login(Credentials { email: "ada@example.com".into(), password: "analytical".into() })
            .await
            .unwrap();
        assert_eq!(login.user.id, session.user.id);
        assert!(!login.token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let service = AuthService::new(Arc::new(MemoryStore::new()));
        service.register(registration("ada@example.com")).await.unwrap();
        let err = service.register(registration("ADA@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn bad_credentials_share_one_message() {
        let service = AuthService::new(Arc::new(MemoryStore::new()));
        service.register(registration("ada@example.com")).await.unwrap();

        let wrong_password = service
            .login(Credentials { email: "ada@example.com".into(), password: "nope".into() })
            .await
            .unwrap_err();
        let unknown = service
            .login(Credentials { email: "bob@example.com".into(), password: "analytical".into() })
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown.to_string());
        assert!(matches!(unknown, ServiceError::Unauthorized(_)));
    }
}
