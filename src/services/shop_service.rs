use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::error::{ServiceError, ServiceResult};
use crate::auth::Principal;
use crate::database::models::{Shop, User};
use crate::database::{Collection, DocumentStore, Repository, StoreError};
use crate::types::{now, timestamp};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewShop {
    #[validate(length(min = 2, message = "Shop name must be at least 2 characters"))]
    pub shop_name: String,
    #[validate(length(min = 1, message = "Theme is required"))]
    pub theme: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Clone)]
pub struct ShopService {
    shops: Repository<Shop>,
    users: Repository<User>,
}

impl ShopService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            shops: Repository::new(Collection::Shops, store.clone()),
            users: Repository::new(Collection::Users, store),
        }
    }

    /// Registers a shop owned by the caller and links it to the caller's account
    pub async fn register(&self, principal: &Principal, input: NewShop) -> ServiceResult<Shop> {
        let now = now();
        let shop = Shop {
            id: Uuid::new_v4(),
            shop_name: input.shop_name.trim().to_string(),
            theme: input.theme,
            email: input.email.trim().to_lowercase(),
            owner: principal.id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let shop = match self.shops.insert(&shop).await {
            Ok(shop) => shop,
            Err(StoreError::Duplicate { .. }) => {
                return Err(ServiceError::conflict("Shop name is already taken"))
            }
            Err(e) => return Err(e.into()),
        };

        let owner = self
            .users
            .select_id(principal.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        let mut shops = owner.shops;
        shops.push(shop.id);
        self.users
            .update(owner.id, json!({ "shops": shops, "updatedAt": timestamp::format(&now) }))
            .await?;

        info!("Registered shop {} ({}) for user {}", shop.shop_name, shop.id, principal.id);
        Ok(shop)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Shop> {
        self.shops
            .select_id(id)
            .await?
            .filter(|shop| shop.is_active)
            .ok_or_else(|| ServiceError::not_found("Shop not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use crate::database::MemoryStore;
    use crate::services::auth_service::{AuthService, Registration};

    #[tokio::test]
    async fn shop_names_are_unique_and_linked_to_the_owner() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let auth = AuthService::new(store.clone());
        let shops = ShopService::new(store);

        let user = auth
            .create_user(
                Registration {
                    full_name: "Owner".into(),
                    email: "owner@example.com".into(),
                    password: "secret1".into(),
                    phone: "5550001111".into(),
                },
                Role::User,
            )
            .await
            .unwrap();
        let principal = Principal::from(&user);

        let input = NewShop { shop_name: "Acme".into(), theme: "dark".into(), email: "acme@example.com".into() };
        let shop = shops.register(&principal, input.clone()).await.unwrap();
        assert_eq!(shop.owner, user.id);

        let refreshed = auth.load_principal(user.id).await.unwrap();
        assert!(refreshed.owns_shop(shop.id));

        let err = shops.register(&principal, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
