use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::error::{ServiceError, ServiceResult};
use crate::api::{PageRequest, Paginated};
use crate::auth::{authorize, Action, Principal, Resource};
use crate::database::models::{Category, Product, ProductListing, Shop, ShopSummary};
use crate::database::{Collection, DocumentStore, Repository};
use crate::types::{now, timestamp};

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Color is required"))]
    pub color: String,
    pub category: Uuid,
    #[validate(custom(function = "non_negative"))]
    pub price: Decimal,
    #[validate(url(message = "Invalid image URL"))]
    pub image: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i64,
    pub shop: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Color is required"))]
    pub color: Option<String>,
    pub category: Option<Uuid>,
    #[validate(custom(function = "non_negative"))]
    pub price: Option<Decimal>,
    #[validate(url(message = "Invalid image URL"))]
    pub image: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i64>,
}

/// Pairs products with the summaries of their shops (one lookup for all shops)
pub(crate) async fn attach_shops(
    shops: &Repository<Shop>,
    products: Vec<Product>,
) -> ServiceResult<Vec<ProductListing>> {
    let mut shop_ids: Vec<Uuid> = products.iter().map(|p| p.shop).collect();
    shop_ids.sort();
    shop_ids.dedup();

    let summaries: HashMap<Uuid, ShopSummary> = shops
        .select_ids(&shop_ids)
        .await?
        .iter()
        .map(|shop| (shop.id, ShopSummary::from(shop)))
        .collect();

    Ok(products
        .into_iter()
        .map(|product| {
            let shop_info = summaries.get(&product.shop).cloned();
            ProductListing { product, shop_info }
        })
        .collect())
}

#[derive(Clone)]
pub struct ProductService {
    products: Repository<Product>,
    categories: Repository<Category>,
    shops: Repository<Shop>,
}

impl ProductService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            products: Repository::new(Collection::Products, store.clone()),
            categories: Repository::new(Collection::Categories, store.clone()),
            shops: Repository::new(Collection::Shops, store),
        }
    }

    async fn require_active_category(&self, id: Uuid) -> ServiceResult<()> {
        match self.categories.select_id(id).await? {
            Some(category) if category.is_active => Ok(()),
            _ => Err(ServiceError::not_found("Category not found")),
        }
    }

    async fn active(&self, id: Uuid) -> ServiceResult<Product> {
        self.products
            .select_id(id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::not_found("Product not found"))
    }

    /// Active products, newest first
    pub async fn list(
        &self,
        category: Option<Uuid>,
        shop: Option<Uuid>,
        page: PageRequest,
    ) -> ServiceResult<Paginated<ProductListing>> {
        let mut filter = json!({ "isActive": true });
        if let Some(category) = category {
            filter["category"] = json!(category);
        }
        if let Some(shop) = shop {
            filter["shop"] = json!(shop);
        }

        let products = self.products.select_any(page.filter(filter.clone(), "createdAt desc")).await?;
        let total = self.products.count(filter).await?;
        let listings = attach_shops(&self.shops, products).await?;
        Ok(Paginated::new(listings, total, &page))
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<ProductListing> {
        let product = self.active(id).await?;
        let mut listings = attach_shops(&self.shops, vec![product]).await?;
        listings
            .pop()
            .ok_or_else(|| ServiceError::not_found("Product not found"))
    }

    pub async fn create(&self, principal: &Principal, input: NewProduct) -> ServiceResult<Product> {
        match self.shops.select_id(input.shop).await? {
            Some(shop) if shop.is_active => {}
            _ => return Err(ServiceError::not_found("Shop not found or inactive")),
        }
        authorize(principal, Resource::Shop(input.shop), Action::Manage)?;
        self.require_active_category(input.category).await?;

        let now = now();
        let product = Product {
            id: Uuid::new_v4(),
            name: input.name,
            color: input.color,
            category: input.category,
            price: input.price,
            image: input.image,
            description: input.description,
            stock: input.stock,
            shop: input.shop,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let product = self.products.insert(&product).await?;
        info!("Created product {} in shop {}", product.id, product.shop);
        Ok(product)
    }

    pub async fn update(&self, principal: &Principal, id: Uuid, patch: ProductPatch) -> ServiceResult<Product> {
        let existing = self.active(id).await?;
        authorize(principal, Resource::Shop(existing.shop), Action::Manage)?;

        let mut changes = Map::new();
        if let Some(category) = patch.category {
            self.require_active_category(category).await?;
            changes.insert("category".into(), json!(category));
        }
        if let Some(name) = patch.name {
            changes.insert("name".into(), json!(name));
        }
        if let Some(color) = patch.color {
            changes.insert("color".into(), json!(color));
        }
        if let Some(price) = patch.price {
            changes.insert("price".into(), json!(price));
        }
        if let Some(image) = patch.image {
            changes.insert("image".into(), json!(image));
        }
        if let Some(description) = patch.description {
            changes.insert("description".into(), json!(description));
        }
        if let Some(stock) = patch.stock {
            changes.insert("stock".into(), json!(stock));
        }
        changes.insert("updatedAt".into(), json!(timestamp::format(&now())));

        self.products
            .update(id, Value::Object(changes))
            .await?
            .ok_or_else(|| ServiceError::not_found("Product not found"))
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> ServiceResult<()> {
        let existing = self.active(id).await?;
        authorize(principal, Resource::Shop(existing.shop), Action::Manage)?;
        self.products
            .update(id, json!({ "isActive": false, "updatedAt": timestamp::format(&now()) }))
            .await?;
        info!("Deactivated product {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use crate::database::MemoryStore;

    struct Fixture {
        service: ProductService,
        owner: Principal,
        shop: Uuid,
        category: Uuid,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let now = now();
        let owner = Uuid::new_v4();
        let shop = Shop {
            id: Uuid::new_v4(),
            shop_name: "Lamps".to_string(),
            theme: "dark".to_string(),
            email: "lamps@example.com".to_string(),
            owner,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let category = Category {
            id: Uuid::new_v4(),
            name: "Lighting".to_string(),
            description: None,
            image: None,
            parent: None,
            sort_order: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        Repository::<Shop>::new(Collection::Shops, store.clone()).insert(&shop).await.unwrap();
        Repository::<Category>::new(Collection::Categories, store.clone())
            .insert(&category)
            .await
            .unwrap();
        Fixture {
            service: ProductService::new(store),
            owner: Principal { id: owner, role: Role::User, shops: vec![shop.id] },
            shop: shop.id,
            category: category.id,
        }
    }

    fn lamp(fx: &Fixture) -> NewProduct {
        NewProduct {
            name: "Desk lamp".to_string(),
            color: "brass".to_string(),
            category: fx.category,
            price: Decimal::new(4999, 2),
            image: None,
            description: None,
            stock: 4,
            shop: fx.shop,
        }
    }

    #[tokio::test]
    async fn only_the_shop_owner_adds_products() {
        let fx = fixture().await;
        let stranger = Principal { id: Uuid::new_v4(), role: Role::User, shops: vec![] };
        let err = fx.service.create(&stranger, lamp(&fx)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let admin = Principal { id: Uuid::new_v4(), role: Role::Admin, shops: vec![] };
        assert!(fx.service.create(&admin, lamp(&fx)).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let fx = fixture().await;
        let mut input = lamp(&fx);
        input.category = Uuid::new_v4();
        let err = fx.service.create(&fx.owner, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_patches_only_given_fields() {
        let fx = fixture().await;
        let product = fx.service.create(&fx.owner, lamp(&fx)).await.unwrap();
        let patch = ProductPatch { stock: Some(12), ..ProductPatch::default() };
        let updated = fx.service.update(&fx.owner, product.id, patch).await.unwrap();
        assert_eq!(updated.stock, 12);
        assert_eq!(updated.price, Decimal::new(4999, 2));
        assert_eq!(updated.name, "Desk lamp");
    }

    #[tokio::test]
    async fn deleted_products_disappear_from_listings() {
        let fx = fixture().await;
        let kept = fx.service.create(&fx.owner, lamp(&fx)).await.unwrap();
        let removed = fx.service.create(&fx.owner, lamp(&fx)).await.unwrap();
        fx.service.delete(&fx.owner, removed.id).await.unwrap();

        let listed = fx.service.list(None, Some(fx.shop), PageRequest::default()).await.unwrap();
        assert_eq!(listed.pagination.total, 1);
        assert_eq!(listed.items[0].product.id, kept.id);
        assert_eq!(listed.items[0].shop_info.as_ref().map(|s| s.shop_name.as_str()), Some("Lamps"));
        assert!(matches!(fx.service.get(removed.id).await, Err(ServiceError::NotFound(_))));
    }
}
