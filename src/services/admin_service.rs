use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::error::{ServiceError, ServiceResult};
use crate::api::{PageRequest, Paginated};
use crate::auth::{authorize, Action, Principal, Resource};
use crate::database::models::{Order, OrderStatus, PaymentStatus, Product, PublicUser, Role, Shop, User};
use crate::database::{Collection, DocumentStore, Repository};
use crate::filter::FilterData;
use crate::types::{now, timestamp, Period};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_users: u64,
    pub total_shops: u64,
    pub active_shops: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub statistics: Statistics,
    pub recent_orders: Vec<Order>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

/// A shop with its owner populated, as listed to administrators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminShop {
    #[serde(flatten)]
    pub shop: Shop,
    pub owner_info: Option<OwnerSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePoint {
    pub date: NaiveDate,
    pub total_revenue: Decimal,
    pub order_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub period: Period,
    pub revenue_data: Vec<RevenuePoint>,
}

/// Case-insensitive substring pattern for `$ilike`
fn contains_pattern(search: &str) -> String {
    format!("%{}%", search.trim())
}

/// Paid orders bucketed by UTC calendar day, oldest first
pub fn daily_revenue(orders: &[Order]) -> Vec<RevenuePoint> {
    let mut days: BTreeMap<NaiveDate, (Decimal, u64)> = BTreeMap::new();
    for order in orders.iter().filter(|o| o.payment_status == PaymentStatus::Paid) {
        let day = days.entry(order.created_at.date_naive()).or_insert((Decimal::ZERO, 0));
        day.0 = day.0.saturating_add(order.total);
        day.1 += 1;
    }
    days.into_iter()
        .map(|(date, (total_revenue, order_count))| RevenuePoint { date, total_revenue, order_count })
        .collect()
}

#[derive(Clone)]
pub struct AdminService {
    users: Repository<User>,
    shops: Repository<Shop>,
    products: Repository<Product>,
    orders: Repository<Order>,
}

impl AdminService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: Repository::new(Collection::Users, store.clone()),
            shops: Repository::new(Collection::Shops, store.clone()),
            products: Repository::new(Collection::Products, store.clone()),
            orders: Repository::new(Collection::Orders, store),
        }
    }

    pub async fn dashboard(&self, principal: &Principal) -> ServiceResult<Dashboard> {
        authorize(principal, Resource::Platform, Action::Read)?;

        let (total_users, total_shops, active_shops, total_products, total_orders, paid, recent_orders) = futures::try_join!(
            self.users.count(json!({ "role": Role::User })),
            self.shops.count(json!({})),
            self.shops.count(json!({ "isActive": true })),
            self.products.count(json!({ "isActive": true })),
            self.orders.count(json!({})),
            self.orders
                .select_any(FilterData::matching(json!({ "paymentStatus": PaymentStatus::Paid }))),
            self.orders
                .select_any(FilterData::matching(json!({})).order("createdAt desc").page(10, 0)),
        )?;
        let statistics = Statistics {
            total_users,
            total_shops,
            active_shops,
            total_products,
            total_orders,
            total_revenue: paid.iter().fold(Decimal::ZERO, |sum, o| sum.saturating_add(o.total)),
        };

        Ok(Dashboard { statistics, recent_orders })
    }

    /// Users matching `search` on name or email, newest first
    pub async fn list_users(
        &self,
        principal: &Principal,
        search: Option<&str>,
        role: Option<Role>,
        page: PageRequest,
    ) -> ServiceResult<Paginated<PublicUser>> {
        authorize(principal, Resource::Platform, Action::Read)?;

        let mut filter = json!({});
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = contains_pattern(search);
            filter["$or"] = json!([
                { "fullName": { "$ilike": pattern } },
                { "email": { "$ilike": pattern } },
            ]);
        }
        if let Some(role) = role {
            filter["role"] = json!(role);
        }

        let users = self.users.select_any(page.filter(filter.clone(), "createdAt desc")).await?;
        let total = self.users.count(filter).await?;
        Ok(Paginated::new(users, total, &page).map(PublicUser::from))
    }

    pub async fn set_user_active(&self, principal: &Principal, id: Uuid, active: bool) -> ServiceResult<PublicUser> {
        authorize(principal, Resource::Platform, Action::Manage)?;
        let user = self
            .users
            .update(id, json!({ "isActive": active, "updatedAt": timestamp::format(&now()) }))
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        info!("User {} {} by {}", id, if active { "activated" } else { "deactivated" }, principal.id);
        Ok(user.into())
    }

    pub async fn set_user_role(&self, principal: &Principal, id: Uuid, role: Role) -> ServiceResult<PublicUser> {
        authorize(principal, Resource::UserRole, Action::Manage)?;
        let user = self
            .users
            .update(id, json!({ "role": role, "updatedAt": timestamp::format(&now()) }))
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        info!("User {} is now {} (changed by {})", id, role.as_str(), principal.id);
        Ok(user.into())
    }

    async fn with_owners(&self, shops: Vec<Shop>) -> ServiceResult<Vec<AdminShop>> {
        let mut owner_ids: Vec<Uuid> = shops.iter().map(|s| s.owner).collect();
        owner_ids.sort();
        owner_ids.dedup();
        let owners: Vec<User> = self.users.select_ids(&owner_ids).await?;

        Ok(shops
            .into_iter()
            .map(|shop| {
                let owner_info = owners.iter().find(|u| u.id == shop.owner).map(|u| OwnerSummary {
                    id: u.id,
                    full_name: u.full_name.clone(),
                    email: u.email.clone(),
                });
                AdminShop { shop, owner_info }
            })
            .collect())
    }

    pub async fn list_shops(
        &self,
        principal: &Principal,
        search: Option<&str>,
        status: Option<ShopStatus>,
        page: PageRequest,
    ) -> ServiceResult<Paginated<AdminShop>> {
        authorize(principal, Resource::Platform, Action::Read)?;

        let mut filter = json!({});
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = contains_pattern(search);
            filter["$or"] = json!([
                { "shopName": { "$ilike": pattern } },
                { "email": { "$ilike": pattern } },
            ]);
        }
        if let Some(status) = status {
            filter["isActive"] = json!(status == ShopStatus::Active);
        }

        let shops = self.shops.select_any(page.filter(filter.clone(), "createdAt desc")).await?;
        let total = self.shops.count(filter).await?;
        let shops = self.with_owners(shops).await?;
        Ok(Paginated::new(shops, total, &page))
    }

    pub async fn set_shop_active(&self, principal: &Principal, id: Uuid, active: bool) -> ServiceResult<AdminShop> {
        authorize(principal, Resource::Platform, Action::Manage)?;
        let shop = self
            .shops
            .update(id, json!({ "isActive": active, "updatedAt": timestamp::format(&now()) }))
            .await?
            .ok_or_else(|| ServiceError::not_found("Shop not found"))?;
        info!("Shop {} {} by {}", id, if active { "activated" } else { "deactivated" }, principal.id);
        self.with_owners(vec![shop])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Shop not found"))
    }

    pub async fn list_orders(
        &self,
        principal: &Principal,
        status: Option<OrderStatus>,
        shop: Option<Uuid>,
        page: PageRequest,
    ) -> ServiceResult<Paginated<Order>> {
        authorize(principal, Resource::Platform, Action::Read)?;

        let mut filter = json!({});
        if let Some(status) = status {
            filter["status"] = json!(status);
        }
        if let Some(shop) = shop {
            filter["shop"] = json!(shop);
        }
        let orders = self.orders.select_any(page.filter(filter.clone(), "createdAt desc")).await?;
        let total = self.orders.count(filter).await?;
        Ok(Paginated::new(orders, total, &page))
    }

    pub async fn revenue(&self, principal: &Principal, period: Period) -> ServiceResult<RevenueReport> {
        authorize(principal, Resource::Platform, Action::Read)?;
        let since = timestamp::format(&period.start_from(now()));
        let orders = self
            .orders
            .select_any(FilterData::matching(json!({
                "paymentStatus": PaymentStatus::Paid,
                "createdAt": { "$gte": since },
            })))
            .await?;
        Ok(RevenueReport { period, revenue_data: daily_revenue(&orders) })
    }
}

/// `{"isActive": bool}` request body for the status toggles
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActiveToggle {
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoleChange {
    pub role: Role,
}
