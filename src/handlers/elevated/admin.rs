use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use super::super::protected::orders::parse_period;
use super::super::PageQuery;
use crate::api::Paginated;
use crate::auth::{authorize, Action, Principal, Resource};
use crate::database::models::{Order, OrderStatus, PublicUser, Role};
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult, ValidatedJson};
use crate::services::admin_service::{ActiveToggle, AdminShop, Dashboard, RevenueReport, RoleChange, ShopStatus};
use crate::services::order_service::StatusUpdate;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<ShopStatus>,
}

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<OrderStatus>,
    pub shop: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub period: Option<String>,
}

fn toggled(active: bool) -> &'static str {
    if active {
        "activated"
    } else {
        "deactivated"
    }
}

/// GET /api/admin/dashboard
pub async fn dashboard(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> ApiResult<Dashboard> {
    Ok(ApiResponse::success(state.admin.dashboard(&principal).await?))
}

/// GET /api/admin/users
pub async fn user_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<Paginated<PublicUser>> {
    let page = PageQuery { page: query.page, limit: query.limit }.request();
    let users = state
        .admin
        .list_users(&principal, query.search.as_deref(), query.role, page)
        .await?;
    Ok(ApiResponse::success(users))
}

/// PUT /api/admin/users/:id/status
pub async fn user_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(body): ValidatedJson<ActiveToggle>,
) -> ApiResult<PublicUser> {
    let user = state.admin.set_user_active(&principal, id, body.is_active).await?;
    Ok(ApiResponse::success(user).with_message(format!("User {} successfully", toggled(body.is_active))))
}

/// PUT /api/admin/users/:id/role (super admin)
pub async fn user_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(body): ValidatedJson<RoleChange>,
) -> ApiResult<PublicUser> {
    let user = state.admin.set_user_role(&principal, id, body.role).await?;
    Ok(ApiResponse::success(user).with_message("User role updated successfully"))
}

/// GET /api/admin/shops
pub async fn shop_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<ShopQuery>,
) -> ApiResult<Paginated<AdminShop>> {
    let page = PageQuery { page: query.page, limit: query.limit }.request();
    let shops = state
        .admin
        .list_shops(&principal, query.search.as_deref(), query.status, page)
        .await?;
    Ok(ApiResponse::success(shops))
}

/// PUT /api/admin/shops/:id/status
pub async fn shop_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(body): ValidatedJson<ActiveToggle>,
) -> ApiResult<AdminShop> {
    let shop = state.admin.set_shop_active(&principal, id, body.is_active).await?;
    Ok(ApiResponse::success(shop).with_message(format!("Shop {} successfully", toggled(body.is_active))))
}

/// GET /api/admin/orders
pub async fn order_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<Paginated<Order>> {
    let page = PageQuery { page: query.page, limit: query.limit }.request();
    let orders = state.admin.list_orders(&principal, query.status, query.shop, page).await?;
    Ok(ApiResponse::success(orders))
}

/// PUT /api/admin/orders/:id/status - same transitions as shop owners get
pub async fn order_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(update): ValidatedJson<StatusUpdate>,
) -> ApiResult<Order> {
    authorize(&principal, Resource::Platform, Action::Manage)?;
    let order = state.orders.update_status(&principal, id, update).await?;
    Ok(ApiResponse::success(order).with_message("Order status updated successfully"))
}

/// GET /api/admin/analytics/revenue
pub async fn revenue(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<RevenueQuery>,
) -> ApiResult<RevenueReport> {
    let period = parse_period(query.period.as_deref())?;
    Ok(ApiResponse::success(state.admin.revenue(&principal, period).await?))
}
