use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use super::super::PageQuery;
use crate::api::Paginated;
use crate::auth::Principal;
use crate::database::models::{Order, OrderStatus};
use crate::error::ApiError;
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult, ValidatedJson};
use crate::services::order_service::{PaymentUpdate, ShopAnalytics, StatusUpdate};
use crate::state::AppState;
use crate::types::Period;

#[derive(Debug, Deserialize)]
pub struct ShopOrderQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub period: Option<String>,
}

/// Parses `?period=`, defaulting to 30 days
pub fn parse_period(raw: Option<&str>) -> Result<Period, ApiError> {
    match raw {
        None => Ok(Period::default()),
        Some(raw) => Period::parse(raw)
            .ok_or_else(|| ApiError::bad_request("period must be one of 7d, 30d, 90d, 1y")),
    }
}

/// GET /api/orders/shop/:shop_id
pub async fn shop_orders(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(shop_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ShopOrderQuery>,
) -> ApiResult<Paginated<Order>> {
    let page = PageQuery { page: query.page, limit: query.limit }.request();
    let orders = state.orders.list_for_shop(&principal, shop_id, query.status, page).await?;
    Ok(ApiResponse::success(orders))
}

/// GET /api/orders/shop/:shop_id/analytics
pub async fn shop_analytics(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(shop_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<AnalyticsQuery>,
) -> ApiResult<ShopAnalytics> {
    let period = parse_period(query.period.as_deref())?;
    Ok(ApiResponse::success(state.orders.analytics(&principal, shop_id, period).await?))
}

/// PUT /api/orders/:id/status
pub async fn order_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(update): ValidatedJson<StatusUpdate>,
) -> ApiResult<Order> {
    let order = state.orders.update_status(&principal, id, update).await?;
    Ok(ApiResponse::success(order).with_message("Order status updated successfully"))
}

/// PUT /api/orders/:id/payment
pub async fn order_payment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(update): ValidatedJson<PaymentUpdate>,
) -> ApiResult<Order> {
    let order = state.orders.update_payment(&principal, id, update).await?;
    Ok(ApiResponse::success(order).with_message("Payment status updated successfully"))
}
