use axum::extract::State;
use uuid::Uuid;

use crate::database::models::OrderDetails;
use crate::middleware::{ApiPath, ApiResponse, ApiResult, ValidatedJson};
use crate::services::order_service::PlaceOrder;
use crate::state::AppState;

/// POST /orders - customer checkout
pub async fn order_create(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<PlaceOrder>,
) -> ApiResult<OrderDetails> {
    let order = state.orders.place_order(input).await?;
    Ok(ApiResponse::created(order).with_message("Order created successfully"))
}

/// GET /orders/:id
pub async fn order_get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<OrderDetails> {
    Ok(ApiResponse::success(state.orders.get(id).await?))
}
