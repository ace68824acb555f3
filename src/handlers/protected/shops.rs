use axum::{extract::State, Extension};

use crate::auth::Principal;
use crate::database::models::Shop;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::services::shop_service::NewShop;
use crate::state::AppState;

/// POST /api/shops - register a shop owned by the caller
pub async fn shop_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(input): ValidatedJson<NewShop>,
) -> ApiResult<Shop> {
    let shop = state.shops.register(&principal, input).await?;
    Ok(ApiResponse::created(shop).with_message("Shop registered successfully"))
}
