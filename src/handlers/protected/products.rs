use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::auth::Principal;
use crate::database::models::Product;
use crate::middleware::{ApiPath, ApiResponse, ApiResult, ValidatedJson};
use crate::services::product_service::{NewProduct, ProductPatch};
use crate::state::AppState;

/// POST /api/products
pub async fn product_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(input): ValidatedJson<NewProduct>,
) -> ApiResult<Product> {
    let product = state.products.create(&principal, input).await?;
    Ok(ApiResponse::created(product).with_message("Product created successfully"))
}

/// PUT /api/products/:id
pub async fn product_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<ProductPatch>,
) -> ApiResult<Product> {
    let product = state.products.update(&principal, id, patch).await?;
    Ok(ApiResponse::success(product).with_message("Product updated successfully"))
}

/// DELETE /api/products/:id - soft delete
pub async fn product_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    state.products.delete(&principal, id).await?;
    Ok(ApiResponse::message_only("Product deleted successfully"))
}
