use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::auth::{authorize, Action, Principal, Resource};
use crate::database::models::Category;
use crate::middleware::{ApiPath, ApiResponse, ApiResult, ValidatedJson};
use crate::services::category_service::{CategoryPatch, NewCategory};
use crate::state::AppState;

/// POST /api/categories (admin)
pub async fn category_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(input): ValidatedJson<NewCategory>,
) -> ApiResult<Category> {
    authorize(&principal, Resource::Platform, Action::Manage)?;
    let category = state.categories.create(input).await?;
    Ok(ApiResponse::created(category).with_message("Category created successfully"))
}

/// PUT /api/categories/:id (admin)
pub async fn category_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<CategoryPatch>,
) -> ApiResult<Category> {
    authorize(&principal, Resource::Platform, Action::Manage)?;
    let category = state.categories.update(id, patch).await?;
    Ok(ApiResponse::success(category).with_message("Category updated successfully"))
}

/// DELETE /api/categories/:id (admin) - soft delete
pub async fn category_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    authorize(&principal, Resource::Platform, Action::Manage)?;
    state.categories.delete(id).await?;
    Ok(ApiResponse::message_only("Category deleted successfully"))
}
