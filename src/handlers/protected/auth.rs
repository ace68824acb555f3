use axum::{extract::State, Extension};

use crate::auth::Principal;
use crate::database::models::PublicUser;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/auth/me - the caller's account
pub async fn me(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> ApiResult<PublicUser> {
    Ok(ApiResponse::success(state.auth.me(&principal).await?))
}
