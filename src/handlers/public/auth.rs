use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::services::auth_service::{Credentials, Registration, Session};
use crate::state::AppState;

/// POST /auth/register - create an account and sign in
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<Registration>,
) -> ApiResult<Session> {
    let session = state.auth.register(input).await?;
    Ok(ApiResponse::created(session).with_message("User registered successfully"))
}

/// POST /auth/login - exchange credentials for a token
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(credentials): ValidatedJson<Credentials>,
) -> ApiResult<Session> {
    let session = state.auth.login(credentials).await?;
    Ok(ApiResponse::success(session).with_message("Login successful"))
}
