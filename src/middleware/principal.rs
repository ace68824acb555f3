use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Loads the caller's account for a verified token.
///
/// Runs after `jwt_auth_middleware`. The user must still exist and be active;
/// the role and shop list come from the stored account, not from the token.
pub async fn load_principal_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required"))?;

    let principal = state.auth.load_principal(auth_user.user_id).await?;
    if principal.role != auth_user.role {
        tracing::debug!(
            "Role of user {} changed since token was issued ({} -> {})",
            principal.id,
            auth_user.role.as_str(),
            principal.role.as_str()
        );
    }

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
