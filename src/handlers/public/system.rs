use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;
use crate::types::{now, timestamp};

/// GET / - service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Storefront API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant storefront backend",
            "endpoints": {
                "auth": "/auth/register, /auth/login (public), /api/auth/me",
                "shops": "/shops/:id (public), /api/shops",
                "products": "/products[/:id] (public), /api/products[/:id]",
                "categories": "/categories, /categories/tree, /categories/:id[/products] (public), /api/categories[/:id] (admin)",
                "orders": "/orders (public), /orders/:id (public), /api/orders/*",
                "notifications": "/api/notifications/*",
                "admin": "/api/admin/* (admin)",
            }
        }
    }))
}

/// GET /health - store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let checked_at = timestamp::format(&now());
    let backend = state.store.backend_name();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": checked_at, "store": backend }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed on {} store: {}", backend, e);
            let mut body = json!({
                "success": false,
                "error": true,
                "message": "Store unavailable",
                "data": { "status": "degraded", "timestamp": checked_at, "store": backend }
            });
            if !crate::is_production!() {
                body["details"] = json!(e.to_string());
            }
            (StatusCode::SERVICE_UNAVAILABLE, Json(body))
        }
    }
}
