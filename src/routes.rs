use axum::{
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{jwt_auth_middleware, load_principal_middleware};
use crate::state::AppState;

/// The complete HTTP surface over `state`
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .with_state(state);

    let api = &config::config().api;
    if api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    if let Some(cors) = cors_layer() {
        router = router.layer(cors);
    }
    router
}

fn cors_layer() -> Option<CorsLayer> {
    let security = &config::config().security;
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any),
    )
}

fn public_routes() -> Router<AppState> {
    use public::{auth, catalog, orders};

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/shops/:id", get(catalog::shop_get))
        .route("/products", get(catalog::product_list))
        .route("/products/:id", get(catalog::product_get))
        .route("/categories", get(catalog::category_list))
        .route("/categories/tree", get(catalog::category_tree))
        .route("/categories/:id", get(catalog::category_get))
        .route("/categories/:id/products", get(catalog::category_products))
        .route("/orders", post(orders::order_create))
        .route("/orders/:id", get(orders::order_get))
}

/// Everything under /api. The JWT layer is added last so it runs first.
fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, categories, notifications, orders, products, shops};

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/shops", post(shops::shop_create))
        .route("/api/products", post(products::product_create))
        .route(
            "/api/products/:id",
            put(products::product_update).delete(products::product_delete),
        )
        .route("/api/categories", post(categories::category_create))
        .route(
            "/api/categories/:id",
            put(categories::category_update).delete(categories::category_delete),
        )
        .route("/api/orders/shop/:shop_id", get(orders::shop_orders))
        .route("/api/orders/shop/:shop_id/analytics", get(orders::shop_analytics))
        .route("/api/orders/:id/status", put(orders::order_status))
        .route("/api/orders/:id/payment", put(orders::order_payment))
        .route("/api/notifications", get(notifications::notification_list))
        .route("/api/notifications/read-all", put(notifications::notification_read_all))
        .route("/api/notifications/:id/read", put(notifications::notification_read))
        .route(
            "/api/notifications/:id",
            axum::routing::delete(notifications::notification_delete),
        )
        .route("/api/notifications/shop/:shop_id", get(notifications::shop_notifications))
        .merge(admin_routes())
        .route_layer(from_fn_with_state(state, load_principal_middleware))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn admin_routes() -> Router<AppState> {
    use elevated::admin;

    Router::new()
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/users", get(admin::user_list))
        .route("/api/admin/users/:id/status", put(admin::user_status))
        .route("/api/admin/users/:id/role", put(admin::user_role))
        .route("/api/admin/shops", get(admin::shop_list))
        .route("/api/admin/shops/:id/status", put(admin::shop_status))
        .route("/api/admin/orders", get(admin::order_list))
        .route("/api/admin/orders/:id/status", put(admin::order_status))
        .route("/api/admin/analytics/revenue", get(admin::revenue))
}
