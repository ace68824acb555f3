// Endpoints behind `jwt_auth_middleware` and `load_principal_middleware`.
// Every handler receives the caller as `Extension<Principal>`; ownership and
// role checks happen in the services through `authorize`.
pub mod auth;
pub mod categories;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod shops;
