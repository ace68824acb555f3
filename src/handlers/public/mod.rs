// Endpoints reachable without a token: service info, sign-up and sign-in,
// the catalog and order placement by customers.
pub mod auth;
pub mod catalog;
pub mod orders;
pub mod system;
