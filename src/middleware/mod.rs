pub mod auth;
pub mod extract;
pub mod principal;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use extract::{ApiPath, ApiQuery, ValidatedJson};
pub use principal::load_principal_middleware;
pub use response::{ApiResponse, ApiResult};
