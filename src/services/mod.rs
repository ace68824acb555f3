pub mod admin_service;
pub mod auth_service;
pub mod category_service;
pub mod error;
pub mod notification_service;
pub mod order_service;
pub mod pricing;
pub mod product_service;
pub mod shop_service;

pub use admin_service::AdminService;
pub use auth_service::AuthService;
pub use category_service::CategoryService;
pub use error::{ServiceError, ServiceResult};
pub use notification_service::NotificationService;
pub use order_service::OrderService;
pub use product_service::ProductService;
pub use shop_service::ShopService;
