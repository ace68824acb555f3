pub mod category;
pub mod notification;
pub mod order;
pub mod product;
pub mod shop;
pub mod user;

pub use category::{Category, CategoryNode};
pub use notification::{Notification, NotificationType};
pub use order::{
    Address, Customer, Order, OrderDetails, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
};
pub use product::{Product, ProductListing, ProductSummary};
pub use shop::{Shop, ShopSummary};
pub use user::{PublicUser, Role, User};
