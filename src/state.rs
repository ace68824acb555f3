use std::sync::Arc;

use crate::database::DocumentStore;
use crate::services::{
    AdminService, AuthService, CategoryService, NotificationService, OrderService, ProductService,
    ShopService,
};

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub auth: AuthService,
    pub shops: ShopService,
    pub products: ProductService,
    pub categories: CategoryService,
    pub orders: OrderService,
    pub notifications: NotificationService,
    pub admin: AdminService,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            auth: AuthService::new(store.clone()),
            shops: ShopService::new(store.clone()),
            products: ProductService::new(store.clone()),
            categories: CategoryService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            notifications: NotificationService::new(store.clone()),
            admin: AdminService::new(store.clone()),
            store,
        }
    }
}
