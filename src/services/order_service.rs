use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::error::{ServiceError, ServiceResult};
use super::notification_service::{NewNotification, NotificationService};
use super::pricing::{compute_totals, line_total};
use crate::api::{PageRequest, Paginated};
use crate::auth::{authorize, Action, Principal, Resource};
use crate::config;
use crate::database::models::{
    Customer, NotificationType, Order, OrderDetails, OrderItem, OrderStatus, PaymentMethod,
    PaymentStatus, Product, ProductSummary, Shop, ShopSummary,
};
use crate::database::{Collection, DocumentStore, Repository, StoreError};
use crate::filter::FilterData;
use crate::types::{now, timestamp, Period};

const ORDER_NUMBER_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    #[validate(nested)]
    pub customer: Customer,
    pub shop: Uuid,
    #[validate(length(min = 1, message = "At least one item is required"), nested)]
    pub items: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub average_order_value: Decimal,
    pub pending_orders: u64,
    pub completed_orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopAnalytics {
    pub period: Period,
    pub analytics: OrderSummary,
    pub status_breakdown: Vec<StatusCount>,
}

/// Aggregates a set of orders; delivered orders count as completed
pub fn summarize(orders: &[Order]) -> (OrderSummary, Vec<StatusCount>) {
    let mut summary = OrderSummary {
        total_orders: orders.len() as u64,
        ..OrderSummary::default()
    };
    let mut counts: HashMap<OrderStatus, u64> = HashMap::new();

    for order in orders {
        summary.total_revenue = summary.total_revenue.saturating_add(order.total);
        *counts.entry(order.status).or_default() += 1;
    }
    summary.pending_orders = counts.get(&OrderStatus::Pending).copied().unwrap_or(0);
    summary.completed_orders = counts.get(&OrderStatus::Delivered).copied().unwrap_or(0);
    if !orders.is_empty() {
        summary.average_order_value = (summary.total_revenue / Decimal::from(orders.len()))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    }

    let breakdown = OrderStatus::ALL
        .iter()
        .filter_map(|status| {
            counts
                .get(status)
                .map(|count| StatusCount { status: *status, count: *count })
        })
        .collect();
    (summary, breakdown)
}

/// `ORD-<utc seconds>-<12 hex digits>`
fn order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..12].to_uppercase();
    format!("ORD-{}-{}", now().format("%Y%m%d%H%M%S"), suffix)
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn DocumentStore>,
    orders: Repository<Order>,
    products: Repository<Product>,
    shops: Repository<Shop>,
    notifications: NotificationService,
}

impl OrderService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            orders: Repository::new(Collection::Orders, store.clone()),
            products: Repository::new(Collection::Products, store.clone()),
            shops: Repository::new(Collection::Shops, store.clone()),
            notifications: NotificationService::new(store.clone()),
            store,
        }
    }

    /// Validates the cart, reserves stock line by line and records the order.
    ///
    /// A reservation only succeeds while enough stock remains, so concurrent
    /// orders cannot oversell. When a later step fails every reservation made
    /// so far is released before the error is returned.
    pub async fn place_order(&self, input: PlaceOrder) -> ServiceResult<OrderDetails> {
        if input.items.is_empty() {
            return Err(ServiceError::field("items", "At least one item is required"));
        }
        if input.items.iter().any(|line| line.quantity == 0) {
            return Err(ServiceError::field("items", "Quantity must be at least 1"));
        }

        let shop = self
            .shops
            .select_id(input.shop)
            .await?
            .filter(|shop| shop.is_active)
            .ok_or_else(|| ServiceError::not_found("Shop not found or inactive"))?;

        let mut catalog: HashMap<Uuid, Product> = HashMap::new();
        let mut requested: HashMap<Uuid, u32> = HashMap::new();
        for line in &input.items {
            if !catalog.contains_key(&line.product) {
                let product = self
                    .products
                    .select_id(line.product)
                    .await?
                    .filter(|p| p.is_active && p.shop == shop.id)
                    .ok_or_else(|| ServiceError::not_found(format!("Product {} not found", line.product)))?;
                catalog.insert(product.id, product);
            }
            let wanted = requested.entry(line.product).or_default();
            *wanted = wanted.saturating_add(line.quantity);
            let stock = catalog.get(&line.product).map(|p| p.stock).unwrap_or(0);
            if i64::from(*wanted) > stock {
                return Err(ServiceError::InsufficientStock {
                    product: line.product,
                    requested: *wanted,
                    available: stock,
                });
            }
        }

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let price = catalog
                .get(&line.product)
                .map(|p| p.price)
                .ok_or_else(|| ServiceError::not_found(format!("Product {} not found", line.product)))?;
            let total = line_total(price, line.quantity).ok_or_else(out_of_range)?;
            items.push(OrderItem {
                product: line.product,
                quantity: line.quantity,
                price,
                total,
            });
        }
        let totals = compute_totals(&items).ok_or_else(out_of_range)?;

        let remaining = self.reserve(&items).await?;

        let now = now();
        let mut order = Order {
            id: Uuid::new_v4(),
            order_number: order_number(),
            customer: input.customer,
            shop: shop.id,
            items,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: input.payment_method,
            payment_id: None,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            discount: totals.discount,
            total: totals.total,
            notes: input.notes,
            tracking_number: None,
            shipped_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut attempt = 1;
        let order = loop {
            match self.orders.insert(&order).await {
                Ok(saved) => break saved,
                Err(StoreError::Duplicate { ref field, .. })
                    if field == "orderNumber" && attempt < ORDER_NUMBER_ATTEMPTS =>
                {
                    attempt += 1;
                    order.order_number = order_number();
                }
                Err(err) => {
                    error!("Failed to store order for shop {}: {}", shop.id, err);
                    self.release(&order.items).await;
                    return Err(err.into());
                }
            }
        };
        info!(
            "Placed order {} for shop {} (total {})",
            order.order_number, order.shop, order.total
        );

        self.notify_placed(&shop, &order, &catalog, &remaining).await;

        let products = order
            .items
            .iter()
            .filter_map(|item| catalog.get(&item.product))
            .map(ProductSummary::from)
            .collect::<Vec<_>>();
        Ok(OrderDetails {
            shop_info: Some(ShopSummary::from(&shop)),
            products: dedup_summaries(products),
            order,
        })
    }

    /// Conditionally decrements stock for every line, returning the stock left
    /// per product
    async fn reserve(&self, items: &[OrderItem]) -> ServiceResult<HashMap<Uuid, i64>> {
        let mut reserved: Vec<OrderItem> = Vec::with_capacity(items.len());
        let mut remaining = HashMap::new();

        for item in items {
            let outcome = self
                .store
                .decrement_if_available(Collection::Products, item.product, "stock", i64::from(item.quantity))
                .await;
            match outcome {
                Ok(Some(doc)) => {
                    remaining.insert(item.product, doc.get("stock").and_then(Value::as_i64).unwrap_or(0));
                    reserved.push(item.clone());
                }
                Ok(None) => {
                    self.release(&reserved).await;
                    let available = self
                        .products
                        .select_id(item.product)
                        .await?
                        .map(|p| p.stock)
                        .unwrap_or(0);
                    warn!(
                        "Stock reservation failed for product {}: requested {}, available {}",
                        item.product, item.quantity, available
                    );
                    return Err(ServiceError::InsufficientStock {
                        product: item.product,
                        requested: item.quantity,
                        available,
                    });
                }
                Err(err) => {
                    self.release(&reserved).await;
                    return Err(err.into());
                }
            }
        }
        Ok(remaining)
    }

    async fn release(&self, items: &[OrderItem]) {
        for item in items {
            if let Err(err) = self
                .store
                .increment(Collection::Products, item.product, "stock", i64::from(item.quantity))
                .await
            {
                error!(
                    "Failed to release {} units of product {}: {}",
                    item.quantity, item.product, err
                );
            }
        }
    }

    async fn notify_placed(
        &self,
        shop: &Shop,
        order: &Order,
        catalog: &HashMap<Uuid, Product>,
        remaining: &HashMap<Uuid, i64>,
    ) {
        let placed = NewNotification {
            user: shop.owner,
            shop: shop.id,
            kind: NotificationType::OrderPlaced,
            title: "New order received".to_string(),
            message: format!("Order {} was placed for {}", order.order_number, order.total),
            data: json!({ "orderId": order.id, "orderNumber": order.order_number, "total": order.total }),
        };
        if let Err(err) = self.notifications.create(placed).await {
            warn!("Could not record order notification for {}: {}", order.order_number, err);
        }

        let threshold = config::config().inventory.low_stock_threshold;
        let mut low: Vec<(&Uuid, &i64)> = remaining.iter().filter(|(_, stock)| **stock <= threshold).collect();
        low.sort();
        for (product_id, stock) in low {
            let name = catalog.get(product_id).map(|p| p.name.as_str()).unwrap_or("A product");
            let notice = NewNotification {
                user: shop.owner,
                shop: shop.id,
                kind: NotificationType::LowStock,
                title: "Low stock".to_string(),
                message: format!("{} has {} left in stock", name, stock),
                data: json!({ "productId": product_id, "stock": stock }),
            };
            if let Err(err) = self.notifications.create(notice).await {
                warn!("Could not record low stock notification for {}: {}", product_id, err);
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<OrderDetails> {
        let order = self
            .orders
            .select_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order not found"))?;
        self.details(order).await
    }

    async fn details(&self, order: Order) -> ServiceResult<OrderDetails> {
        let shop_info = self.shops.select_id(order.shop).await?.as_ref().map(ShopSummary::from);
        let mut ids: Vec<Uuid> = order.items.iter().map(|item| item.product).collect();
        ids.sort();
        ids.dedup();
        let products = self
            .products
            .select_ids(&ids)
            .await?
            .iter()
            .map(ProductSummary::from)
            .collect();
        Ok(OrderDetails { order, shop_info, products })
    }

    /// A shop's orders, newest first
    pub async fn list_for_shop(
        &self,
        principal: &Principal,
        shop: Uuid,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> ServiceResult<Paginated<Order>> {
        authorize(principal, Resource::Shop(shop), Action::Read)?;
        let mut filter = json!({ "shop": shop });
        if let Some(status) = status {
            filter["status"] = json!(status);
        }
        let orders = self.orders.select_any(page.filter(filter.clone(), "createdAt desc")).await?;
        let total = self.orders.count(filter).await?;
        Ok(Paginated::new(orders, total, &page))
    }

    async fn managed(&self, principal: &Principal, id: Uuid) -> ServiceResult<Order> {
        let order = self
            .orders
            .select_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order not found"))?;
        authorize(principal, Resource::Shop(order.shop), Action::Manage)?;
        Ok(order)
    }

    pub async fn update_status(&self, principal: &Principal, id: Uuid, update: StatusUpdate) -> ServiceResult<Order> {
        let order = self.managed(principal, id).await?;
        if !order.status.can_transition_to(update.status) {
            warn!(
                "Rejected status change of order {} from {} to {}",
                order.order_number,
                order.status.as_str(),
                update.status.as_str()
            );
            return Err(ServiceError::conflict(format!(
                "Cannot change order status from {} to {}",
                order.status.as_str(),
                update.status.as_str()
            )));
        }

        let stamp = timestamp::format(&now());
        let mut changes = Map::new();
        changes.insert("status".into(), json!(update.status));
        if let Some(tracking) = update.tracking_number {
            changes.insert("trackingNumber".into(), json!(tracking));
        }
        if update.status == OrderStatus::Shipped && order.shipped_at.is_none() {
            changes.insert("shippedAt".into(), json!(stamp));
        }
        if update.status == OrderStatus::Delivered && order.delivered_at.is_none() {
            changes.insert("deliveredAt".into(), json!(stamp));
        }
        changes.insert("updatedAt".into(), json!(stamp));

        let updated = self
            .orders
            .update(id, Value::Object(changes))
            .await?
            .ok_or_else(|| ServiceError::not_found("Order not found"))?;
        info!(
            "Order {} moved from {} to {}",
            updated.order_number,
            order.status.as_str(),
            updated.status.as_str()
        );
        Ok(updated)
    }

    /// Records the payment state reported for an order
    pub async fn update_payment(&self, principal: &Principal, id: Uuid, update: PaymentUpdate) -> ServiceResult<Order> {
        self.managed(principal, id).await?;

        let mut changes = Map::new();
        changes.insert("paymentStatus".into(), json!(update.payment_status));
        if let Some(payment_id) = update.payment_id {
            changes.insert("paymentId".into(), json!(payment_id));
        }
        changes.insert("updatedAt".into(), json!(timestamp::format(&now())));

        let updated = self
            .orders
            .update(id, Value::Object(changes))
            .await?
            .ok_or_else(|| ServiceError::not_found("Order not found"))?;
        info!(
            "Order {} payment status is now {}",
            updated.order_number,
            updated.payment_status.as_str()
        );
        Ok(updated)
    }

    pub async fn analytics(&self, principal: &Principal, shop: Uuid, period: Period) -> ServiceResult<ShopAnalytics> {
        authorize(principal, Resource::Shop(shop), Action::Read)?;
        let since = timestamp::format(&period.start_from(now()));
        let orders = self
            .orders
            .select_any(FilterData::matching(json!({
                "shop": shop,
                "createdAt": { "$gte": since },
            })))
            .await?;
        debug!("Computing {} analytics over {} orders for shop {}", period.as_str(), orders.len(), shop);

        let (analytics, status_breakdown) = summarize(&orders);
        Ok(ShopAnalytics { period, analytics, status_breakdown })
    }
}

fn out_of_range() -> ServiceError {
    ServiceError::field("items", "Order total is out of range")
}

fn dedup_summaries(mut products: Vec<ProductSummary>) -> Vec<ProductSummary> {
    let mut seen = std::collections::HashSet::new();
    products.retain(|p| seen.insert(p.id));
    products
}
