mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{money, order_body, TestApp};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

struct Storefront {
    app: TestApp,
    owner: String,
    shop: Uuid,
    category: Uuid,
}

async fn storefront() -> Result<Storefront> {
    let app = TestApp::new();
    let admin = app.admin_token().await?;
    let category = app.create_category(&admin, "Apparel", None, 0).await?;
    let (_, owner) = app.register("merchant@example.com").await?;
    let shop = app.create_shop(&owner, "Threads").await?;
    Ok(Storefront { app, owner, shop, category })
}

#[tokio::test]
async fn checkout_prices_the_order_and_reserves_stock() -> Result<()> {
    let s = storefront().await?;
    let product = s.app.create_product(&s.owner, s.shop, s.category, "Tee", "20.00", 10).await?;

    let res = s.app.post("/orders", order_body(s.shop, &[(product, 3)]), None).await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["message"], "Order created successfully");

    let order = res.data();
    assert_eq!(money(&order["subtotal"])?, Decimal::from(60));
    assert_eq!(money(&order["tax"])?, Decimal::from(6));
    assert_eq!(money(&order["shipping"])?, Decimal::from(10));
    assert_eq!(money(&order["total"])?, Decimal::from(76));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert!(order["orderNumber"].as_str().unwrap_or_default().starts_with("ORD-"));
    assert_eq!(order["shopInfo"]["shopName"], "Threads");
    assert_eq!(s.app.stock_of(product).await?, 7);

    let fetched = s.app.get(&format!("/orders/{}", res.id()?), None).await?;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.data()["orderNumber"], order["orderNumber"]);
    Ok(())
}

#[tokio::test]
async fn insufficient_stock_rejects_the_whole_order() -> Result<()> {
    let s = storefront().await?;
    let plenty = s.app.create_product(&s.owner, s.shop, s.category, "Socks", "5.00", 50).await?;
    let scarce = s.app.create_product(&s.owner, s.shop, s.category, "Coat", "120.00", 2).await?;

    let res = s
        .app
        .post("/orders", order_body(s.shop, &[(plenty, 4), (scarce, 3)]), None)
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "INSUFFICIENT_STOCK");

    assert_eq!(s.app.stock_of(plenty).await?, 50);
    assert_eq!(s.app.stock_of(scarce).await?, 2);
    Ok(())
}

#[tokio::test]
async fn invalid_checkout_reports_field_errors() -> Result<()> {
    let s = storefront().await?;
    let product = s.app.create_product(&s.owner, s.shop, s.category, "Cap", "12.00", 5).await?;

    let mut body = order_body(s.shop, &[(product, 1)]);
    body["customer"]["address"]["city"] = json!("");
    body["customer"]["email"] = json!("not-an-email");

    let res = s.app.post("/orders", body, None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert_eq!(res.body["field_errors"]["customer.address.city"], "City is required");
    assert_eq!(res.body["field_errors"]["customer.email"], "Invalid email format");

    let empty = s.app.post("/orders", order_body(s.shop, &[]), None).await?;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(s.app.stock_of(product).await?, 5);
    Ok(())
}

#[tokio::test]
async fn shop_owner_moves_orders_through_their_lifecycle() -> Result<()> {
    let s = storefront().await?;
    let product = s.app.create_product(&s.owner, s.shop, s.category, "Scarf", "30.00", 5).await?;
    let order = s.app.post("/orders", order_body(s.shop, &[(product, 1)]), None).await?.id()?;
    let path = format!("/api/orders/{}/status", order);

    let skip = s.app.put(&path, json!({ "status": "shipped" }), Some(&s.owner)).await?;
    assert_eq!(skip.status, StatusCode::CONFLICT);
    assert_eq!(skip.body["message"], "Cannot change order status from pending to shipped");

    for status in ["confirmed", "processing", "shipped"] {
        let res = s.app.put(&path, json!({ "status": status }), Some(&s.owner)).await?;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        assert_eq!(res.data()["status"], status);
    }
    let shipped = s.app.get(&format!("/orders/{}", order), None).await?;
    assert!(shipped.data()["shippedAt"].is_string());

    let (_, stranger) = s.app.register("stranger@example.com").await?;
    let res = s.app.put(&path, json!({ "status": "delivered" }), Some(&stranger)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let paid = s
        .app
        .put(
            &format!("/api/orders/{}/payment", order),
            json!({ "paymentStatus": "paid", "paymentId": "txn_1" }),
            Some(&s.owner),
        )
        .await?;
    assert_eq!(paid.status, StatusCode::OK);
    assert_eq!(paid.data()["paymentStatus"], "paid");
    Ok(())
}

#[tokio::test]
async fn owner_sees_orders_analytics_and_notifications() -> Result<()> {
    let s = storefront().await?;
    let product = s.app.create_product(&s.owner, s.shop, s.category, "Belt", "20.00", 8).await?;
    s.app.post("/orders", order_body(s.shop, &[(product, 3)]), None).await?;
    s.app.post("/orders", order_body(s.shop, &[(product, 1)]), None).await?;

    let orders = s.app.get(&format!("/api/orders/shop/{}", s.shop), Some(&s.owner)).await?;
    assert_eq!(orders.status, StatusCode::OK);
    assert_eq!(orders.data()["pagination"]["total"], 2);

    let analytics = s
        .app
        .get(&format!("/api/orders/shop/{}/analytics?period=7d", s.shop), Some(&s.owner))
        .await?;
    assert_eq!(analytics.status, StatusCode::OK, "{}", analytics.body);
    assert_eq!(analytics.data()["period"], "7d");
    assert_eq!(analytics.data()["analytics"]["totalOrders"], 2);
    // 76 + (20 + 2 + 10)
    assert_eq!(money(&analytics.data()["analytics"]["totalRevenue"])?, Decimal::from(108));

    let bad_period = s
        .app
        .get(&format!("/api/orders/shop/{}/analytics?period=2w", s.shop), Some(&s.owner))
        .await?;
    assert_eq!(bad_period.status, StatusCode::BAD_REQUEST);

    // 8 - 3 - 1 leaves 4, under the default threshold of 5
    let notes = s.app.get("/api/notifications", Some(&s.owner)).await?;
    assert_eq!(notes.status, StatusCode::OK);
    let kinds: Vec<_> = notes.data()["items"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|n| n["type"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(kinds.iter().filter(|k| *k == "order_placed").count(), 2);
    assert!(kinds.iter().any(|k| k == "low_stock"));

    let read_all = s.app.put("/api/notifications/read-all", json!({}), Some(&s.owner)).await?;
    assert_eq!(read_all.status, StatusCode::OK);
    let unread = s.app.get("/api/notifications?unreadOnly=true", Some(&s.owner)).await?;
    assert_eq!(unread.data()["unreadCount"], 0);
    Ok(())
}
