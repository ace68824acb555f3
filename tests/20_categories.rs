mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn tree_nests_children_in_sort_order() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin_token().await?;

    let clothing = app.create_category(&admin, "Clothing", None, 1).await?;
    app.create_category(&admin, "Shoes", None, 0).await?;
    app.create_category(&admin, "Shirts", Some(clothing), 2).await?;
    app.create_category(&admin, "Jackets", Some(clothing), 1).await?;

    let res = app.get("/categories/tree", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    let roots = res.data().as_array().cloned().unwrap_or_default();
    let names: Vec<_> = roots.iter().map(|r| r["name"].as_str().unwrap_or_default()).collect();
    assert_eq!(names, vec!["Shoes", "Clothing"]);

    let children: Vec<_> = roots[1]["children"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|c| c["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(children, vec!["Jackets", "Shirts"]);
    Ok(())
}

#[tokio::test]
async fn category_listing_includes_descendant_products() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin_token().await?;
    let (_, owner) = app.register("owner@example.com").await?;
    let shop = app.create_shop(&owner, "Corner Store").await?;

    let root = app.create_category(&admin, "Electronics", None, 0).await?;
    let child = app.create_category(&admin, "Phones", Some(root), 0).await?;
    let grandchild = app.create_category(&admin, "Cases", Some(child), 0).await?;
    let other = app.create_category(&admin, "Garden", None, 0).await?;

    app.create_product(&owner, shop, root, "Radio", "15.00", 3).await?;
    app.create_product(&owner, shop, grandchild, "Leather Case", "9.50", 10).await?;
    app.create_product(&owner, shop, other, "Rake", "20.00", 2).await?;

    let res = app.get(&format!("/categories/{}/products", root), None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["category"]["name"], "Electronics");
    let mut names: Vec<_> = res.data()["products"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|p| p["name"].as_str().unwrap_or_default().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Leather Case", "Radio"]);
    assert_eq!(res.data()["pagination"]["total"], 2);

    let details = app.get(&format!("/categories/{}", child), None).await?;
    assert_eq!(details.data()["children"][0]["name"], "Cases");
    Ok(())
}

#[tokio::test]
async fn delete_refuses_categories_in_use() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin_token().await?;
    let parent = app.create_category(&admin, "Home", None, 0).await?;
    let child = app.create_category(&admin, "Kitchen", Some(parent), 0).await?;

    let res = app.delete(&format!("/api/categories/{}", parent), Some(&admin)).await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["message"], "Cannot delete category with subcategories");

    let res = app.delete(&format!("/api/categories/{}", child), Some(&admin)).await?;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.delete(&format!("/api/categories/{}", parent), Some(&admin)).await?;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get(&format!("/categories/{}", parent), None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn delete_refuses_categories_with_active_products() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin_token().await?;
    let (_, owner) = app.register("potter@example.com").await?;
    let shop = app.create_shop(&owner, "Clay Works").await?;
    let leaf = app.create_category(&admin, "Ceramics", None, 0).await?;
    let product = app.create_product(&owner, shop, leaf, "Mug", "12.00", 6).await?;

    let res = app.delete(&format!("/api/categories/{}", leaf), Some(&admin)).await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["message"], "Cannot delete category with products");
    let still_there = app.get(&format!("/categories/{}", leaf), None).await?;
    assert_eq!(still_there.status, StatusCode::OK);
    assert_eq!(still_there.data()["isActive"], true);

    let res = app.delete(&format!("/api/products/{}", product), Some(&owner)).await?;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.delete(&format!("/api/categories/{}", leaf), Some(&admin)).await?;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn reparenting_under_a_descendant_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin_token().await?;
    let a = app.create_category(&admin, "A", None, 0).await?;
    let b = app.create_category(&admin, "B", Some(a), 0).await?;

    let res = app
        .put(&format!("/api/categories/{}", a), json!({ "parent": b }), Some(&admin))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn only_admins_manage_categories() -> Result<()> {
    let app = TestApp::new();
    let (_, user) = app.register("shopper@example.com").await?;

    let res = app
        .post("/api/categories", json!({ "name": "Toys" }), Some(&user))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.post("/api/categories", json!({ "name": "Toys" }), None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
