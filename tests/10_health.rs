mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{ensure_server, TestApp};

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let app = TestApp::new();
    let res = app.get("/", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.data()["name"], "Storefront API");
    assert!(res.data()["endpoints"]["orders"].is_string());
    Ok(())
}

#[tokio::test]
async fn health_reports_the_store() -> Result<()> {
    let app = TestApp::new();
    let res = app.get("/health", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["status"], "ok");
    assert_eq!(res.data()["store"], "memory");
    Ok(())
}

#[tokio::test]
async fn unknown_id_is_not_found() -> Result<()> {
    let app = TestApp::new();
    let res = app.get(&format!("/products/{}", uuid::Uuid::new_v4()), None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn malformed_id_is_a_bad_request() -> Result<()> {
    let app = TestApp::new();
    let res = app.get("/categories/not-a-uuid", None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn server_binary_answers_health() -> Result<()> {
    let server = ensure_server().await?;
    let resp = reqwest::get(format!("{}/health", server.base_url)).await?;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn page_far_past_the_end_is_empty() -> Result<()> {
    let app = TestApp::new();
    let res = app.get("/products?page=9223372036854775807&limit=10", None).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(res.data()["pagination"]["hasNext"], false);
    Ok(())
}
