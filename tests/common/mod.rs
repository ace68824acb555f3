#![allow(dead_code)]

use std::str::FromStr;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::database::models::Role;
use storefront_api::database::{DocumentStore, MemoryStore};
use storefront_api::routes;
use storefront_api::services::auth_service::Registration;
use storefront_api::services::AuthService;
use storefront_api::state::AppState;

/// The full router over a fresh in-memory store
pub struct TestApp {
    pub store: Arc<dyn DocumentStore>,
    router: Router,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl Response {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn id(&self) -> Result<Uuid> {
        let raw = self.body["data"]["id"]
            .as_str()
            .with_context(|| format!("response has no data.id: {}", self.body))?;
        Ok(Uuid::parse_str(raw)?)
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let router = routes::app(AppState::new(store.clone()));
        Self { store, router }
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<Value>, token: Option<&str>) -> Result<Response> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes) }))
        };
        Ok(Response { status, body })
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<Response> {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post(&self, path: &str, body: Value, token: Option<&str>) -> Result<Response> {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub async fn put(&self, path: &str, body: Value, token: Option<&str>) -> Result<Response> {
        self.request(Method::PUT, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<Response> {
        self.request(Method::DELETE, path, None, token).await
    }

    /// Registers a regular user and returns `(id, token)`
    pub async fn register(&self, email: &str) -> Result<(Uuid, String)> {
        let res = self
            .post(
                "/auth/register",
                json!({
                    "fullName": "Test User",
                    "email": email,
                    "password": "secret123",
                    "phone": "5551234567",
                }),
                None,
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "register failed: {}", res.body);
        let id = Uuid::parse_str(res.data()["user"]["id"].as_str().context("missing user id")?)?;
        let token = res.data()["token"].as_str().context("missing token")?.to_string();
        Ok((id, token))
    }

    /// Creates an account with `role` directly in the store and signs in
    pub async fn login_as(&self, email: &str, role: Role) -> Result<String> {
        AuthService::new(self.store.clone())
            .create_user(
                Registration {
                    full_name: "Staff".to_string(),
                    email: email.to_string(),
                    password: "secret123".to_string(),
                    phone: "5550000000".to_string(),
                },
                role,
            )
            .await?;
        let res = self
            .post("/auth/login", json!({ "email": email, "password": "secret123" }), None)
            .await?;
        anyhow::ensure!(res.status == StatusCode::OK, "login failed: {}", res.body);
        Ok(res.data()["token"].as_str().context("missing token")?.to_string())
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.login_as(&format!("admin-{}@example.com", Uuid::new_v4()), Role::Admin).await
    }

    /// Shop registration updates the owner's account; the owner's existing token keeps working
    pub async fn create_shop(&self, token: &str, name: &str) -> Result<Uuid> {
        let res = self
            .post(
                "/api/shops",
                json!({ "shopName": name, "theme": "light", "email": "shop@example.com" }),
                Some(token),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "shop creation failed: {}", res.body);
        res.id()
    }

    pub async fn create_category(&self, admin_token: &str, name: &str, parent: Option<Uuid>, sort_order: i32) -> Result<Uuid> {
        let res = self
            .post(
                "/api/categories",
                json!({ "name": name, "parent": parent, "sortOrder": sort_order }),
                Some(admin_token),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "category creation failed: {}", res.body);
        res.id()
    }

    pub async fn create_product(
        &self,
        token: &str,
        shop: Uuid,
        category: Uuid,
        name: &str,
        price: &str,
        stock: i64,
    ) -> Result<Uuid> {
        let res = self
            .post(
                "/api/products",
                json!({
                    "name": name,
                    "color": "black",
                    "category": category,
                    "price": price,
                    "stock": stock,
                    "shop": shop,
                }),
                Some(token),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "product creation failed: {}", res.body);
        res.id()
    }

    pub async fn stock_of(&self, product: Uuid) -> Result<i64> {
        let res = self.get(&format!("/products/{}", product), None).await?;
        res.data()["stock"].as_i64().context("missing stock")
    }
}

/// Decimal amounts serialize as strings; compare them numerically
pub fn money(value: &Value) -> Result<Decimal> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => anyhow::bail!("not a money value: {}", other),
    };
    Ok(Decimal::from_str(&raw)?)
}

pub fn order_body(shop: Uuid, items: &[(Uuid, u32)]) -> Value {
    json!({
        "customer": {
            "name": "Ada Customer",
            "email": "ada@example.com",
            "address": {
                "street": "1 Main St",
                "city": "Springfield",
                "state": "IL",
                "zipCode": "62701",
                "country": "US"
            }
        },
        "shop": shop,
        "items": items.iter().map(|(product, quantity)| json!({ "product": product, "quantity": quantity })).collect::<Vec<_>>(),
        "paymentMethod": "credit_card",
    })
}

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// The compiled server binary running on a free port with the memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_storefront-api"))
            .env("PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("STORE_BACKEND", "memory")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
