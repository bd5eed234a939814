#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use lats_api::{
    auth::{permissions_for_role, roles, AuthConfig, AuthService},
    config::AppConfig,
    db,
    events::{self, EventSender},
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const ADMIN_ID: &str = "admin-1";

/// Application harness backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust configuration.
    pub async fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir");
        let db_path = db_dir.path().join("lats_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // SQLite serializes writers; a single connection keeps transactions honest
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        configure(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let event_sender = Arc::new(EventSender::new(event_tx));

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let state =
            AppState::new(db_arc, cfg, event_sender).expect("failed to build app state");
        let router = lats_api::app_router(state.clone(), auth_service.clone());

        Self {
            router,
            state,
            auth_service,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Token for `user_id` holding `role` and that role's default permissions.
    pub fn token_for(&self, role: &str, user_id: &str) -> String {
        self.auth_service
            .issue_token(
                user_id,
                None,
                vec![role.to_string()],
                permissions_for_role(role),
            )
            .expect("issue test token")
    }

    pub fn admin_token(&self) -> String {
        self.token_for(roles::ADMIN, ADMIN_ID)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends as admin and returns the status with the decoded body.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = self.admin_token();
        let response = self.request(method, uri, body, Some(&token)).await;
        split(response).await
    }

    /// Sends as admin, asserts the status, and returns the `data` payload.
    pub async fn expect_data(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Value {
        let (status, body) = self.send(method, uri, body).await;
        assert_eq!(status, expected, "unexpected status for {}: {}", uri, body);
        body["data"].clone()
    }

    pub async fn create_customer(&self, name: &str, phone: &str) -> Value {
        self.expect_data(
            Method::POST,
            "/api/v1/customers",
            Some(json!({ "name": name, "phone": phone })),
            StatusCode::CREATED,
        )
        .await
    }

    /// Product with one variant; returns `(product, variant)`.
    pub async fn create_product(
        &self,
        sku: &str,
        price: &str,
        quantity: i32,
        min_quantity: i32,
    ) -> (Value, Value) {
        let product = self
            .expect_data(
                Method::POST,
                "/api/v1/products",
                Some(json!({
                    "name": format!("Product {}", sku),
                    "sku": sku,
                    "variants": [{
                        "name": "Default",
                        "sku": format!("{}-V1", sku),
                        "price": price,
                        "cost_price": "1000",
                        "quantity": quantity,
                        "min_quantity": min_quantity
                    }]
                })),
                StatusCode::CREATED,
            )
            .await;
        let variant = product["variants"][0].clone();
        (product, variant)
    }

    pub async fn set_setting(&self, key: &str, value: &str) {
        self.expect_data(
            Method::PUT,
            &format!("/api/v1/settings/{}", key),
            Some(json!({ "value": value })),
            StatusCode::OK,
        )
        .await;
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn split(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

/// Decimal fields serialize as strings; compare them numerically.
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {}", other),
    }
}
