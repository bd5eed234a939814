//! LATS API Library
//!
//! Back office for a phone and electronics repair shop: customers and
//! loyalty, point of sale, procurement, the repair workflow, payments
//! and shop finance.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tower_http::timeout::TimeoutLayer;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::roles;
use crate::auth::{AuthRouterExt, AuthService};

/// Requests still running after this are answered with 408.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Builds every service from the shared pool and event channel.
    pub fn new(
        db: Arc<db::DbPool>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
    ) -> Result<Self, errors::ServiceError> {
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), &config)?;
        Ok(Self {
            db,
            config,
            event_sender,
            services,
        })
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[tokio::test]
    async fn validation_errors_response_includes_metadata() {
        let response = crate::tracing::scope_request_id(
            crate::tracing::RequestId::new("meta-validation"),
            async { ApiResponse::<()>::validation_errors(vec!["missing".into()]) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-validation"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn success_response_omits_errors() {
        let value = serde_json::to_value(ApiResponse::success(json!({"id": 1}))).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["id"], 1);
        assert!(value["errors"].is_null());
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{
        customers, diagnostics, finance, inventory, notifications, payment_webhooks, payments,
        purchase_orders, repairs, sales, settings,
    };

    // Customers & loyalty
    let customers_read = Router::new()
        .route("/customers", get(customers::list_customers))
        .route("/customers/:id", get(customers::get_customer))
        .route("/customers/:id/points", get(customers::points_history))
        .route("/loyalty/metrics", get(customers::loyalty_metrics))
        .route("/loyalty/rewards", get(customers::list_rewards))
        .with_permission(perm::CUSTOMERS_READ);

    let customers_write = Router::new()
        .route("/customers", post(customers::create_customer))
        .route("/customers/:id", put(customers::update_customer))
        .route("/customers/:id/points", post(customers::adjust_points))
        .route("/customers/:id/redeem", post(customers::redeem_reward))
        .with_permission(perm::CUSTOMERS_WRITE);

    // Inventory
    let inventory_read = Router::new()
        .route("/products", get(inventory::list_products))
        .route("/products/:id", get(inventory::get_product))
        .route("/products/:id/serials", get(inventory::list_serials))
        .route(
            "/inventory/variants/:id/movements",
            get(inventory::list_movements),
        )
        .route("/inventory/low-stock", get(inventory::low_stock))
        .with_permission(perm::INVENTORY_READ);

    let inventory_adjust = Router::new()
        .route("/products", post(inventory::create_product))
        .route("/inventory/variants/:id/adjust", post(inventory::adjust_stock))
        .with_permission(perm::INVENTORY_ADJUST);

    // Point of sale
    let sales_create = Router::new()
        .route("/sales", post(sales::process_sale))
        .with_permission(perm::SALES_CREATE);

    let sales_read = Router::new()
        .route("/sales/recent", get(sales::recent_sales))
        .route("/sales/:id", get(sales::get_sale))
        .route("/sales/:id/receipt", get(sales::get_receipt))
        .with_permission(perm::SALES_READ);

    // Procurement
    let suppliers = Router::new()
        .route(
            "/suppliers",
            post(purchase_orders::create_supplier).get(purchase_orders::list_suppliers),
        )
        .with_permission(perm::PURCHASE_ORDERS_MANAGE);
    let purchase_orders =
        purchase_orders::purchase_order_routes().with_permission(perm::PURCHASE_ORDERS_MANAGE);

    // Repairs
    let repairs_read = Router::new()
        .route("/devices", get(repairs::list_devices))
        .route("/devices/:id", get(repairs::get_device))
        .route("/devices/:id/transitions", get(repairs::available_transitions))
        .route("/devices/:id/history", get(repairs::transition_history))
        .route("/devices/:id/parts", get(repairs::list_repair_parts))
        .route("/spare-parts", get(repairs::list_spare_parts))
        .with_permission(perm::REPAIRS_READ);

    let repairs_update = Router::new()
        .route("/devices", post(repairs::register_device))
        .route("/devices/:id/status", put(repairs::update_device_status))
        .route("/devices/:id/parts", post(repairs::request_part))
        .route("/repair-parts/:id/status", put(repairs::update_part_status))
        .route("/repair-parts/:id/use", post(repairs::use_part))
        .route("/spare-parts", post(repairs::create_spare_part))
        .with_permission(perm::REPAIRS_UPDATE);

    // Diagnostics
    let diagnostics_read = Router::new()
        .route("/diagnostics", get(diagnostics::list_requests))
        .route("/diagnostics/stats", get(diagnostics::stats))
        .route("/diagnostics/:id", get(diagnostics::get_request))
        .route("/diagnostic-devices/:id", get(diagnostics::get_device))
        .route("/diagnostic-templates", get(diagnostics::list_templates))
        .route("/diagnostic-templates/match", get(diagnostics::match_template))
        .with_permission(perm::REPAIRS_READ);

    let diagnostics_update = Router::new()
        .route("/diagnostics", post(diagnostics::create_request))
        .route("/diagnostics/:id", put(diagnostics::update_request))
        .route("/diagnostic-devices/:id/checks", post(diagnostics::record_check))
        .route("/diagnostic-checks/:id", put(diagnostics::update_check))
        .route("/diagnostic-devices/:id/complete", post(diagnostics::complete_action))
        .with_permission(perm::REPAIRS_UPDATE);

    let diagnostics_admin = Router::new()
        .route("/diagnostic-devices/:id/feedback", post(diagnostics::submit_feedback))
        .route("/diagnostic-templates", post(diagnostics::create_template))
        .route(
            "/diagnostic-templates/:id",
            put(diagnostics::update_template).delete(diagnostics::delete_template),
        )
        .with_role(roles::ADMIN);

    // Payments
    let payments_read = Router::new()
        .route(
            "/customers/:id/payments",
            get(payments::list_customer_payments),
        )
        .route(
            "/payments/mobile-money",
            get(payments::list_mobile_money_orders),
        )
        .route(
            "/payments/mobile-money/:order_id/status",
            get(payments::check_mobile_money_status),
        )
        .route("/payments/performance", get(payments::performance))
        .route("/payments/security/alerts", get(payments::list_alerts))
        .with_permission(perm::PAYMENTS_READ);

    let payments_manage = Router::new()
        .route("/payments", post(payments::record_payment))
        .route("/payments/:id/status", put(payments::update_payment_status))
        .route(
            "/payments/mobile-money",
            post(payments::create_mobile_money_order),
        )
        .route("/payments/performance", post(payments::record_metric))
        .route("/payments/security/scan", post(payments::scan))
        .route("/payments/security/alerts/:id", put(payments::update_alert))
        .with_permission(perm::PAYMENTS_MANAGE);

    // Authenticated by the gateway's api key header instead of a bearer token
    let payment_webhook = Router::new().route(
        "/payments/mobile-money/webhook",
        post(payment_webhooks::mobile_money_webhook),
    );

    // Finance
    let finance = Router::new()
        .route(
            "/finance/accounts",
            post(finance::create_account).get(finance::list_accounts),
        )
        .route("/finance/accounts/:id", get(finance::get_account))
        .route(
            "/finance/expenses",
            post(finance::record_expense).get(finance::list_expenses),
        )
        .route(
            "/finance/transfers",
            post(finance::transfer).get(finance::list_transfers),
        )
        .route("/finance/summary", get(finance::summary))
        .with_permission(perm::FINANCE_MANAGE);

    // Notifications
    let notifications = Router::new()
        .route("/notifications/sms", post(notifications::send_sms))
        .route("/notifications/sms/bulk", post(notifications::send_bulk_sms))
        .route("/notifications/sms/logs", get(notifications::sms_logs))
        .route("/notifications/sms/stats", get(notifications::sms_stats))
        .route("/notifications/whatsapp", post(notifications::send_whatsapp))
        .with_permission(perm::NOTIFICATIONS_SEND);

    // Runtime settings
    let settings = Router::new()
        .route("/settings", get(settings::list_settings))
        .route(
            "/settings/:key",
            get(settings::get_setting)
                .put(settings::put_setting)
                .delete(settings::delete_setting),
        )
        .with_permission(perm::SETTINGS_MANAGE);

    Router::new()
        .route("/status", get(api_status))
        .merge(customers_read)
        .merge(customers_write)
        .merge(inventory_read)
        .merge(inventory_adjust)
        .merge(sales_create)
        .merge(sales_read)
        .merge(suppliers)
        .nest("/purchase-orders", purchase_orders)
        .merge(repairs_read)
        .merge(repairs_update)
        .merge(diagnostics_read)
        .merge(diagnostics_update)
        .merge(diagnostics_admin)
        .merge(payments_read)
        .merge(payments_manage)
        .merge(payment_webhook)
        .merge(finance)
        .merge(notifications)
        .merge(settings)
}

/// Full application router: API, health, metrics and docs.
///
/// CORS and compression are added by the binary since they depend on
/// deployment configuration.
pub fn app_router(state: AppState, auth_service: Arc<AuthService>) -> Router {
    let health = health::health_routes(state.db.clone());

    Router::<AppState>::new()
        .route("/", get(|| async { "lats-api up" }))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .with_state(state)
        .nest("/health", health)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(crate::tracing::configure_http_tracing())
        // Auth middleware looks the service up in request extensions
        .layer(Extension(auth_service))
        .layer(axum::middleware::from_fn(
            crate::tracing::request_id_middleware,
        ))
}

async fn api_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let database = match state.db.ping().await {
        Ok(_) => "up",
        Err(_) => "down",
    };
    let status_data = json!({
        "status": "ok",
        "service": "lats-api",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "environment": state.config.environment,
        "database": database,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

pub mod prelude {
    pub use crate::auth::{AuthService, AuthUser};
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::{ApiResponse, AppState, PaginatedResponse};
}
