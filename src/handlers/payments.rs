use super::common::{created, ok, LimitParams};
use crate::{
    auth::AuthUser,
    entities::{mobile_money_order::GatewayStatus, security_alert::AlertStatus},
    errors::ServiceError,
    handlers::AppState,
    services::{
        mobile_money::CreateMobileMoneyOrderInput,
        payment_monitor::UpdateAlertStatusInput,
        payments::{PerformanceQuery, RecordMetricInput, RecordPaymentInput, UpdatePaymentStatusInput},
    },
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

const DEFAULT_PERFORMANCE_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AlertListQuery {
    pub status: Option<AlertStatus>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MobileMoneyListQuery {
    pub status: Option<GatewayStatus>,
    pub limit: Option<u64>,
}

/// Record a customer payment
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = RecordPaymentInput,
    responses(
        (status = 201, description = "Payment recorded"),
        (status = 400, description = "Invalid amount", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<RecordPaymentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment = state
        .services
        .payments
        .record_payment(input, &user.user_id)
        .await?;
    Ok(created(payment))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}/payments",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses((status = 200, description = "Payments, newest first")),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_customer_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.payments.list_customer_payments(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/payments/{id}/status",
    params(("id" = Uuid, Path, description = "Payment id")),
    request_body = UpdatePaymentStatusInput,
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Status change not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePaymentStatusInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .payments
        .update_payment_status(id, input.status)
        .await?))
}

/// Push a mobile money collection request to the customer's handset
#[utoipa::path(
    post,
    path = "/api/v1/payments/mobile-money",
    request_body = CreateMobileMoneyOrderInput,
    responses(
        (status = 201, description = "Order created, awaiting customer confirmation"),
        (status = 502, description = "Gateway rejected the request", body = crate::errors::ErrorResponse),
        (status = 503, description = "Gateway not configured", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Mobile Money"
)]
pub async fn create_mobile_money_order(
    State(state): State<AppState>,
    Json(input): Json<CreateMobileMoneyOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created(state.services.mobile_money.create_order(input).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/mobile-money",
    params(MobileMoneyListQuery),
    responses((status = 200, description = "Mobile money orders")),
    security(("bearer_auth" = [])),
    tag = "Mobile Money"
)]
pub async fn list_mobile_money_orders(
    State(state): State<AppState>,
    Query(query): Query<MobileMoneyListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = LimitParams { limit: query.limit }.limit_or(50);
    Ok(ok(state
        .services
        .mobile_money
        .list_orders(query.status, limit)
        .await?))
}

/// Poll the gateway and apply the latest status
#[utoipa::path(
    get,
    path = "/api/v1/payments/mobile-money/{order_id}/status",
    params(("order_id" = String, Path, description = "Gateway order id")),
    responses(
        (status = 200, description = "Current order status", body = crate::services::mobile_money::StatusUpdate),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Mobile Money"
)]
pub async fn check_mobile_money_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .mobile_money
        .check_status(&order_id)
        .await?))
}

/// Gateway success rate and latency per operation
#[utoipa::path(
    get,
    path = "/api/v1/payments/performance",
    params(
        ("provider" = Option<String>, Query, description = "Only this provider"),
        ("hours" = Option<i64>, Query, description = "Look-back window, default 24")
    ),
    responses((status = 200, description = "Performance summary", body = [crate::services::payments::PerformanceSummary])),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn performance(
    State(state): State<AppState>,
    Query(query): Query<PerformanceQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state
        .services
        .payments
        .performance_summary(
            query.provider,
            query.hours.unwrap_or(DEFAULT_PERFORMANCE_WINDOW_HOURS),
        )
        .await?;
    Ok(ok(summary))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/performance",
    request_body = RecordMetricInput,
    responses((status = 201, description = "Metric stored")),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn record_metric(
    State(state): State<AppState>,
    Json(input): Json<RecordMetricInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created(state.services.payments.record_metric(input).await?))
}

/// Run the anomaly scan over recent payments
#[utoipa::path(
    post,
    path = "/api/v1/payments/security/scan",
    responses((status = 200, description = "Alerts raised by this scan")),
    security(("bearer_auth" = [])),
    tag = "Payment Security"
)]
pub async fn scan(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.payment_monitor.scan().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/security/alerts",
    params(AlertListQuery),
    responses((status = 200, description = "Security alerts, newest first")),
    security(("bearer_auth" = [])),
    tag = "Payment Security"
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .payment_monitor
        .list_alerts(query.status)
        .await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/payments/security/alerts/{id}",
    params(("id" = Uuid, Path, description = "Alert id")),
    request_body = UpdateAlertStatusInput,
    responses(
        (status = 200, description = "Alert updated"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payment Security"
)]
pub async fn update_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateAlertStatusInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .payment_monitor
        .update_alert_status(id, input.status)
        .await?))
}
