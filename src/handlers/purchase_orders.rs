use super::common::{created, ok, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::purchase_order::PurchaseOrderStatus,
    errors::ServiceError,
    handlers::AppState,
    services::purchase_orders::{
        AddMessageInput, AddPurchaseOrderPaymentInput, AddQualityCheckInput,
        CreatePurchaseOrderInput, CreateSupplierInput, ReceivePurchaseOrderInput,
        UpdatePurchaseOrderStatusInput,
    },
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PurchaseOrderListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<PurchaseOrderStatus>,
}

/// Register a supplier
#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    request_body = CreateSupplierInput,
    responses((status = 201, description = "Supplier created")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<CreateSupplierInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created(
        state.services.purchase_orders.create_supplier(input).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    responses((status = 200, description = "Suppliers")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn list_suppliers(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.purchase_orders.list_suppliers().await?))
}

/// Create a draft purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderInput,
    responses(
        (status = 201, description = "Purchase order created"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .purchase_orders
        .create_purchase_order(input, &user.user_id)
        .await?;
    Ok(created(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    params(PurchaseOrderListQuery),
    responses((status = 200, description = "Purchase orders page")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(query): Query<PurchaseOrderListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let pagination = PaginationParams {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(20),
    };
    let (orders, total) = state
        .services
        .purchase_orders
        .list_purchase_orders(query.status, pagination.page(), pagination.limit())
        .await?;
    Ok(ok(pagination.into_response(orders, total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order with items"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.purchase_orders.get_purchase_order(id).await?))
}

/// Move a purchase order through its lifecycle
#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{id}/status",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = UpdatePurchaseOrderStatusInput,
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseOrderStatusInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .purchase_orders
        .update_status(id, input.status, &user.user_id)
        .await?;
    Ok(ok(order))
}

/// Receive goods, optionally with serial numbers
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receive",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = ReceivePurchaseOrderInput,
    responses(
        (status = 200, description = "Goods received"),
        (status = 400, description = "Invalid receipt", body = crate::errors::ErrorResponse),
        (status = 409, description = "Serial number already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn receive(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ReceivePurchaseOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .services
        .purchase_orders
        .receive(id, input, &user.user_id)
        .await?;
    Ok(ok(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = AddPurchaseOrderPaymentInput,
    responses((status = 201, description = "Supplier payment recorded")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn add_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<AddPurchaseOrderPaymentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment = state
        .services
        .purchase_orders
        .add_payment(id, input, &user.user_id)
        .await?;
    Ok(created(payment))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses((status = 200, description = "Supplier payments")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.purchase_orders.list_payments(id).await?))
}

/// Paid and outstanding totals
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/payments/summary",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses((status = 200, description = "Payment summary")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn payment_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.purchase_orders.payment_summary(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/audit",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses((status = 200, description = "Audit trail")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn audit_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.purchase_orders.audit_log(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/messages",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = AddMessageInput,
    responses((status = 201, description = "Message added")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn add_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<AddMessageInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let message = state
        .services
        .purchase_orders
        .add_message(id, input, &user.user_id)
        .await?;
    Ok(created(message))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/messages",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses((status = 200, description = "Messages")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.purchase_orders.list_messages(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/quality-checks",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = AddQualityCheckInput,
    responses((status = 201, description = "Quality check recorded")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn add_quality_check(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<AddQualityCheckInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let check = state
        .services
        .purchase_orders
        .add_quality_check(id, input, &user.user_id)
        .await?;
    Ok(created(check))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/quality-checks",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses((status = 200, description = "Quality checks")),
    security(("bearer_auth" = [])),
    tag = "Purchase Orders"
)]
pub async fn list_quality_checks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .purchase_orders
        .list_quality_checks(id)
        .await?))
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order).get(list_purchase_orders))
        .route("/:id", get(get_purchase_order))
        .route("/:id/status", put(update_status))
        .route("/:id/receive", post(receive))
        .route("/:id/payments", post(add_payment).get(list_payments))
        .route("/:id/payments/summary", get(payment_summary))
        .route("/:id/audit", get(audit_log))
        .route("/:id/messages", post(add_message).get(list_messages))
        .route(
            "/:id/quality-checks",
            post(add_quality_check).get(list_quality_checks),
        )
}
