use super::common::{created, ok, LimitParams};
use crate::{
    auth::AuthUser, errors::ServiceError, handlers::AppState, services::sales::ProcessSaleInput,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

/// Ring up a point-of-sale transaction
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = ProcessSaleInput,
    responses(
        (status = 201, description = "Sale completed with receipt"),
        (status = 400, description = "Invalid sale", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sales"
)]
pub async fn process_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ProcessSaleInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state
        .services
        .sales
        .process_sale(input, &user.user_id)
        .await?;
    Ok(created(sale))
}

/// Most recent sales
#[utoipa::path(
    get,
    path = "/api/v1/sales/recent",
    params(LimitParams),
    responses((status = 200, description = "Recent sales")),
    security(("bearer_auth" = [])),
    tag = "Sales"
)]
pub async fn recent_sales(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .sales
        .recent_sales(params.limit_or(20))
        .await?))
}

/// Sale with its line items and receipt
#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "Sale details"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.sales.get_sale(id).await?))
}

/// Receipt issued for a sale
#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}/receipt",
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "Receipt"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sales"
)]
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.sales.get_receipt(id).await?))
}
