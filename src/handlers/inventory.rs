use super::common::{created, ok, LimitParams};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::inventory::{AdjustStockInput, CreateProductInput},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches name, SKU or barcode
    pub search: Option<String>,
}

/// Create a product with its variants
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.inventory.create_product(input).await?;
    Ok(created(product))
}

/// List products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListQuery),
    responses((status = 200, description = "Products page")),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let pagination = super::common::PaginationParams {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(20),
    };
    let (products, total) = state
        .services
        .inventory
        .list_products(query.search, pagination.page(), pagination.limit())
        .await?;
    Ok(ok(pagination.into_response(products, total)))
}

/// Fetch a product and its variants
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product with variants"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.inventory.get_product(id).await?))
}

/// Serialized units received against a product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/serials",
    params(("id" = Uuid, Path, description = "Product id")),
    responses((status = 200, description = "Serialized inventory items")),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_serials(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.inventory.list_serials(id).await?))
}

/// Record a stock movement for a variant
#[utoipa::path(
    post,
    path = "/api/v1/inventory/variants/{id}/adjust",
    params(("id" = Uuid, Path, description = "Variant id")),
    request_body = AdjustStockInput,
    responses(
        (status = 200, description = "Movement recorded"),
        (status = 404, description = "Variant not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<AdjustStockInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let movement = state
        .services
        .inventory
        .adjust_stock(id, input, &user.user_id)
        .await?;
    Ok(ok(movement))
}

/// Movement history for a variant, newest first
#[utoipa::path(
    get,
    path = "/api/v1/inventory/variants/{id}/movements",
    params(("id" = Uuid, Path, description = "Variant id"), LimitParams),
    responses((status = 200, description = "Stock movements")),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let movements = state
        .services
        .inventory
        .list_movements(id, params.limit_or(50))
        .await?;
    Ok(ok(movements))
}

/// Variants at or below their minimum quantity
#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    params(LimitParams),
    responses((status = 200, description = "Low stock variants")),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .inventory
        .low_stock(params.limit_or(50))
        .await?))
}
