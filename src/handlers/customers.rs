use super::common::{created, ok, LimitParams, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::{customer::LoyaltyTier, points_transaction::PointsTransactionType},
    errors::ServiceError,
    handlers::AppState,
    services::loyalty::{
        CreateCustomerInput, CustomerFilter, LoyaltyMetrics, UpdateCustomerInput, REWARD_CATALOG,
    },
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CustomerListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub tier: Option<LoyaltyTier>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "points": 150, "reason": "Goodwill adjustment" }))]
pub struct AdjustPointsRequest {
    /// Positive to add, negative to deduct
    pub points: i32,
    #[validate(length(min = 1, max = 255, message = "Reason is required"))]
    pub reason: String,
    pub transaction_type: Option<PointsTransactionType>,
    pub device_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RedeemRequest {
    /// Point cost of the catalog reward being redeemed
    pub reward_points: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RewardView {
    pub points: i32,
    pub name: String,
    pub description: String,
}

/// Register a customer
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CreateCustomerInput,
    responses(
        (status = 201, description = "Customer created"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 409, description = "Phone number already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    input.validate()?;
    let customer = state.services.loyalty.create_customer(input).await?;
    Ok(created(customer))
}

/// List customers
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    params(CustomerListQuery),
    responses((status = 200, description = "Customers page")),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let pagination = PaginationParams {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(20),
    };
    let filter = CustomerFilter {
        tier: query.tier,
        is_active: query.is_active,
        search: query.search,
    };
    let (customers, total) = state
        .services
        .loyalty
        .list_customers(filter, pagination.page(), pagination.limit())
        .await?;
    Ok(ok(pagination.into_response(customers, total)))
}

/// Fetch one customer
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.loyalty.get_customer(id).await?))
}

/// Update customer details
#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomerInput,
    responses(
        (status = 200, description = "Customer updated"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    input.validate()?;
    Ok(ok(state.services.loyalty.update_customer(id, input).await?))
}

/// Add or deduct loyalty points
#[utoipa::path(
    post,
    path = "/api/v1/customers/{id}/points",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = AdjustPointsRequest,
    responses(
        (status = 200, description = "Points updated; the balance never drops below zero"),
        (status = 400, description = "Zero change or missing reason", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Loyalty"
)]
pub async fn adjust_points(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustPointsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;
    let transaction_type = request.transaction_type.unwrap_or(if request.points >= 0 {
        PointsTransactionType::Adjusted
    } else {
        PointsTransactionType::Spent
    });
    let update = state
        .services
        .loyalty
        .update_points(
            id,
            request.points,
            request.reason,
            transaction_type,
            request.device_id,
            &user.user_id,
        )
        .await?;
    Ok(ok(update))
}

/// Points ledger for a customer, newest first
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}/points",
    params(("id" = Uuid, Path, description = "Customer id"), LimitParams),
    responses((status = 200, description = "Points history")),
    security(("bearer_auth" = [])),
    tag = "Loyalty"
)]
pub async fn points_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let history = state
        .services
        .loyalty
        .points_history(id, params.limit_or(50))
        .await?;
    Ok(ok(history))
}

/// Redeem a catalog reward
#[utoipa::path(
    post,
    path = "/api/v1/customers/{id}/redeem",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = RedeemRequest,
    responses(
        (status = 200, description = "Reward redeemed"),
        (status = 400, description = "Unknown reward or not enough points", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Loyalty"
)]
pub async fn redeem_reward(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RedeemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let update = state
        .services
        .loyalty
        .redeem_reward(id, request.reward_points, &user.user_id)
        .await?;
    Ok(ok(update))
}

/// Program-wide loyalty metrics
#[utoipa::path(
    get,
    path = "/api/v1/loyalty/metrics",
    responses((status = 200, description = "Loyalty metrics", body = LoyaltyMetrics)),
    security(("bearer_auth" = [])),
    tag = "Loyalty"
)]
pub async fn loyalty_metrics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.loyalty.loyalty_metrics().await?))
}

/// Reward catalog
#[utoipa::path(
    get,
    path = "/api/v1/loyalty/rewards",
    responses((status = 200, description = "Redeemable rewards", body = [RewardView])),
    security(("bearer_auth" = [])),
    tag = "Loyalty"
)]
pub async fn list_rewards() -> impl IntoResponse {
    let rewards: Vec<RewardView> = REWARD_CATALOG
        .iter()
        .map(|r| RewardView {
            points: r.points,
            name: r.name.to_string(),
            description: r.description.to_string(),
        })
        .collect();
    ok(rewards)
}
