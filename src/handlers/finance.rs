use super::common::{created, ok};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::finance::{CreateAccountInput, RecordExpenseInput, TransferInput},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AccountListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExpenseListQuery {
    pub account_id: Option<Uuid>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TransferListQuery {
    /// Transfers into or out of this account
    pub account_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/finance/accounts",
    request_body = CreateAccountInput,
    responses((status = 201, description = "Account opened")),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn create_account(
    State(state): State<AppState>,
    Json(input): Json<CreateAccountInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created(state.services.finance.create_account(input).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/accounts",
    params(AccountListQuery),
    responses((status = 200, description = "Accounts")),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<AccountListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .finance
        .list_accounts(query.include_inactive)
        .await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.finance.get_account(id).await?))
}

/// Book an expense against an account
#[utoipa::path(
    post,
    path = "/api/v1/finance/expenses",
    request_body = RecordExpenseInput,
    responses(
        (status = 201, description = "Expense recorded"),
        (status = 400, description = "Insufficient balance or inactive account", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn record_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<RecordExpenseInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created(
        state
            .services
            .finance
            .record_expense(input, &user.user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/expenses",
    params(ExpenseListQuery),
    responses((status = 200, description = "Expenses, newest first")),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .finance
        .list_expenses(query.account_id, query.category)
        .await?))
}

/// Move funds between two accounts
#[utoipa::path(
    post,
    path = "/api/v1/finance/transfers",
    request_body = TransferInput,
    responses(
        (status = 201, description = "Transfer completed"),
        (status = 400, description = "Invalid transfer", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn transfer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<TransferInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created(
        state.services.finance.transfer(input, &user.user_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/transfers",
    params(TransferListQuery),
    responses((status = 200, description = "Transfers, newest first")),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(query): Query<TransferListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .finance
        .list_transfers(query.account_id)
        .await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/summary",
    responses((status = 200, description = "Balances and spend by category", body = crate::services::finance::FinanceSummary)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.finance.summary().await?))
}
