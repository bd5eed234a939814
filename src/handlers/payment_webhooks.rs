use crate::{
    errors::ServiceError, handlers::AppState, services::mobile_money::MobileMoneyWebhook,
};
use axum::{
    extract::{Json, State},
    http::HeaderMap,
    response::IntoResponse,
};
use tracing::info;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Gateway status callback. Authenticated by the shared webhook key, not a bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/payments/mobile-money/webhook",
    request_body = MobileMoneyWebhook,
    responses(
        (status = 200, description = "Callback applied", body = crate::services::mobile_money::StatusUpdate),
        (status = 400, description = "Unknown payment status", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid webhook api key", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "Mobile Money"
)]
pub async fn mobile_money_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<MobileMoneyWebhook>,
) -> Result<impl IntoResponse, ServiceError> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    info!(order_id = %payload.order_id, status = %payload.payment_status, "Mobile money webhook received");

    let update = state
        .services
        .mobile_money
        .handle_webhook(api_key, payload)
        .await?;
    Ok(Json(update))
}
