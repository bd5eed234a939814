use super::common::{ok, LimitParams};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    notifications::{
        sms::{BulkSmsInput, SendSmsInput},
        whatsapp::SendWhatsAppInput,
    },
};
use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
};
use validator::Validate;

/// Send one SMS through the configured provider
#[utoipa::path(
    post,
    path = "/api/v1/notifications/sms",
    request_body = SendSmsInput,
    responses(
        (status = 200, description = "Attempt logged; see status for the outcome"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 503, description = "SMS provider not configured", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn send_sms(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<SendSmsInput>,
) -> Result<impl IntoResponse, ServiceError> {
    input.validate()?;
    let log = state
        .services
        .sms
        .send(&input.phone, &input.message, input.device_id, Some(&user.user_id))
        .await?;
    Ok(ok(log))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/sms/bulk",
    request_body = BulkSmsInput,
    responses((status = 200, description = "Per-recipient outcome counts", body = crate::notifications::sms::BulkSmsResult)),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn send_bulk_sms(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<BulkSmsInput>,
) -> Result<impl IntoResponse, ServiceError> {
    input.validate()?;
    let result = state
        .services
        .sms
        .send_bulk(&input.phones, &input.message, Some(&user.user_id))
        .await?;
    Ok(ok(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/sms/logs",
    params(LimitParams),
    responses((status = 200, description = "SMS log, newest first")),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn sms_logs(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.sms.list_logs(params.limit_or(50)).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/sms/stats",
    responses((status = 200, description = "Delivery counts and cost", body = crate::notifications::sms::SmsStats)),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn sms_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.sms.sms_stats().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/whatsapp",
    request_body = SendWhatsAppInput,
    responses(
        (status = 200, description = "Message accepted", body = crate::notifications::whatsapp::WhatsAppSent),
        (status = 502, description = "Provider rejected the message", body = crate::errors::ErrorResponse),
        (status = 503, description = "WhatsApp provider not configured", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn send_whatsapp(
    State(state): State<AppState>,
    Json(input): Json<SendWhatsAppInput>,
) -> Result<impl IntoResponse, ServiceError> {
    input.validate()?;
    Ok(ok(state
        .services
        .whatsapp
        .send_text(&input.phone, &input.message)
        .await?))
}
