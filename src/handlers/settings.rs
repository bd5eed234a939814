use super::common::ok;
use crate::{
    errors::ServiceError, handlers::AppState, services::settings::SetSettingInput,
};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

#[utoipa::path(
    get,
    path = "/api/v1/settings",
    responses((status = 200, description = "All settings")),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn list_settings(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.settings.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting"),
        (status = 404, description = "Not set", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.settings.get(&key).await?))
}

/// Create or replace a setting
#[utoipa::path(
    put,
    path = "/api/v1/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    request_body = SetSettingInput,
    responses((status = 200, description = "Setting stored")),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn put_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(input): Json<SetSettingInput>,
) -> Result<impl IntoResponse, ServiceError> {
    input.validate()?;
    Ok(ok(state.services.settings.set(&key, input.value).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 204, description = "Setting removed"),
        (status = 404, description = "Not set", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn delete_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.settings.delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
