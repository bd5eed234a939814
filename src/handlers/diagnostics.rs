use super::common::{created, ok, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::diagnostic_request::DiagnosticStatus,
    errors::ServiceError,
    handlers::AppState,
    services::diagnostics::{
        AdminFeedbackInput, CompleteActionInput, CreateDiagnosticRequestInput, DiagnosticFilter,
        RecordCheckInput, TemplateInput, UpdateDiagnosticRequestInput,
    },
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DiagnosticListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<DiagnosticStatus>,
    pub assigned_to: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TemplateMatchQuery {
    /// Free-text device model, e.g. "iPhone 13"
    pub model: String,
}

/// Open a diagnostic request for a batch of devices
#[utoipa::path(
    post,
    path = "/api/v1/diagnostics",
    request_body = CreateDiagnosticRequestInput,
    responses(
        (status = 201, description = "Request created with one row per unit"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn create_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateDiagnosticRequestInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = state
        .services
        .diagnostics
        .create_request(input, &user.user_id)
        .await?;
    Ok(created(request))
}

#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    params(DiagnosticListQuery),
    responses((status = 200, description = "Requests page with device counts")),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<DiagnosticListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let pagination = PaginationParams {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(20),
    };
    let filter = DiagnosticFilter {
        status: query.status,
        assigned_to: query.assigned_to,
        created_by: query.created_by,
    };
    let (requests, total) = state
        .services
        .diagnostics
        .list_requests(filter, pagination.page(), pagination.limit())
        .await?;
    Ok(ok(pagination.into_response(requests, total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/diagnostics/stats",
    responses((status = 200, description = "Request and device counts", body = crate::services::diagnostics::DiagnosticStats)),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.diagnostics.stats().await?))
}

/// Request with its devices and their checks
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics/{id}",
    params(("id" = Uuid, Path, description = "Diagnostic request id")),
    responses(
        (status = 200, description = "Diagnostic request"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.diagnostics.get_request(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/diagnostics/{id}",
    params(("id" = Uuid, Path, description = "Diagnostic request id")),
    request_body = UpdateDiagnosticRequestInput,
    responses((status = 200, description = "Request updated")),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn update_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateDiagnosticRequestInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.diagnostics.update_request(id, input).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/diagnostic-devices/{id}",
    params(("id" = Uuid, Path, description = "Diagnostic device id")),
    responses((status = 200, description = "Device with its checks")),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.diagnostics.get_device(id).await?))
}

/// Record one check result for a device
#[utoipa::path(
    post,
    path = "/api/v1/diagnostic-devices/{id}/checks",
    params(("id" = Uuid, Path, description = "Diagnostic device id")),
    request_body = RecordCheckInput,
    responses(
        (status = 201, description = "Check recorded; device result recomputed"),
        (status = 400, description = "Device already reviewed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn record_check(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<RecordCheckInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created(state.services.diagnostics.record_check(id, input).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/diagnostic-checks/{id}",
    params(("id" = Uuid, Path, description = "Diagnostic check id")),
    request_body = RecordCheckInput,
    responses((status = 200, description = "Check updated; device result recomputed")),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn update_check(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<RecordCheckInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.diagnostics.update_check(id, input).await?))
}

/// Admin decision on a tested device
#[utoipa::path(
    post,
    path = "/api/v1/diagnostic-devices/{id}/feedback",
    params(("id" = Uuid, Path, description = "Diagnostic device id")),
    request_body = AdminFeedbackInput,
    responses(
        (status = 200, description = "Feedback stored"),
        (status = 400, description = "Device untested or already reviewed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn submit_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<AdminFeedbackInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .diagnostics
        .submit_feedback(id, input, &user.user_id)
        .await?))
}

/// Finish the admin action and return the device to customer care
#[utoipa::path(
    post,
    path = "/api/v1/diagnostic-devices/{id}/complete",
    params(("id" = Uuid, Path, description = "Diagnostic device id")),
    request_body = CompleteActionInput,
    responses(
        (status = 200, description = "Device sent to customer care"),
        (status = 400, description = "Device not reviewed yet", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn complete_action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CompleteActionInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.diagnostics.complete_action(id, input).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/diagnostic-templates",
    responses((status = 200, description = "Templates by device type")),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.diagnostics.list_templates().await?))
}

/// Checklist for a device model, falling back to the general template
#[utoipa::path(
    get,
    path = "/api/v1/diagnostic-templates/match",
    params(TemplateMatchQuery),
    responses(
        (status = 200, description = "Matching template"),
        (status = 404, description = "No template applies", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn match_template(
    State(state): State<AppState>,
    Query(query): Query<TemplateMatchQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .diagnostics
        .template_for_model(&query.model)
        .await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/diagnostic-templates",
    request_body = TemplateInput,
    responses(
        (status = 201, description = "Template created"),
        (status = 409, description = "Device type already has a template", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn create_template(
    State(state): State<AppState>,
    Json(input): Json<TemplateInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created(state.services.diagnostics.create_template(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/diagnostic-templates/{id}",
    params(("id" = Uuid, Path, description = "Template id")),
    request_body = TemplateInput,
    responses((status = 200, description = "Template updated")),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<TemplateInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.diagnostics.update_template(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/diagnostic-templates/{id}",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 204, description = "Template removed"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Diagnostics"
)]
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.diagnostics.delete_template(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
