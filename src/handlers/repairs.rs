use super::common::{created, ok, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::device::DeviceStatus,
    errors::ServiceError,
    handlers::AppState,
    services::repairs::{
        CreateSparePartInput, DeviceFilter, RegisterDeviceInput, RequestPartInput,
        UpdateDeviceStatusInput, UpdatePartStatusInput,
    },
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeviceListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<DeviceStatus>,
    pub assigned_to: Option<String>,
    pub customer_id: Option<Uuid>,
}

/// Book a device in for repair
#[utoipa::path(
    post,
    path = "/api/v1/devices",
    request_body = RegisterDeviceInput,
    responses(
        (status = 201, description = "Device registered"),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn register_device(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<RegisterDeviceInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let device = state
        .services
        .repairs
        .register_device(input, &user.user_id)
        .await?;
    Ok(created(device))
}

#[utoipa::path(
    get,
    path = "/api/v1/devices",
    params(DeviceListQuery),
    responses((status = 200, description = "Devices page")),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<DeviceListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let pagination = PaginationParams {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(20),
    };
    let filter = DeviceFilter {
        status: query.status,
        assigned_to: query.assigned_to,
        customer_id: query.customer_id,
    };
    let (devices, total) = state
        .services
        .repairs
        .list_devices(filter, pagination.page(), pagination.limit())
        .await?;
    Ok(ok(pagination.into_response(devices, total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}",
    params(("id" = Uuid, Path, description = "Device id")),
    responses(
        (status = 200, description = "Device"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.repairs.get_device(id).await?))
}

/// Transitions the caller may perform right now
#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}/transitions",
    params(("id" = Uuid, Path, description = "Device id")),
    responses((status = 200, description = "Available transitions", body = [crate::services::repair_workflow::AvailableTransition])),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn available_transitions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .repairs
        .available_transitions(id, &user)
        .await?))
}

/// Apply a workflow transition
#[utoipa::path(
    put,
    path = "/api/v1/devices/{id}/status",
    params(("id" = Uuid, Path, description = "Device id")),
    request_body = UpdateDeviceStatusInput,
    responses(
        (status = 200, description = "Device updated"),
        (status = 400, description = "Transition not allowed or guard failed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Role may not perform this transition", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn update_device_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateDeviceStatusInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .repairs
        .update_status(id, input, &user)
        .await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}/history",
    params(("id" = Uuid, Path, description = "Device id")),
    responses((status = 200, description = "Status history, oldest first")),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn transition_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.repairs.transition_history(id).await?))
}

/// Request a spare part for a device
#[utoipa::path(
    post,
    path = "/api/v1/devices/{id}/parts",
    params(("id" = Uuid, Path, description = "Device id")),
    request_body = RequestPartInput,
    responses((status = 201, description = "Part requested")),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn request_part(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<RequestPartInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created(state.services.repairs.request_part(id, input).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}/parts",
    params(("id" = Uuid, Path, description = "Device id")),
    responses((status = 200, description = "Parts requested for the device")),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn list_repair_parts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.repairs.list_repair_parts(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/repair-parts/{id}/status",
    params(("id" = Uuid, Path, description = "Repair part id")),
    request_body = UpdatePartStatusInput,
    responses(
        (status = 200, description = "Part status updated"),
        (status = 400, description = "Status change not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn update_part_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePartStatusInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state
        .services
        .repairs
        .update_part_status(id, input.status)
        .await?))
}

/// Consume a requested part from spare stock
#[utoipa::path(
    post,
    path = "/api/v1/repair-parts/{id}/use",
    params(("id" = Uuid, Path, description = "Repair part id")),
    responses(
        (status = 200, description = "Part used"),
        (status = 422, description = "Not enough spare stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn use_part(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.repairs.use_part(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/spare-parts",
    request_body = CreateSparePartInput,
    responses(
        (status = 201, description = "Spare part created"),
        (status = 409, description = "Part number already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn create_spare_part(
    State(state): State<AppState>,
    Json(input): Json<CreateSparePartInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created(state.services.repairs.create_spare_part(input).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/spare-parts",
    responses((status = 200, description = "Spare parts")),
    security(("bearer_auth" = [])),
    tag = "Repairs"
)]
pub async fn list_spare_parts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(ok(state.services.repairs.list_spare_parts().await?))
}
