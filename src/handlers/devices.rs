use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::error::{AppError, Result};
use crate::models::{
    Device, DeviceQueryParams, RegisterDeviceRequest, TestResult, UpdateDeviceStatusRequest,
};
use crate::services::DeviceService;

/// POST /api/devices/register
/// Register a new device
pub async fn register_device(
    State(service): State<DeviceService>,
    payload: std::result::Result<Json<RegisterDeviceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Device>)> {
    let Json(request) = payload.map_err(invalid_body)?;
    let device = service.create_device(request).await?;

    Ok((StatusCode::CREATED, Json(device)))
}

/// GET /api/devices?status=online|offline
/// Returns all devices, optionally filtered by status
pub async fn list_devices(
    State(service): State<DeviceService>,
    query: std::result::Result<Query<DeviceQueryParams>, QueryRejection>,
) -> Result<Json<Vec<Device>>> {
    let Query(params) = query.map_err(invalid_query)?;
    let devices = service.list_devices(params.status.as_deref()).await?;
    Ok(Json(devices))
}

/// GET /api/devices/{uuid}
pub async fn get_device(
    State(service): State<DeviceService>,
    Path(uuid): Path<String>,
) -> Result<Json<Device>> {
    let device = service.get_device(&uuid).await?;
    Ok(Json(device))
}

/// PATCH /api/devices/{uuid}/status
/// Flip a device between online and offline
pub async fn update_device_status(
    State(service): State<DeviceService>,
    Path(uuid): Path<String>,
    payload: std::result::Result<Json<UpdateDeviceStatusRequest>, JsonRejection>,
) -> Result<Json<Device>> {
    let Json(request) = payload.map_err(invalid_body)?;
    let device = service.set_device_status(&uuid, &request.status).await?;

    Ok(Json(device))
}

/// GET /api/devices/{uuid}/data
/// Returns a fresh batch of synthetic test results for the device
pub async fn get_device_data(
    State(service): State<DeviceService>,
    Path(uuid): Path<String>,
) -> Result<Json<Vec<TestResult>>> {
    let results = service.get_device_results_random(&uuid).await?;
    Ok(Json(results))
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::InvalidInput(format!("Invalid request data: {}", rejection.body_text()))
}

fn invalid_query(rejection: QueryRejection) -> AppError {
    AppError::InvalidInput(format!("Invalid query parameters: {}", rejection.body_text()))
}
