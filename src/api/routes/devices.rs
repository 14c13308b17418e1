//! Push device registration endpoints

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::{info, instrument};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{DeviceRequest, DevicesResponse, SuccessResponse},
};

fn required_token(body: Result<Json<DeviceRequest>, JsonRejection>) -> ApiResult<String> {
    let Json(request) = body?;

    match request.token {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(ApiError::InvalidRequest("Push token is required".to_string())),
    }
}

/// GET /api/v1/devices
pub async fn list_devices(State(state): State<ApiState>) -> ApiResult<Json<DevicesResponse>> {
    let devices = state.alerts.list_devices().await?;

    Ok(Json(DevicesResponse {
        count: devices.len(),
        devices,
    }))
}

/// POST /api/v1/devices
///
/// Registering an already known token keeps its notification history.
#[instrument(skip_all)]
pub async fn register_device(
    State(state): State<ApiState>,
    body: Result<Json<DeviceRequest>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let token = required_token(body)?;

    if !state.alerts.register(token).await? {
        return Err(ApiError::InvalidRequest("Invalid push token".to_string()));
    }

    info!("device registered for notifications");
    Ok(Json(SuccessResponse::new("Device registered for notifications")))
}

/// DELETE /api/v1/devices
#[instrument(skip_all)]
pub async fn unregister_device(
    State(state): State<ApiState>,
    body: Result<Json<DeviceRequest>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let token = required_token(body)?;

    if !state.alerts.unregister(token).await? {
        return Err(ApiError::NotFound("Device not found".to_string()));
    }

    info!("device unregistered");
    Ok(Json(SuccessResponse::new("Device unregistered")))
}

/// POST /api/v1/devices/reset
///
/// Forget every device's notification history; the next reading notifies again.
pub async fn reset_devices(State(state): State<ApiState>) -> ApiResult<Json<SuccessResponse>> {
    state.alerts.reset_all().await?;

    Ok(Json(SuccessResponse::new("Notification state reset")))
}
