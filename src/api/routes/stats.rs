//! Hub statistics endpoint

use axum::{Json, extract::State};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::StatsResponse,
};

/// GET /api/v1/stats
///
/// Storage counters and the number of registered devices
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<Json<StatsResponse>> {
    let storage = state
        .storage
        .get_stats()
        .await
        .ok_or_else(|| ApiError::Internal("storage actor is not running".to_string()))?;
    let devices = state.alerts.list_devices().await?.len();

    Ok(Json(StatsResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage,
        devices,
    }))
}
