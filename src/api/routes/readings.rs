//! Reading endpoints: live snapshot, history and HTTP ingestion

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use tracing::{debug, instrument};

use crate::ReadingSource;
use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{HistoryQuery, ReadingAccepted, ReadingRequest},
};
use crate::ingest::RealtimeSnapshot;
use crate::storage::{HISTORY_LIMIT, HistoryRange, ReadingRow};

/// GET /api/v1/realtime
///
/// The latest cached values. `connected` turns false once the cache is stale.
pub async fn get_realtime(State(state): State<ApiState>) -> Json<RealtimeSnapshot> {
    Json(state.bridge.snapshot().await)
}

/// GET /api/v1/history?range=minute|hour|day|week|month
///
/// Unknown or missing ranges fall back to the last minute.
#[instrument(skip(state))]
pub async fn get_history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<ReadingRow>>> {
    let range = query
        .range
        .as_deref()
        .map(HistoryRange::parse)
        .unwrap_or_default();

    let rows = state.storage.query_history(range, HISTORY_LIMIT).await?;
    debug!("history {range}: {} rows", rows.len());

    Ok(Json(rows))
}

/// POST /api/v1/readings
///
/// Ingest a complete reading over HTTP. It goes through the same path as MQTT
/// readings, so it is stored, streamed and evaluated for alerts.
#[instrument(skip_all)]
pub async fn post_reading(
    State(state): State<ApiState>,
    body: Result<Json<ReadingRequest>, JsonRejection>,
) -> ApiResult<Json<ReadingAccepted>> {
    let Json(request) = body?;

    let reading = state
        .bridge
        .ingest(request.into(), ReadingSource::Http)
        .await;

    Ok(Json(ReadingAccepted {
        message: "Reading accepted".to_string(),
        data: reading,
    }))
}
