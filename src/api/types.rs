//! Request and response bodies of the HTTP API

use serde::{Deserialize, Serialize};

use crate::actors::messages::StorageStats;
use crate::{PartialReading, SensorReading};

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub timestamp: String,
    pub storage: StorageStats,
    pub devices: usize,
}

// ============================================================================
// Readings
// ============================================================================

/// Body of `POST /api/v1/readings`
///
/// Accepts the field names the sensor firmware uses as well.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReadingRequest {
    #[serde(alias = "temperatureDHT")]
    pub temperature: f64,

    pub humidity: f64,

    #[serde(alias = "temperatureDS18B20")]
    pub water_temp: f64,
}

impl From<ReadingRequest> for PartialReading {
    fn from(request: ReadingRequest) -> Self {
        Self {
            temperature: Some(request.temperature),
            humidity: Some(request.humidity),
            water_temp: Some(request.water_temp),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingAccepted {
    pub message: String,

    /// The reading as cached, `None` if the hub still waits for other fields
    pub data: Option<SensorReading>,
}

/// Query string of `GET /api/v1/history`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub range: Option<String>,
}

// ============================================================================
// Devices
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceRequest {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<String>,
    pub count: usize,
}

/// Generic acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
