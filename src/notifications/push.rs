//! Push notification payloads and the delivery seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::thresholds::{Metric, MetricStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushPriority {
    Default,
    Normal,
    High,
}

/// Structured data attached to every alert notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    pub metric: Metric,
    pub value: f64,
    pub status: MetricStatus,
}

/// A single push notification, serialized in the Expo push message format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    pub title: String,
    pub body: String,
    pub priority: PushPriority,
    pub data: NotificationData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Ok,
    Error,
}

/// Per-message receipt returned by the push service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushTicket {
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Checks whether a device token has a format the push service accepts
pub trait TokenValidator: Send + Sync {
    fn is_valid_token(&self, token: &str) -> bool;
}

/// External push delivery API
///
/// Implementations send one chunk per call. Splitting a batch into chunks and
/// tolerating failed chunks is done by [`deliver`](super::delivery::deliver).
#[async_trait]
pub trait PushService: TokenValidator {
    /// Maximum number of messages accepted per `send_chunk` call
    fn chunk_size(&self) -> usize;

    async fn send_chunk(&self, chunk: Vec<PushMessage>) -> anyhow::Result<Vec<PushTicket>>;
}
