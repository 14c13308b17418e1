//! API shared state containing actor handles

use tokio::sync::broadcast;

use crate::actors::{alert::AlertHandle, messages::ReadingEvent, storage::StorageHandle};
use crate::ingest::IngestBridge;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Latest-reading cache, also the entry point for HTTP ingestion
    pub bridge: IngestBridge,

    /// Handle to the alert actor, which owns the device registry
    pub alerts: AlertHandle,

    /// Handle to the storage actor for history queries
    pub storage: StorageHandle,
}

impl ApiState {
    pub fn new(bridge: IngestBridge, alerts: AlertHandle, storage: StorageHandle) -> Self {
        Self {
            bridge,
            alerts,
            storage,
        }
    }

    /// New subscription to the reading feed (for WebSocket streaming)
    pub fn subscribe(&self) -> broadcast::Receiver<ReadingEvent> {
        self.bridge.subscribe()
    }
}
