//! Message types for actor communication
//!
//! 1. **Commands**: request/response messages sent to one actor via mpsc
//! 2. **Events**: broadcast to every subscriber, so they must be `Clone`

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::notifications::RegisteredDevice;
use crate::storage::{HistoryRange, ReadingRow, StorageResult};
use crate::{ReadingSource, SensorReading};

/// A complete reading, published once per reading by the ingest bridge
///
/// The alert actor, the storage actor and the live feed all see the same
/// values. A lagging subscriber may miss events; new readings keep coming.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingEvent {
    pub reading: SensorReading,
    pub source: ReadingSource,
}

/// Commands that can be sent to the AlertActor
#[derive(Debug)]
pub enum AlertCommand {
    /// Subscribe a device; responds `false` for a malformed token
    Register {
        token: String,
        respond_to: oneshot::Sender<bool>,
    },

    /// Remove a device; responds whether it was registered
    Unregister {
        token: String,
        respond_to: oneshot::Sender<bool>,
    },

    ListDevices {
        respond_to: oneshot::Sender<Vec<String>>,
    },

    GetDevice {
        token: String,
        respond_to: oneshot::Sender<Option<RegisteredDevice>>,
    },

    /// Forget the notification history of every device
    ResetAll { respond_to: oneshot::Sender<()> },

    /// Gracefully shut down the alert actor
    Shutdown,
}

/// Commands that can be sent to the StorageActor
#[derive(Debug)]
pub enum StorageCommand {
    /// Readings inside the range window, oldest first, at most `limit`
    QueryHistory {
        range: HistoryRange,
        limit: usize,
        respond_to: oneshot::Sender<StorageResult<Vec<ReadingRow>>>,
    },

    /// Manually flush the write buffer
    Flush {
        respond_to: oneshot::Sender<StorageResult<()>>,
    },

    GetStats {
        respond_to: oneshot::Sender<StorageStats>,
    },

    /// Gracefully shut down the storage actor
    Shutdown,
}

/// Storage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StorageStats {
    /// Readings in the backend
    pub total_readings: usize,

    /// Readings waiting in the write buffer
    pub buffer_size: usize,

    /// Number of successful flushes
    pub flush_count: u64,

    /// Number of failed flushes (their readings are dropped)
    pub failed_flushes: u64,

    pub last_cleanup_time: Option<DateTime<Utc>>,

    pub total_readings_deleted: u64,

    /// Backend-specific summary
    pub backend: String,
}

/// Commands that can be sent to the SensorFeedActor
#[derive(Debug)]
pub enum SensorFeedCommand {
    /// Disconnect from the broker and stop
    Shutdown,
}
