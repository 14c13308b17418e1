//! Actor-based hub
//!
//! Each actor runs as an independent tokio task and communicates via channels.
//!
//! ```text
//!   MQTT broker          POST /api/v1/readings
//!        │                        │
//! ┌──────▼──────────┐             │
//! │ SensorFeedActor │             │
//! └──────┬──────────┘             │
//!        └──────────┬─────────────┘
//!            ┌──────▼───────┐
//!            │ IngestBridge │ (latest-reading cache)
//!            └──────┬───────┘
//!                   │ ReadingEvent (broadcast)
//!       ┌───────────┼──────────────┐
//! ┌─────▼──────┐ ┌──▼───────────┐ ┌▼──────────────┐
//! │ AlertActor │ │ StorageActor │ │ WebSocket feed │
//! └─────┬──────┘ └──────────────┘ └───────────────┘
//!       │ spawned delivery
//!   Expo push API
//! ```
//!
//! - **Commands**: each actor has an mpsc command channel
//! - **Events**: readings are fanned out on a broadcast channel
//! - **Request/Response**: oneshot channels inside commands

pub mod alert;
pub mod messages;
pub mod sensor_feed;
pub mod storage;
