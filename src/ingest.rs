//! Ingest bridge between the sensor transports and the rest of the hub
//!
//! MQTT messages and HTTP posts carry partial readings. They are merged into a
//! single [`LatestReading`] cache, and as soon as all three fields are known every
//! update publishes a complete [`SensorReading`] on the reading broadcast channel.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, trace, warn};

use crate::actors::messages::ReadingEvent;
use crate::config::MqttConfig;
use crate::{PartialReading, ReadingSource, SensorReading};

/// A snapshot this old is reported as disconnected
pub const STALE_AFTER: Duration = Duration::seconds(30);

/// Most recent value seen for every field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub water_temp: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
    pub connected: bool,
    pub last_error: Option<String>,
}

impl LatestReading {
    /// Overwrite only the fields present in `partial`
    pub fn apply(&mut self, partial: &PartialReading, now: DateTime<Utc>) {
        if let Some(temperature) = partial.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(humidity) = partial.humidity {
            self.humidity = Some(humidity);
        }
        if let Some(water_temp) = partial.water_temp {
            self.water_temp = Some(water_temp);
        }
        self.updated_at = Some(now);
        self.connected = true;
        self.last_error = None;
    }

    pub fn complete(&self, now: DateTime<Utc>) -> Option<SensorReading> {
        Some(SensorReading {
            temperature: self.temperature?,
            humidity: self.humidity?,
            water_temp: self.water_temp?,
            timestamp: now,
        })
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> RealtimeSnapshot {
        let fresh = self
            .updated_at
            .is_some_and(|updated_at| now - updated_at < STALE_AFTER);

        RealtimeSnapshot {
            temperature: self.temperature,
            humidity: self.humidity,
            water_temp: self.water_temp,
            timestamp: self.updated_at,
            connected: self.connected && fresh,
            error: self.last_error.clone(),
        }
    }
}

/// What `GET /api/v1/realtime` reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSnapshot {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub water_temp: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub connected: bool,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirPayload {
    temperature: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WaterPayload {
    temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorTopics {
    pub air: String,
    pub water: String,
}

impl SensorTopics {
    pub fn from_config(config: &MqttConfig) -> Self {
        Self {
            air: config.air_topic.clone(),
            water: config.water_topic.clone(),
        }
    }

    pub fn all(&self) -> [&str; 2] {
        [&self.air, &self.water]
    }

    /// Decode a message payload; `Ok(None)` for topics we do not listen on
    pub fn decode(&self, topic: &str, payload: &[u8]) -> anyhow::Result<Option<PartialReading>> {
        if topic == self.air {
            let air: AirPayload =
                serde_json::from_slice(payload).context("invalid air sensor payload")?;
            return Ok(Some(PartialReading {
                temperature: air.temperature,
                humidity: air.humidity,
                water_temp: None,
            }));
        }

        if topic == self.water {
            let water: WaterPayload =
                serde_json::from_slice(payload).context("invalid water sensor payload")?;
            return Ok(Some(PartialReading {
                water_temp: water.temperature,
                ..PartialReading::default()
            }));
        }

        Ok(None)
    }
}

impl Default for SensorTopics {
    fn default() -> Self {
        Self::from_config(&MqttConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct IngestBridge {
    latest: Arc<RwLock<LatestReading>>,
    readings: broadcast::Sender<ReadingEvent>,
    topics: SensorTopics,
}

impl IngestBridge {
    pub fn new(topics: SensorTopics, readings: broadcast::Sender<ReadingEvent>) -> Self {
        Self {
            latest: Arc::new(RwLock::new(LatestReading::default())),
            readings,
            topics,
        }
    }

    pub fn topics(&self) -> &SensorTopics {
        &self.topics
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReadingEvent> {
        self.readings.subscribe()
    }

    /// Handle a raw MQTT message
    pub async fn handle_message(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> anyhow::Result<Option<SensorReading>> {
        let Some(partial) = self.topics.decode(topic, payload)? else {
            debug!("ignoring message on unexpected topic {topic}");
            return Ok(None);
        };

        Ok(self.ingest(partial, ReadingSource::Mqtt).await)
    }

    /// Merge a partial reading into the cache and publish the complete reading
    /// once every field is known.
    ///
    /// Stamping and publishing happen under the cache lock, so readings are
    /// published in timestamp order even with concurrent sources.
    pub async fn ingest(
        &self,
        partial: PartialReading,
        source: ReadingSource,
    ) -> Option<SensorReading> {
        if partial.is_empty() {
            debug!("ignoring {} update without sensor values", source.as_str());
            return None;
        }

        let mut latest = self.latest.write().await;
        let now = Utc::now();
        latest.apply(&partial, now);

        let Some(reading) = latest.complete(now) else {
            trace!("reading still incomplete, waiting for remaining sensors");
            return None;
        };

        // no subscribers is not an error, the reading is still cached
        if self
            .readings
            .send(ReadingEvent { reading, source })
            .is_err()
        {
            trace!("no reading subscribers");
        }

        Some(reading)
    }

    pub async fn mark_error(&self, error: impl Into<String>) {
        let error = error.into();
        warn!("sensor feed error: {error}");

        let mut latest = self.latest.write().await;
        latest.connected = false;
        latest.last_error = Some(error);
    }

    pub async fn latest(&self) -> LatestReading {
        self.latest.read().await.clone()
    }

    pub async fn snapshot(&self) -> RealtimeSnapshot {
        self.latest.read().await.snapshot(Utc::now())
    }
}
