pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod ingest;
pub mod mqtt;
pub mod notifications;
pub mod storage;
pub mod thresholds;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One complete sample of the sensor network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Air temperature in °C
    pub temperature: f64,

    /// Relative air humidity in %
    pub humidity: f64,

    /// Water temperature in °C
    pub water_temp: f64,

    /// When the reading was assembled by the hub
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    pub fn new(temperature: f64, humidity: f64, water_temp: f64) -> Self {
        Self {
            temperature,
            humidity,
            water_temp,
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Transport a reading arrived through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingSource {
    #[default]
    Mqtt,
    Http,
}

impl ReadingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingSource::Mqtt => "mqtt",
            ReadingSource::Http => "http",
        }
    }

    /// Unknown values fall back to `Mqtt`
    pub fn parse(value: &str) -> Self {
        match value {
            "http" => ReadingSource::Http,
            _ => ReadingSource::Mqtt,
        }
    }
}

/// A reading where any subset of fields may be missing.
///
/// The air and water sensors publish independently, so most updates only carry
/// part of the triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub water_temp: Option<f64>,
}

impl PartialReading {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none() && self.water_temp.is_none()
    }
}

impl From<SensorReading> for PartialReading {
    fn from(reading: SensorReading) -> Self {
        Self {
            temperature: Some(reading.temperature),
            humidity: Some(reading.humidity),
            water_temp: Some(reading.water_temp),
        }
    }
}
