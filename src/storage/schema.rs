//! Row and query types shared by all storage backends

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{ReadingSource, SensorReading};

/// Maximum number of rows a history query returns
pub const HISTORY_LIMIT: usize = 100;

/// A stored reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingRow {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub water_temp: f64,
    pub source: ReadingSource,
}

impl ReadingRow {
    pub fn from_reading(reading: &SensorReading, source: ReadingSource) -> Self {
        Self {
            timestamp: reading.timestamp,
            temperature: reading.temperature,
            humidity: reading.humidity,
            water_temp: reading.water_temp,
            source,
        }
    }

    pub fn reading(&self) -> SensorReading {
        SensorReading {
            temperature: self.temperature,
            humidity: self.humidity,
            water_temp: self.water_temp,
            timestamp: self.timestamp,
        }
    }
}

/// Look-back window of a history query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRange {
    #[default]
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl HistoryRange {
    /// Parse a `range` query value; anything unknown means the last minute
    pub fn parse(value: &str) -> Self {
        match value {
            "hour" => HistoryRange::Hour,
            "day" => HistoryRange::Day,
            "week" => HistoryRange::Week,
            "month" => HistoryRange::Month,
            _ => HistoryRange::Minute,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            HistoryRange::Minute => Duration::minutes(1),
            HistoryRange::Hour => Duration::hours(1),
            HistoryRange::Day => Duration::days(1),
            HistoryRange::Week => Duration::weeks(1),
            HistoryRange::Month => Duration::days(30),
        }
    }

    /// `(start, end)` of the window ending at `now`
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.duration(), now)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRange::Minute => "minute",
            HistoryRange::Hour => "hour",
            HistoryRange::Day => "day",
            HistoryRange::Week => "week",
            HistoryRange::Month => "month",
        }
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
