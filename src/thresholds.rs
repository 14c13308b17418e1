//! Threshold classification for sensor metrics
//!
//! Every metric has two nested bands. A value outside the critical band is
//! `Critical`, a value outside the warning band (but inside the critical one) is
//! `Warning`, everything else is `Optimal`. Band edges are inclusive, i.e. a value
//! exactly on an edge is still inside the band.
//!
//! ```text
//!   Critical | Warning |      Optimal      | Warning | Critical
//! ---------crit.min--warn.min---------warn.max--crit.max---------
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SensorReading;

/// Independently thresholded quantity measured by the sensor network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "humidity")]
    Humidity,
    #[serde(rename = "waterTemp")]
    WaterTemp,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::WaterTemp];

    /// Key used in notification payloads and logs
    pub fn key(self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::WaterTemp => "waterTemp",
        }
    }

    /// Human readable label
    pub fn label(self) -> &'static str {
        match self {
            Metric::Temperature => "Air Temperature",
            Metric::Humidity => "Humidity",
            Metric::WaterTemp => "Water Temperature",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Temperature | Metric::WaterTemp => "°C",
            Metric::Humidity => "%",
        }
    }

    /// Pick the field of a reading that belongs to this metric
    pub fn value_of(self, reading: &SensorReading) -> f64 {
        match self {
            Metric::Temperature => reading.temperature,
            Metric::Humidity => reading.humidity,
            Metric::WaterTemp => reading.water_temp,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Severity of a single metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricStatus {
    Optimal,
    Warning,
    Critical,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Optimal => "Optimal",
            MetricStatus::Warning => "Warning",
            MetricStatus::Critical => "Critical",
        }
    }
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn encloses(&self, other: &Band) -> bool {
        self.min <= other.min && self.max >= other.max
    }
}

/// Critical and warning band of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricThresholds {
    pub critical: Band,
    pub warning: Band,
}

impl MetricThresholds {
    pub fn classify(&self, value: f64) -> MetricStatus {
        if !self.critical.contains(value) {
            return MetricStatus::Critical;
        }

        if !self.warning.contains(value) {
            return MetricStatus::Warning;
        }

        MetricStatus::Optimal
    }
}

/// Threshold table for all metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temperature: MetricThresholds,
    pub humidity: MetricThresholds,
    #[serde(rename = "waterTemp", alias = "water_temp")]
    pub water_temp: MetricThresholds,
}

pub const DEFAULT_THRESHOLDS: Thresholds = Thresholds {
    temperature: MetricThresholds {
        critical: Band::new(15.0, 35.0),
        warning: Band::new(18.0, 30.0),
    },
    humidity: MetricThresholds {
        critical: Band::new(35.0, 85.0),
        warning: Band::new(40.0, 80.0),
    },
    water_temp: MetricThresholds {
        critical: Band::new(18.0, 30.0),
        warning: Band::new(20.0, 28.0),
    },
};

impl Default for Thresholds {
    fn default() -> Self {
        DEFAULT_THRESHOLDS
    }
}

impl Thresholds {
    pub fn for_metric(&self, metric: Metric) -> &MetricThresholds {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::WaterTemp => &self.water_temp,
        }
    }

    pub fn classify(&self, metric: Metric, value: f64) -> MetricStatus {
        self.for_metric(metric).classify(value)
    }

    /// Make sure every band is well formed and the critical band encloses the
    /// warning band.
    pub fn validate(&self) -> anyhow::Result<()> {
        for metric in Metric::ALL {
            let MetricThresholds { critical, warning } = self.for_metric(metric);

            for band in [critical, warning] {
                anyhow::ensure!(
                    band.min <= band.max,
                    "{metric}: band minimum {} is above its maximum {}",
                    band.min,
                    band.max
                );
            }

            anyhow::ensure!(
                critical.encloses(warning),
                "{metric}: critical band [{}, {}] must enclose warning band [{}, {}]",
                critical.min,
                critical.max,
                warning.min,
                warning.max
            );
        }

        Ok(())
    }
}

/// Classify a value against the built-in threshold table
pub fn classify(metric: Metric, value: f64) -> MetricStatus {
    DEFAULT_THRESHOLDS.classify(metric, value)
}
