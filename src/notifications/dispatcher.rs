//! Decision phase of alerting: reading → notification batch
//!
//! For every registered device and every metric the reading is classified and
//! run through the debouncer. Positive decisions are committed to the device's
//! state immediately and turned into push messages. Delivery happens afterwards
//! and does not roll anything back.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, trace};

use super::debounce::NotificationDebouncer;
use super::push::{NotificationData, PushMessage, PushPriority};
use super::registry::DeviceRegistry;
use crate::SensorReading;
use crate::thresholds::{Metric, MetricStatus, Thresholds};

#[derive(Debug, Clone, Default)]
pub struct AlertDispatcher {
    thresholds: Thresholds,
    debouncer: NotificationDebouncer,
}

impl AlertDispatcher {
    pub fn new(thresholds: Thresholds, debouncer: NotificationDebouncer) -> Self {
        Self {
            thresholds,
            debouncer,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Evaluate a reading for all devices, using the reading's timestamp as "now"
    pub fn on_reading(
        &self,
        registry: &mut DeviceRegistry,
        reading: &SensorReading,
    ) -> Vec<PushMessage> {
        self.on_reading_at(registry, reading, reading.timestamp)
    }

    #[instrument(skip_all, fields(devices = registry.len()))]
    pub fn on_reading_at(
        &self,
        registry: &mut DeviceRegistry,
        reading: &SensorReading,
        now: DateTime<Utc>,
    ) -> Vec<PushMessage> {
        if registry.is_empty() {
            trace!("no registered devices, skipping evaluation");
            return vec![];
        }

        let statuses = Metric::ALL.map(|metric| {
            let value = metric.value_of(reading);
            (metric, value, self.thresholds.classify(metric, value))
        });

        let mut batch = vec![];

        for device in registry.devices_mut() {
            for (metric, value, status) in statuses {
                let state = device.states.get_mut(metric);
                if !self.debouncer.evaluate(state, status, now) {
                    continue;
                }

                debug!("{}: notify {metric} {status} ({value:.1})", device.token);
                batch.push(build_message(&device.token, metric, value, status));
            }
        }

        batch
    }
}

pub fn build_message(token: &str, metric: Metric, value: f64, status: MetricStatus) -> PushMessage {
    let label = metric.label();
    let unit = metric.unit();

    let (title, body) = match status {
        MetricStatus::Critical => (
            format!("⚠️ {label} Critical!"),
            format!("{label} is at critical level: {value:.1}{unit}"),
        ),
        MetricStatus::Warning | MetricStatus::Optimal => (
            format!("✅ {label} Recovered"),
            format!("{label} has returned to normal: {value:.1}{unit}"),
        ),
    };

    PushMessage {
        to: token.to_string(),
        sound: Some("default".to_string()),
        title,
        body,
        priority: PushPriority::High,
        data: NotificationData {
            metric,
            value,
            status,
        },
    }
}
