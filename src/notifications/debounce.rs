//! Per-device, per-metric notification debouncing
//!
//! ## Decision rule
//!
//! ```text
//! status != last notified status            → notify (any transition, incl. recovery)
//! status == Critical && elapsed >= interval → notify (periodic re-alert)
//! otherwise                                 → suppress
//! ```
//!
//! A metric that has never been notified (fresh registration or after a reset) is
//! `Unknown`, which differs from every status, so the first evaluation always notifies.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::thresholds::{Metric, MetricStatus};

/// Default cadence for repeating a sustained critical alert
pub const DEFAULT_REALERT_INTERVAL: Duration = Duration::minutes(30);

/// Debounce state of a single metric on a single device
///
/// The last notified status and the time it was sent only ever change together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DebounceState {
    #[default]
    Unknown,
    Notified {
        status: MetricStatus,
        at: DateTime<Utc>,
    },
}

impl DebounceState {
    pub fn last_status(&self) -> Option<MetricStatus> {
        match self {
            DebounceState::Unknown => None,
            DebounceState::Notified { status, .. } => Some(*status),
        }
    }

    pub fn last_notified_at(&self) -> Option<DateTime<Utc>> {
        match self {
            DebounceState::Unknown => None,
            DebounceState::Notified { at, .. } => Some(*at),
        }
    }

    /// Record that a notification for `status` was decided at `now`
    pub fn record(&mut self, status: MetricStatus, now: DateTime<Utc>) {
        *self = DebounceState::Notified { status, at: now };
    }

    pub fn reset(&mut self) {
        *self = DebounceState::Unknown;
    }
}

/// Debounce state for all metrics of one device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricStates {
    pub temperature: DebounceState,
    pub humidity: DebounceState,
    #[serde(rename = "waterTemp")]
    pub water_temp: DebounceState,
}

impl MetricStates {
    pub fn get(&self, metric: Metric) -> &DebounceState {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::WaterTemp => &self.water_temp,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut DebounceState {
        match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Humidity => &mut self.humidity,
            Metric::WaterTemp => &mut self.water_temp,
        }
    }

    pub fn reset(&mut self) {
        *self = MetricStates::default();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NotificationDebouncer {
    realert_interval: Duration,
}

impl Default for NotificationDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_REALERT_INTERVAL)
    }
}

impl NotificationDebouncer {
    pub fn new(realert_interval: Duration) -> Self {
        Self { realert_interval }
    }

    pub fn realert_interval(&self) -> Duration {
        self.realert_interval
    }

    pub fn should_notify(
        &self,
        state: &DebounceState,
        current: MetricStatus,
        now: DateTime<Utc>,
    ) -> bool {
        match *state {
            DebounceState::Unknown => true,
            DebounceState::Notified { status, at } => {
                if status != current {
                    return true;
                }

                current == MetricStatus::Critical && now - at >= self.realert_interval
            }
        }
    }

    /// Decide and, on a positive decision, record the new state in one step
    pub fn evaluate(
        &self,
        state: &mut DebounceState,
        current: MetricStatus,
        now: DateTime<Utc>,
    ) -> bool {
        let notify = self.should_notify(state, current, now);
        if notify {
            state.record(current, now);
        }
        notify
    }
}
