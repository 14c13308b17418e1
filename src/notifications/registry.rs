//! Set of devices subscribed to alert notifications
//!
//! Devices are keyed by their push token, so a token can never be registered twice.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::debounce::MetricStates;
use super::expo::ExpoTokenFormat;
use super::push::TokenValidator;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredDevice {
    pub token: String,
    pub registered_at: DateTime<Utc>,
    pub states: MetricStates,
}

impl RegisteredDevice {
    fn new(token: String) -> Self {
        Self {
            token,
            registered_at: Utc::now(),
            states: MetricStates::default(),
        }
    }
}

pub struct DeviceRegistry {
    devices: BTreeMap<String, RegisteredDevice>,
    validator: Arc<dyn TokenValidator>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(Arc::new(ExpoTokenFormat))
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices)
            .finish_non_exhaustive()
    }
}

impl DeviceRegistry {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            devices: BTreeMap::new(),
            validator,
        }
    }

    /// Register a device. Returns `false` only for tokens the push service
    /// would reject; re-registering a known token is a successful no-op.
    pub fn register(&mut self, token: &str) -> bool {
        if !self.validator.is_valid_token(token) {
            warn!("rejecting invalid push token: {token}");
            return false;
        }

        if self.devices.contains_key(token) {
            debug!("device already registered: {token}");
            return true;
        }

        self.devices
            .insert(token.to_string(), RegisteredDevice::new(token.to_string()));
        info!("device registered: {token}");
        true
    }

    /// Remove a device, returning whether it was registered
    pub fn unregister(&mut self, token: &str) -> bool {
        let removed = self.devices.remove(token).is_some();
        if removed {
            info!("device unregistered: {token}");
        } else {
            debug!("unregister for unknown device: {token}");
        }
        removed
    }

    pub fn list(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    pub fn get(&self, token: &str) -> Option<&RegisteredDevice> {
        self.devices.get(token)
    }

    /// Forget every device's notification history, keeping registrations
    pub fn reset_all(&mut self) {
        for device in self.devices.values_mut() {
            device.states.reset();
        }
        info!("notification state reset for {} devices", self.devices.len());
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub(crate) fn devices_mut(&mut self) -> impl Iterator<Item = &mut RegisteredDevice> {
        self.devices.values_mut()
    }
}
