//! Helper functions for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use hydro_monitor::{
    actors::{
        alert::AlertHandle,
        messages::ReadingEvent,
        storage::{StorageHandle, StorageOptions},
    },
    config::PushConfig,
    ingest::{IngestBridge, SensorTopics},
    notifications::{AlertDispatcher, ExpoPushClient, PushService},
    storage::{MemoryBackend, StorageBackend},
};
use serde_json::json;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_A: &str = "ExponentPushToken[integrationdevice00000a]";
pub const TOKEN_B: &str = "ExponentPushToken[integrationdevice00000b]";

pub const AIR_TOPIC: &str = "sensor33/air";
pub const WATER_TOPIC: &str = "sensor33/water";

pub const PUSH_PATH: &str = "/--/api/v2/push/send";

/// Expo mock that acknowledges every message with an ok ticket
pub async fn mock_expo() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "status": "ok", "id": "ticket-1" }]
        })))
        .mount(&server)
        .await;

    server
}

pub fn push_config(server: &MockServer) -> PushConfig {
    PushConfig {
        url: format!("{}{PUSH_PATH}", server.uri()),
        timeout_secs: 5,
        ..PushConfig::default()
    }
}

pub fn air_payload(temperature: f64, humidity: f64) -> Vec<u8> {
    json!({ "temperature": temperature, "humidity": humidity })
        .to_string()
        .into_bytes()
}

pub fn water_payload(temperature: f64) -> Vec<u8> {
    json!({ "temperature": temperature }).to_string().into_bytes()
}

/// A hub without MQTT: bridge, alert actor against the mock and in-memory storage
pub struct TestHub {
    pub bridge: IngestBridge,
    pub alerts: AlertHandle,
    pub storage: StorageHandle,
}

impl TestHub {
    pub async fn shutdown(&self) {
        self.alerts.shutdown().await;
        self.storage.shutdown().await;
    }
}

pub fn spawn_hub(server: &MockServer) -> TestHub {
    spawn_hub_with_storage(server, Box::new(MemoryBackend::new()))
}

pub fn spawn_hub_with_storage(server: &MockServer, backend: Box<dyn StorageBackend>) -> TestHub {
    let (tx, _) = broadcast::channel::<ReadingEvent>(64);
    let bridge = IngestBridge::new(SensorTopics::default(), tx);

    let push: Arc<dyn PushService> =
        Arc::new(ExpoPushClient::new(&push_config(server)).expect("client builds"));
    let alerts = AlertHandle::spawn(AlertDispatcher::default(), push, bridge.subscribe());
    let storage = StorageHandle::spawn(bridge.subscribe(), backend, StorageOptions::default());

    TestHub {
        bridge,
        alerts,
        storage,
    }
}

/// Messages received by the mock so far, flattened across requests
pub async fn pushed_messages(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .flat_map(|request| {
            request
                .body_json::<Vec<serde_json::Value>>()
                .expect("push body is a JSON array")
        })
        .collect()
}

/// Wait until the mock has received at least `count` messages
pub async fn wait_for_pushed(server: &MockServer, count: usize) -> Vec<serde_json::Value> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let messages = pushed_messages(server).await;
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("push messages did not arrive in time")
}
