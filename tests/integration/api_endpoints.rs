//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - All REST endpoints return correct responses
//! - Device registration errors map to the right status codes
//! - HTTP ingestion feeds the realtime cache, history and alerts
//! - WebSocket streaming works

use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use hydro_monitor::api::{ApiConfig, ApiState, spawn_api_server};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use wiremock::MockServer;

use crate::helpers::{TOKEN_A, TestHub, mock_expo, spawn_hub, wait_for_pushed};

struct TestApi {
    addr: SocketAddr,
    hub: TestHub,
    // keeps the push mock alive for the duration of the test
    push: MockServer,
}

impl TestApi {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

async fn spawn_test_api() -> TestApi {
    let push = mock_expo().await;
    let hub = spawn_hub(&push);

    let state = ApiState::new(hub.bridge.clone(), hub.alerts.clone(), hub.storage.clone());
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: true,
    };

    let addr = spawn_api_server(config, state).await.unwrap();
    TestApi { addr, hub, push }
}

#[tokio::test]
async fn test_health_endpoint() {
    let api = spawn_test_api().await;

    let response = reqwest::get(api.url("/api/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_realtime_before_any_reading() {
    let api = spawn_test_api().await;

    let body: Value = reqwest::get(api.url("/api/v1/realtime"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["connected"], false);
    assert!(body["temperature"].is_null());
}

#[tokio::test]
async fn test_post_reading_updates_realtime_and_history() {
    let api = spawn_test_api().await;
    let client = reqwest::Client::new();

    let response = client
        .post(api.url("/api/v1/readings"))
        .json(&json!({ "temperature": 24.5, "humidity": 61.0, "water_temp": 22.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["temperature"], 24.5);

    let realtime: Value = reqwest::get(api.url("/api/v1/realtime"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(realtime["temperature"], 24.5);
    assert_eq!(realtime["humidity"], 61.0);
    assert_eq!(realtime["water_temp"], 22.0);
    assert_eq!(realtime["connected"], true);

    let history: Vec<Value> = reqwest::get(api.url("/api/v1/history?range=hour"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["source"], "http");
}

#[tokio::test]
async fn test_post_reading_accepts_firmware_field_names() {
    let api = spawn_test_api().await;

    let response = reqwest::Client::new()
        .post(api.url("/api/v1/readings"))
        .json(&json!({ "temperatureDHT": 26.0, "humidity": 55.0, "temperatureDS18B20": 21.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let snapshot = api.hub.bridge.snapshot().await;
    assert_eq!(snapshot.temperature, Some(26.0));
    assert_eq!(snapshot.water_temp, Some(21.5));
}

#[tokio::test]
async fn test_post_reading_rejects_invalid_body() {
    let api = spawn_test_api().await;
    let client = reqwest::Client::new();

    for body in [
        json!({ "temperature": 24.5, "humidity": 61.0 }),
        json!({ "temperature": "warm", "humidity": 61.0, "water_temp": 22.0 }),
    ] {
        let response = client
            .post(api.url("/api/v1/readings"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: Value = response.json().await.unwrap();
        assert!(error["error"].is_string());
    }

    assert!(api.hub.bridge.snapshot().await.temperature.is_none());
}

#[tokio::test]
async fn test_history_unknown_range_falls_back_to_minute() {
    let api = spawn_test_api().await;

    let response = reqwest::get(api.url("/api/v1/history?range=century"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let history: Vec<Value> = response.json().await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_device_registration_lifecycle() {
    let api = spawn_test_api().await;
    let client = reqwest::Client::new();

    let response = client
        .post(api.url("/api/v1/devices"))
        .json(&json!({ "token": TOKEN_A }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "success": true, "message": "Device registered for notifications" })
    );

    let devices: Value = reqwest::get(api.url("/api/v1/devices"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(devices, json!({ "devices": [TOKEN_A], "count": 1 }));

    let response = client
        .delete(api.url("/api/v1/devices"))
        .json(&json!({ "token": TOKEN_A }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Device unregistered");

    let response = client
        .delete(api.url("/api/v1/devices"))
        .json(&json!({ "token": TOKEN_A }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Device not found");
}

#[tokio::test]
async fn test_device_registration_errors() {
    let api = spawn_test_api().await;
    let client = reqwest::Client::new();

    let cases = [
        (json!({}), "Push token is required"),
        (json!({ "token": "" }), "Push token is required"),
        (json!({ "token": "not-a-push-token" }), "Invalid push token"),
    ];

    for (body, message) in cases {
        let response = client
            .post(api.url("/api/v1/devices"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: Value = response.json().await.unwrap();
        assert_eq!(error["error"], message);
    }

    assert!(api.hub.alerts.list_devices().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_posted_reading_triggers_alerts_and_reset() {
    let api = spawn_test_api().await;
    let client = reqwest::Client::new();
    let reading = json!({ "temperature": 40.0, "humidity": 60.0, "water_temp": 24.0 });

    client
        .post(api.url("/api/v1/devices"))
        .json(&json!({ "token": TOKEN_A }))
        .send()
        .await
        .unwrap();

    client
        .post(api.url("/api/v1/readings"))
        .json(&reading)
        .send()
        .await
        .unwrap();
    wait_for_pushed(&api.push, 3).await;

    let response = client
        .post(api.url("/api/v1/devices/reset"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    client
        .post(api.url("/api/v1/readings"))
        .json(&reading)
        .send()
        .await
        .unwrap();
    wait_for_pushed(&api.push, 6).await;
}

#[tokio::test]
async fn test_websocket_streams_readings() {
    let api = spawn_test_api().await;

    let (mut socket, _) = connect_async(format!("ws://{}/api/v1/stream", api.addr))
        .await
        .unwrap();

    let next_json = |message: Message| -> Value {
        match message {
            Message::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("unexpected message: {other:?}"),
        }
    };

    let greeting = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(next_json(greeting), json!({ "type": "connected" }));

    reqwest::Client::new()
        .post(api.url("/api/v1/readings"))
        .json(&json!({ "temperature": 24.5, "humidity": 61.0, "water_temp": 22.0 }))
        .send()
        .await
        .unwrap();

    let reading = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let reading = next_json(reading);
    assert_eq!(reading["type"], "reading");
    assert_eq!(reading["temperature"], 24.5);
    assert_eq!(reading["humidity"], 61.0);
    assert_eq!(reading["water_temp"], 22.0);
    assert!(reading["id"].is_string());
    assert!(reading["timestamp"].is_string());
}
