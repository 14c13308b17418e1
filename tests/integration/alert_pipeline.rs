//! End-to-end alerting: sensor messages → ingest bridge → alert actor → push API
//!
//! The Expo API is replaced by a wiremock server; everything else is the real
//! pipeline minus the MQTT connection.

use std::time::Duration;

use hydro_monitor::{
    PartialReading, ReadingSource,
    thresholds::{Metric, MetricStatus},
};
use pretty_assertions::assert_eq;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{
    AIR_TOPIC, TOKEN_A, TOKEN_B, WATER_TOPIC, air_payload, mock_expo, pushed_messages, spawn_hub,
    wait_for_pushed, water_payload,
};

#[tokio::test]
async fn test_first_complete_reading_notifies_every_metric() {
    let server = mock_expo().await;
    let hub = spawn_hub(&server);
    assert!(hub.alerts.register(TOKEN_A).await.unwrap());

    // air alone is not a complete reading yet
    hub.bridge
        .handle_message(AIR_TOPIC, &air_payload(40.0, 60.0))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(pushed_messages(&server).await.is_empty());

    hub.bridge
        .handle_message(WATER_TOPIC, &water_payload(24.0))
        .await
        .unwrap();

    let messages = wait_for_pushed(&server, 3).await;
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| m["to"] == TOKEN_A));

    let temperature = messages
        .iter()
        .find(|m| m["data"]["metric"] == "temperature")
        .unwrap();
    assert_eq!(temperature["data"]["status"], "Critical");
    assert_eq!(temperature["title"], "⚠️ Air Temperature Critical!");

    let humidity = messages
        .iter()
        .find(|m| m["data"]["metric"] == "humidity")
        .unwrap();
    assert_eq!(humidity["data"]["status"], "Optimal");

    hub.shutdown().await;
}

#[tokio::test]
async fn test_unchanged_status_is_not_repeated() {
    let server = mock_expo().await;
    let hub = spawn_hub(&server);
    hub.alerts.register(TOKEN_A).await.unwrap();

    hub.bridge
        .handle_message(AIR_TOPIC, &air_payload(40.0, 60.0))
        .await
        .unwrap();
    hub.bridge
        .handle_message(WATER_TOPIC, &water_payload(24.0))
        .await
        .unwrap();
    wait_for_pushed(&server, 3).await;

    // same statuses, well inside the re-alert interval
    hub.bridge
        .handle_message(WATER_TOPIC, &water_payload(24.5))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(pushed_messages(&server).await.len(), 3);

    // temperature recovers
    hub.bridge
        .handle_message(AIR_TOPIC, &air_payload(25.0, 60.0))
        .await
        .unwrap();
    let messages = wait_for_pushed(&server, 4).await;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[3]["data"]["metric"], "temperature");
    assert_eq!(messages[3]["data"]["status"], "Optimal");
    assert_eq!(messages[3]["title"], "✅ Air Temperature Recovered");

    hub.shutdown().await;
}

#[tokio::test]
async fn test_devices_are_debounced_independently() {
    let server = mock_expo().await;
    let hub = spawn_hub(&server);
    let reading = PartialReading {
        temperature: Some(25.0),
        humidity: Some(90.0),
        water_temp: Some(24.0),
    };

    hub.alerts.register(TOKEN_A).await.unwrap();
    hub.bridge.ingest(reading, ReadingSource::Http).await;
    wait_for_pushed(&server, 3).await;

    // a device registered later starts from scratch, the first one stays quiet
    hub.alerts.register(TOKEN_B).await.unwrap();
    hub.bridge.ingest(reading, ReadingSource::Http).await;

    let messages = wait_for_pushed(&server, 6).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(pushed_messages(&server).await.len(), 6);
    assert!(messages[3..].iter().all(|m| m["to"] == TOKEN_B));

    hub.shutdown().await;
}

#[tokio::test]
async fn test_no_devices_means_no_requests() {
    let server = mock_expo().await;
    let hub = spawn_hub(&server);

    hub.bridge
        .ingest(
            PartialReading {
                temperature: Some(40.0),
                humidity: Some(95.0),
                water_temp: Some(35.0),
            },
            ReadingSource::Http,
        )
        .await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.received_requests().await.unwrap_or_default().is_empty());

    hub.shutdown().await;
}

#[tokio::test]
async fn test_reset_all_renotifies_current_status() {
    let server = mock_expo().await;
    let hub = spawn_hub(&server);
    let reading = PartialReading {
        temperature: Some(25.0),
        humidity: Some(60.0),
        water_temp: Some(24.0),
    };

    hub.alerts.register(TOKEN_A).await.unwrap();
    hub.bridge.ingest(reading, ReadingSource::Http).await;
    wait_for_pushed(&server, 3).await;

    hub.alerts.reset_all().await.unwrap();
    hub.bridge.ingest(reading, ReadingSource::Http).await;
    wait_for_pushed(&server, 6).await;

    hub.shutdown().await;
}

#[tokio::test]
async fn test_failed_delivery_does_not_roll_back_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let hub = spawn_hub(&server);
    hub.alerts.register(TOKEN_A).await.unwrap();

    hub.bridge
        .ingest(
            PartialReading {
                temperature: Some(40.0),
                humidity: Some(60.0),
                water_temp: Some(24.0),
            },
            ReadingSource::Http,
        )
        .await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while server.received_requests().await.unwrap_or_default().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("push request was not attempted");

    let device = hub.alerts.get_device(TOKEN_A).await.unwrap().unwrap();
    assert_eq!(
        device.states.get(Metric::Temperature).last_status(),
        Some(MetricStatus::Critical)
    );

    hub.shutdown().await;
}
