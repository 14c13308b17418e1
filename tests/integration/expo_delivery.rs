//! Chunked delivery against a mocked Expo push endpoint

use hydro_monitor::{
    config::PushConfig,
    notifications::{ExpoPushClient, PushMessage, build_message, deliver},
    thresholds::{Metric, MetricStatus},
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{PUSH_PATH, TOKEN_A, mock_expo, push_config};

fn messages(count: usize) -> Vec<PushMessage> {
    (0..count)
        .map(|i| {
            build_message(
                &format!("ExponentPushToken[device{i:02}]"),
                Metric::Humidity,
                90.0,
                MetricStatus::Critical,
            )
        })
        .collect()
}

fn client(config: PushConfig) -> ExpoPushClient {
    ExpoPushClient::new(&config).expect("client builds")
}

#[tokio::test]
async fn test_batch_is_split_into_chunks() {
    let server = mock_expo().await;
    let client = client(PushConfig {
        chunk_size: 2,
        ..push_config(&server)
    });

    let report = deliver(&client, messages(5)).await;
    assert_eq!(report.chunks_sent, 3);
    assert_eq!(report.chunks_failed, 0);

    let sizes: Vec<usize> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.body_json::<Vec<serde_json::Value>>().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![2, 2, 1]);
}

#[tokio::test]
async fn test_message_wire_format() {
    let server = mock_expo().await;
    let client = client(push_config(&server));

    let batch = vec![build_message(TOKEN_A, Metric::WaterTemp, 31.5, MetricStatus::Critical)];
    deliver(&client, batch).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let body: Vec<serde_json::Value> = requests[0].body_json().unwrap();
    assert_eq!(body[0]["to"], TOKEN_A);
    assert_eq!(body[0]["sound"], "default");
    assert_eq!(body[0]["priority"], "high");
    assert_eq!(body[0]["data"]["metric"], "waterTemp");
    assert_eq!(body[0]["data"]["value"], 31.5);
}

#[tokio::test]
async fn test_access_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(PushConfig {
        access_token: Some("secret-token".to_string()),
        ..push_config(&server)
    });

    let report = deliver(&client, messages(1)).await;
    assert_eq!(report.chunks_sent, 1);
}

#[tokio::test]
async fn test_failed_chunk_does_not_stop_the_rest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "status": "ok", "id": "t" }] })),
        )
        .mount(&server)
        .await;

    let client = client(PushConfig {
        chunk_size: 2,
        ..push_config(&server)
    });

    let report = deliver(&client, messages(5)).await;
    assert_eq!(report.chunks_failed, 1);
    assert_eq!(report.chunks_sent, 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_rejected_tickets_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "status": "ok", "id": "t1" },
                {
                    "status": "error",
                    "message": "not a registered push notification recipient",
                    "details": { "error": "DeviceNotRegistered" }
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = client(push_config(&server));

    let report = deliver(&client, messages(2)).await;
    assert_eq!(report.chunks_sent, 1);
    assert_eq!(report.rejected_tickets(), 1);
}

#[tokio::test]
async fn test_unparseable_response_counts_as_failed_chunk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client(push_config(&server));

    let report = deliver(&client, messages(1)).await;
    assert_eq!(report.chunks_failed, 1);
    assert!(report.tickets.is_empty());
}
