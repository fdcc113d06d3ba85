//! End-to-end tests for the registration trigger: link minting, fail-closed
//! behavior without a secret, and webhook delivery (against a wiremock
//! server).

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{post_json, send, test_config, test_state, MemStore, TEST_SECRET};
use devgate::capability::{self, Action};

async fn mock_channel() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

/// Delivery runs on a spawned task, so poll the mock server until the
/// expected number of requests has arrived (bounded at two seconds).
async fn delivered_requests(server: &MockServer, expected: usize) -> Vec<wiremock::Request> {
    for _ in 0..100 {
        let requests = server.received_requests().await.unwrap();
        if requests.len() >= expected {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.received_requests().await.unwrap()
}

fn extract_token(message: &str, device_id: &str, action: &str) -> String {
    let marker = format!("/devices/{}/{}?token=", device_id, action);
    let start = message.find(&marker).unwrap() + marker.len();
    let rest = &message[start..];
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    urlencoding::decode(&rest[..end]).unwrap().into_owned()
}

#[tokio::test]
async fn registration_notifies_with_three_verifiable_links() {
    let channel = mock_channel().await;
    let mut config = test_config(Some(TEST_SECRET));
    config.webhook_urls = vec![channel.uri()];
    let state = test_state(Arc::new(MemStore::default()), config);

    let (status, body) = send(
        state,
        post_json(
            "/devices",
            json!({ "deviceId": "dev-9", "name": "gate cam", "type": "camera" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["body"], "OK");

    let requests = delivered_requests(&channel, 1).await;
    assert_eq!(requests.len(), 1);
    let event: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(event["event_type"], "device_registered");
    assert_eq!(event["device_id"], "dev-9");

    let message = event["message"].as_str().unwrap();
    assert!(message.contains("deviceId: dev-9"));
    assert!(message.contains("gate cam"));
    assert!(message.contains("camera"));

    // Each embedded token verifies for exactly its own (device, action) pair.
    let now = Utc::now();
    for action in Action::ALL {
        let token = extract_token(message, "dev-9", action.as_str());
        let claims = capability::verify(TEST_SECRET, &token, "dev-9", action, now).unwrap();
        assert_eq!(claims.device_id, "dev-9");
        assert_eq!(claims.action, action);
    }
}

#[tokio::test]
async fn registration_without_secret_still_notifies_but_omits_links() {
    let channel = mock_channel().await;
    let mut config = test_config(None);
    config.webhook_urls = vec![channel.uri()];
    let state = test_state(Arc::new(MemStore::default()), config);

    let (status, _) = send(state, post_json("/devices", json!({ "deviceId": "dev-9" }))).await;
    assert_eq!(status, StatusCode::OK);

    let requests = delivered_requests(&channel, 1).await;
    assert_eq!(requests.len(), 1);
    let event: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let message = event["message"].as_str().unwrap();
    assert!(message.contains("deviceId: dev-9"));
    // Fail closed: no secret, no links.
    assert!(!message.contains("token="));
}

#[tokio::test]
async fn registration_defaults_missing_name_and_type_to_empty() {
    let channel = mock_channel().await;
    let mut config = test_config(Some(TEST_SECRET));
    config.webhook_urls = vec![channel.uri()];
    let state = test_state(Arc::new(MemStore::default()), config);

    let (status, _) = send(state, post_json("/devices", json!({ "deviceId": "dev-9" }))).await;
    assert_eq!(status, StatusCode::OK);

    let requests = delivered_requests(&channel, 1).await;
    let event: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let message = event["message"].as_str().unwrap();
    assert!(message.contains("type:     \n"));
    assert!(message.contains("name:     \n"));
}

#[tokio::test]
async fn registration_without_device_id_is_rejected_and_not_published() {
    let channel = mock_channel().await;
    let mut config = test_config(Some(TEST_SECRET));
    config.webhook_urls = vec![channel.uri()];
    let state = test_state(Arc::new(MemStore::default()), config);

    for body in [json!({}), json!({ "deviceId": "" }), json!({ "name": "x" })] {
        let (status, resp) = send(state.clone(), post_json("/devices", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["body"], "Invalid request");
    }

    // Give any stray spawned delivery a moment to land before asserting
    // nothing was published.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let requests = channel.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn registration_without_channel_is_server_error() {
    // No webhook URLs configured at all.
    let state = test_state(Arc::new(MemStore::default()), test_config(Some(TEST_SECRET)));

    let (status, body) = send(state, post_json("/devices", json!({ "deviceId": "dev-9" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["body"], "Invalid server params or request");
}

#[tokio::test]
async fn deliveries_are_signed_when_a_webhook_secret_is_set() {
    let channel = mock_channel().await;
    let mut config = test_config(Some(TEST_SECRET));
    config.webhook_urls = vec![channel.uri()];
    config.webhook_secret = Some("channel-signing-secret".to_string());
    let state = test_state(Arc::new(MemStore::default()), config);

    send(state, post_json("/devices", json!({ "deviceId": "dev-9" }))).await;

    let requests = delivered_requests(&channel, 1).await;
    assert_eq!(requests.len(), 1);
    let sig = requests[0]
        .headers
        .get("x-devgate-signature")
        .expect("delivery should be signed")
        .to_str()
        .unwrap();
    assert!(sig.starts_with("sha256="));
    let event_header = requests[0]
        .headers
        .get("x-devgate-event")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(event_header, "device_registered");
}

#[tokio::test]
async fn registration_responds_before_slow_delivery_completes() {
    let channel = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&channel)
        .await;

    let mut config = test_config(Some(TEST_SECRET));
    config.webhook_urls = vec![channel.uri()];
    let state = test_state(Arc::new(MemStore::default()), config);

    // Delivery runs off the request path: the endpoint must answer long
    // before the channel acknowledges (or retries, on a dead channel).
    let (status, body) = tokio::time::timeout(
        Duration::from_secs(2),
        send(state, post_json("/devices", json!({ "deviceId": "dev-9" }))),
    )
    .await
    .expect("registration must not wait on webhook delivery");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["body"], "OK");

    // The event was still handed to the channel.
    let requests = delivered_requests(&channel, 1).await;
    assert_eq!(requests.len(), 1);
}
