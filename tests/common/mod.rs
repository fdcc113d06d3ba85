//! Shared fixtures: an in-memory `DeviceStore` and an `AppState` builder.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::Mutex;
use tower::ServiceExt;

use devgate::config::Config;
use devgate::models::device::DeviceStatus;
use devgate::notification::webhook::WebhookNotifier;
use devgate::store::DeviceStore;
use devgate::AppState;

pub const TEST_SECRET: &str = "integration-test-secret";

/// In-memory store with the same semantics the Postgres store has: updating
/// or deleting an unknown device is a silent no-op.
#[derive(Default)]
pub struct MemStore {
    devices: Mutex<HashMap<String, DeviceStatus>>,
}

impl MemStore {
    pub async fn seed(&self, device_id: &str, status: DeviceStatus) {
        self.devices
            .lock()
            .await
            .insert(device_id.to_string(), status);
    }

    pub async fn status_of(&self, device_id: &str) -> Option<DeviceStatus> {
        self.devices.lock().await.get(device_id).copied()
    }
}

#[async_trait]
impl DeviceStore for MemStore {
    async fn update_status(&self, device_id: &str, status: DeviceStatus) -> anyhow::Result<()> {
        let mut devices = self.devices.lock().await;
        if let Some(s) = devices.get_mut(device_id) {
            *s = status;
        }
        Ok(())
    }

    async fn delete(&self, device_id: &str) -> anyhow::Result<()> {
        self.devices.lock().await.remove(device_id);
        Ok(())
    }
}

pub fn test_config(secret: Option<&str>) -> Config {
    Config {
        port: 0,
        database_url: String::new(),
        token_secret: secret.map(String::from),
        public_url: "http://gate.test".into(),
        webhook_urls: vec![],
        webhook_secret: None,
        token_ttl_secs: 600,
    }
}

pub fn test_state(store: Arc<MemStore>, config: Config) -> Arc<AppState> {
    Arc::new(AppState {
        store,
        notifier: WebhookNotifier::new(),
        config,
    })
}

/// Run one request through the router and return (status, parsed body).
pub async fn send(
    state: Arc<AppState>,
    request: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let app = devgate::api::app(state);
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(path: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
