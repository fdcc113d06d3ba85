use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{info, warn};

// ── Device Event Types ────────────────────────────────────────

/// A structured event payload delivered to the notification channel.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceEvent {
    /// Event type identifier, e.g. "device_registered".
    pub event_type: String,
    /// ISO-8601 timestamp of when the event occurred.
    pub timestamp: String,
    /// The device the event concerns.
    pub device_id: String,
    /// Subject line, for channels that display one.
    pub subject: String,
    /// Human-readable message body. For registrations this carries the
    /// capability links.
    pub message: String,
}

impl DeviceEvent {
    pub fn device_registered(device_id: &str, message: &str) -> Self {
        Self {
            event_type: "device_registered".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            device_id: device_id.to_string(),
            subject: "devgate alert: new device registered".to_string(),
            message: message.to_string(),
        }
    }
}

// ── HMAC Signing ─────────────────────────────────────────────

/// Compute HMAC-SHA256 of `payload` using `secret`.
/// Returns lowercase hex digest (e.g. "sha256=<hex>").
fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    let result = mac.finalize();
    let bytes = result.into_bytes();
    format!("sha256={}", hex::encode(bytes))
}

// ── Webhook Notifier ──────────────────────────────────────────

/// Dispatches device events to one or more configured URLs.
/// Supports:
/// - HMAC-SHA256 signing (x-devgate-signature header)
/// - Up to 3 retries with exponential back-off (1s → 5s → 25s)
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("devgate-webhook/1.0")
                .build()
                .expect("failed to build webhook HTTP client"),
        }
    }

    /// Send a signed device event to a single URL with retry.
    ///
    /// If `signing_secret` is `Some`, the request body is signed with
    /// HMAC-SHA256 and the signature is sent in the `x-devgate-signature`
    /// header. Returns `Ok(())` if delivery succeeded on any attempt.
    pub async fn send_signed(
        &self,
        url: &str,
        event: &DeviceEvent,
        signing_secret: Option<&str>,
    ) -> Result<()> {
        let payload = serde_json::to_vec(event)
            .map_err(|e| anyhow::anyhow!("webhook serialize error: {}", e))?;
        let delivery_id = uuid::Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = signing_secret.map(|s| hmac_sha256_hex(s, &payload));

        let backoff_secs: &[u64] = &[0, 1, 5, 25];

        for (attempt, &delay) in backoff_secs.iter().enumerate() {
            if delay > 0 {
                tracing::debug!(
                    url,
                    attempt,
                    delay_secs = delay,
                    event_type = %event.event_type,
                    "retrying webhook delivery"
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }

            let mut req = self
                .client
                .post(url)
                .header("content-type", "application/json")
                .header("x-devgate-delivery-id", &delivery_id)
                .header("x-devgate-timestamp", &timestamp)
                .header("x-devgate-event", &event.event_type);

            if let Some(ref sig) = signature {
                req = req.header("x-devgate-signature", sig.as_str());
            }

            let result = req.body(payload.clone()).send().await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    info!(
                        url,
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        attempt,
                        status = %resp.status(),
                        "webhook delivered successfully"
                    );
                    return Ok(());
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    warn!(
                        url,
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        attempt,
                        status = %status,
                        body = %body,
                        "webhook delivery failed (non-2xx), will retry"
                    );
                }
                Err(e) => {
                    warn!(
                        url,
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        attempt,
                        error = %e,
                        "webhook request error, will retry"
                    );
                }
            }
        }

        // All attempts exhausted
        warn!(
            url,
            event_type = %event.event_type,
            delivery_id = %delivery_id,
            "webhook delivery failed after all retries"
        );
        Err(anyhow::anyhow!(
            "webhook delivery failed after 3 retries: {}",
            url
        ))
    }

    /// Dispatch an event to all configured URLs without blocking the caller.
    ///
    /// Each URL gets its own delivery task with independent retry; a failure
    /// on one never blocks the others, and the caller never sees a delivery
    /// error — fire-and-forget beyond the call returning. Retries therefore
    /// never stall the request that triggered the event.
    pub fn dispatch(&self, urls: &[String], signing_secret: Option<&str>, event: DeviceEvent) {
        for url in urls {
            let notifier = self.clone();
            let url = url.clone();
            let event = event.clone();
            let signing_secret = signing_secret.map(String::from);
            tokio::spawn(async move {
                if let Err(e) = notifier
                    .send_signed(&url, &event, signing_secret.as_deref())
                    .await
                {
                    warn!(url, error = %e, "dropping undeliverable webhook event");
                }
            });
        }
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_registered_event_has_correct_fields() {
        let event = DeviceEvent::device_registered("dev-123", "hello operator");
        assert_eq!(event.event_type, "device_registered");
        assert_eq!(event.device_id, "dev-123");
        assert_eq!(event.message, "hello operator");
        assert!(!event.timestamp.is_empty());
    }

    #[test]
    fn hmac_signature_is_stable_and_prefixed() {
        let a = hmac_sha256_hex("secret", b"payload");
        let b = hmac_sha256_hex("secret", b"payload");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256="));
        // 32-byte digest → 64 hex chars
        assert_eq!(a.len(), "sha256=".len() + 64);

        let c = hmac_sha256_hex("other-secret", b"payload");
        assert_ne!(a, c);
    }
}
