use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::capability::{self, Action};
use crate::errors::AppError;
use crate::issuer::{self, DeviceInfo};
use crate::notification::webhook::DeviceEvent;
use crate::AppState;

// ── Request DTOs ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterDeviceRequest {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub device_type: String,
}

#[derive(Deserialize)]
pub struct ActionParams {
    pub token: Option<String>,
}

/// The `{statusCode, body}` envelope every endpoint answers with.
fn envelope(status: StatusCode, body: &str) -> impl IntoResponse {
    (status, Json(json!({ "statusCode": status.as_u16(), "body": body })))
}

// ── Handlers ─────────────────────────────────────────────────

/// POST /devices — device-registration trigger.
///
/// Mints the three capability links (when a signing secret is configured)
/// and hands the assembled notification to the webhook channel. The device
/// record itself is created by the registration pipeline upstream of this
/// endpoint.
pub async fn register_device(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<RegisterDeviceRequest>>,
) -> Result<impl IntoResponse, AppError> {
    // A missing body, unparseable JSON, or absent deviceId all surface here
    // as `None`.
    let Some(Json(payload)) = payload else {
        return Err(AppError::InvalidRequest);
    };
    if payload.device_id.is_empty() {
        return Err(AppError::InvalidRequest);
    }
    if state.config.webhook_urls.is_empty() {
        return Err(AppError::ServerMisconfigured(
            "DEVGATE_WEBHOOK_URLS is not set",
        ));
    }

    let device = DeviceInfo {
        device_id: payload.device_id,
        name: payload.name,
        device_type: payload.device_type,
    };

    // Fail closed: without a signing secret the notification goes out with
    // no management links at all.
    let links = match state.config.signing_secret() {
        Some(secret) => Some(
            issuer::mint_action_links(
                secret,
                &state.config.public_url,
                &device.device_id,
                chrono::Utc::now(),
                state.config.token_ttl_secs,
            )
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token minting failed: {}", e)))?,
        ),
        None => {
            tracing::warn!(
                device_id = %device.device_id,
                "no signing secret configured, notifying without management links"
            );
            None
        }
    };

    let message = issuer::registration_message(&device, links.as_ref());
    let event = DeviceEvent::device_registered(&device.device_id, &message);
    // Delivery happens off the request path; retries never stall the caller.
    state.notifier.dispatch(
        &state.config.webhook_urls,
        state.config.webhook_secret.as_deref(),
        event,
    );

    tracing::info!(device_id = %device.device_id, "device registration notification dispatched");
    Ok(envelope(StatusCode::OK, "OK"))
}

/// GET /devices/:device_id/:action — verify a capability token and apply the
/// state transition.
///
/// The checks run in a fixed order and the first failure is terminal:
/// path shape (400), secret configured (500), token present / signed /
/// unexpired / correctly bound (401, undifferentiated), then the store
/// write. The transition only runs once every gate has passed.
pub async fn device_action(
    State(state): State<Arc<AppState>>,
    Path((device_id, action)): Path<(String, String)>,
    params: Option<Query<ActionParams>>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Path well-formedness. Unknown actions never reach token handling.
    let action: Action = action.parse().map_err(|_| AppError::InvalidRequest)?;

    // 2. Without a secret no token could ever have been issued, let alone
    //    verified.
    let Some(secret) = state.config.signing_secret() else {
        return Err(AppError::ServerMisconfigured("DEVGATE_TOKEN_SECRET is not set"));
    };

    // 3–4. Token presence, signature, expiry, binding. Every failure maps to
    //      the same 401; the reason stays in the logs.
    let token = params
        .as_ref()
        .and_then(|q| q.token.as_deref())
        .unwrap_or_default();
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    let claims = capability::verify(secret, token, &device_id, action, chrono::Utc::now())
        .map_err(|reason| {
            tracing::debug!(device_id = %device_id, action = %action, ?reason, "token rejected");
            AppError::Unauthorized
        })?;

    // 5. Apply the transition. Missing records are a no-op by store contract,
    //    so replays and double-clicks converge instead of erroring.
    match action.target_status() {
        Some(status) => state.store.update_status(&claims.device_id, status).await,
        None => state.store.delete(&claims.device_id).await,
    }
    .map_err(AppError::Store)?;

    tracing::info!(device_id = %device_id, action = %action, "device action applied");
    Ok(envelope(StatusCode::OK, "OK"))
}

/// Any path outside the device endpoints.
pub async fn invalid_path() -> AppError {
    AppError::InvalidRequest
}
