use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub mod handlers;

/// Build the application router. Middleware layers (tracing, request ids,
/// security headers) are added by the caller in `main.rs`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        // Device-registration trigger → Issuer
        .route(
            "/devices",
            post(handlers::register_device).fallback(handlers::invalid_path),
        )
        // Action links → Verifier/Executor
        .route(
            "/devices/:device_id/:action",
            get(handlers::device_action).fallback(handlers::invalid_path),
        )
        // Any other path or method is a malformed action request, rejected
        // before any token handling.
        .fallback(handlers::invalid_path)
        .with_state(state)
}
