use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Request-level failures.
///
/// Every authentication failure is collapsed to `Unauthorized` before it
/// reaches this type: the response is identical whether the token was
/// missing, expired, tampered with, or bound to another action or device.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request")]
    InvalidRequest,

    #[error("unauthorized")]
    Unauthorized,

    #[error("server misconfigured: {0}")]
    ServerMisconfigured(&'static str),

    #[error("store error: {0}")]
    Store(anyhow::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            AppError::InvalidRequest => (StatusCode::BAD_REQUEST, "Invalid request"),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized. Invalid token in request",
            ),
            AppError::ServerMisconfigured(what) => {
                tracing::error!("server misconfigured: {}", what);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Invalid server params or request",
                )
            }
            AppError::Store(e) => {
                tracing::error!("device store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Device store unavailable")
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "statusCode": status.as_u16(),
            "body": msg,
        }));

        (status, body).into_response()
    }
}
