//! devgate — capability-token gateway for out-of-band device approval.
//!
//! Library crate so integration tests in `tests/` can drive the router and
//! the token protocol directly; the binary in `main.rs` wires everything to
//! config, Postgres and the HTTP listener.

use std::sync::Arc;

pub mod api;
pub mod capability;
pub mod cli;
pub mod config;
pub mod errors;
pub mod issuer;
pub mod models;
pub mod notification;
pub mod store;

use notification::webhook::WebhookNotifier;
use store::DeviceStore;

/// Shared application state passed to handlers.
pub struct AppState {
    pub store: Arc<dyn DeviceStore>,
    pub notifier: WebhookNotifier,
    pub config: config::Config,
}
