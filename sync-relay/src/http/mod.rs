//! HTTP endpoints for the shadow relay.
//!
//! `/ws` upgrades to a peer session; `/health` and `/metrics` report on
//! the hub.

pub mod health;
mod metrics;

use crate::server::ShadowRelay;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;
use axum::{routing::get, Extension, Router};
use std::sync::Arc;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<ShadowRelay>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(Extension(relay))
}

/// Upgrade to a WebSocket and hand the socket to a session.
async fn ws_handler(
    Extension(relay): Extension<Arc<ShadowRelay>>,
    ws: WebSocketUpgrade,
) -> Response {
    let limit = relay.config().hub.max_message_bytes;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| async move {
            relay.handle_socket(socket).await;
        })
}
