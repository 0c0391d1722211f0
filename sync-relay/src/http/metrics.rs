//! Prometheus metrics endpoint.

use crate::server::ShadowRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<ShadowRelay>>) -> impl IntoResponse {
    let body = render(&relay);
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

fn render(relay: &ShadowRelay) -> String {
    let hub = relay.hub();
    let m = hub.metrics();

    // Gauges
    let peers = hub.peer_count();
    let sessions = relay.session_count();

    // Counters
    let conns_total = m.connections_total.load(Ordering::Relaxed);
    let messages = m.messages_relayed.load(Ordering::Relaxed);
    let bytes = m.bytes_relayed.load(Ordering::Relaxed);
    let failures = m.write_failures.load(Ordering::Relaxed);
    let pruned = m.peers_pruned.load(Ordering::Relaxed);

    format!(
        r#"# HELP shadow_relay_peers_active Number of registered peers
# TYPE shadow_relay_peers_active gauge
shadow_relay_peers_active {peers}

# HELP shadow_relay_sessions_active Number of live session tasks
# TYPE shadow_relay_sessions_active gauge
shadow_relay_sessions_active {sessions}

# HELP shadow_relay_info Server information
# TYPE shadow_relay_info gauge
shadow_relay_info{{version="{version}"}} 1

# HELP shadow_relay_connections_total Total peers admitted
# TYPE shadow_relay_connections_total counter
shadow_relay_connections_total {conns_total}

# HELP shadow_relay_messages_relayed_total Total frames received and fanned out
# TYPE shadow_relay_messages_relayed_total counter
shadow_relay_messages_relayed_total {messages}

# HELP shadow_relay_bytes_relayed_total Total bytes written to peers
# TYPE shadow_relay_bytes_relayed_total counter
shadow_relay_bytes_relayed_total {bytes}

# HELP shadow_relay_write_failures_total Total peer writes that failed or timed out
# TYPE shadow_relay_write_failures_total counter
shadow_relay_write_failures_total {failures}

# HELP shadow_relay_peers_pruned_total Total peers dropped after a failed write
# TYPE shadow_relay_peers_pruned_total counter
shadow_relay_peers_pruned_total {pruned}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}
