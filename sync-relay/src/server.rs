//! Relay server coordination.
//!
//! `ShadowRelay` owns the hub, the configuration, and the lifetime of every
//! session task. `serve` runs the HTTP listener until shutdown is requested,
//! then waits for all sessions to finish.

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::http::{self, health};
use crate::hub::Hub;
use crate::session::{run_session, SessionEnd, SessionTimers};
use axum::extract::ws::WebSocket;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// The relay server.
pub struct ShadowRelay {
    config: Config,
    hub: Arc<Hub>,
    shutdown: CancellationToken,
    sessions: TaskTracker,
}

impl std::fmt::Debug for ShadowRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowRelay")
            .field("config", &self.config)
            .field("hub", &self.hub)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl ShadowRelay {
    /// Create a relay from its configuration.
    pub fn new(config: Config) -> Self {
        health::init_start_time();
        let hub = Hub::new(config.session.read_only_joiners, config.hub.write_timeout());
        Self {
            config,
            hub: Arc::new(hub),
            shutdown: CancellationToken::new(),
            sessions: TaskTracker::new(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the hub.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Token cancelled when the relay shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ask the listener and every session to stop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Number of live session tasks.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drive one upgraded connection until it ends.
    pub async fn handle_socket(&self, socket: WebSocket) -> Option<SessionEnd> {
        let timers = SessionTimers::from(&self.config.hub);
        let session = run_session(
            Arc::clone(&self.hub),
            socket,
            timers,
            self.shutdown.clone(),
        );
        self.sessions.track_future(session).await
    }

    /// Serve HTTP and WebSocket traffic on `listener` until shutdown.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!("Relay listening on {}", addr);

        let router = http::build_router(Arc::clone(&self));
        let token = self.shutdown.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;

        // Upgraded sockets outlive the HTTP server; wait for them separately
        self.shutdown.cancel();
        self.sessions.close();
        self.sessions.wait().await;
        tracing::info!("Relay stopped");
        Ok(())
    }
}

/// Bind the first free port in `[port, port + span]` of `address`.
///
/// Port 0 asks the OS for any free port.
pub async fn bind_listener(address: &str, span: u16) -> Result<TcpListener> {
    let base: SocketAddr = address.parse().map_err(|e: std::net::AddrParseError| {
        RelayError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        }
    })?;

    if base.port() == 0 {
        return Ok(TcpListener::bind(base).await?);
    }

    let first = base.port();
    let last = first.saturating_add(span);
    for port in first..=last {
        let candidate = SocketAddr::new(base.ip(), port);
        match TcpListener::bind(candidate).await {
            Ok(listener) => {
                if port != first {
                    tracing::info!("Port {} busy, using {}", first, port);
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!("Port {} in use", port);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(RelayError::NoFreePort { first, last })
}
