//! Smoke test harness: a loopback relay plus engines connected to it.

use shadow_sync_client::{ClientError, SyncClient, SyncConfig, TransportError, WsTransport};
use shadow_sync_relay::{bind_listener, Config, Hub, RelayError, ShadowRelay};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::assertions::{eventually, SYNC_WINDOW};

/// Errors that can occur while setting up a scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Relay failed to start.
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    /// Engine could not be created or started.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// WebSocket connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A condition did not hold in time.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// General I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A relay running on an ephemeral loopback port.
pub struct SmokeHarness {
    relay: Arc<ShadowRelay>,
    addr: SocketAddr,
    server: JoinHandle<Result<(), RelayError>>,
}

/// One connected engine and the directory it is scoped to.
pub struct Peer {
    /// The running engine.
    pub client: SyncClient<WsTransport>,
    /// Directory the engine syncs.
    pub root: PathBuf,
}

impl Peer {
    /// Path of `rel` inside this peer's directory.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Stop the engine.
    pub async fn stop(self) {
        if let Err(e) = self.client.shutdown().await {
            tracing::debug!("peer shutdown: {}", e);
        }
    }
}

impl SmokeHarness {
    /// Start a relay with default settings.
    pub async fn start() -> Result<Self, HarnessError> {
        Self::with_config(Config::default()).await
    }

    /// Start a relay that makes joiners read-only.
    pub async fn read_only() -> Result<Self, HarnessError> {
        let mut config = Config::default();
        config.session.read_only_joiners = true;
        Self::with_config(config).await
    }

    /// Start a relay with `config`, ignoring its bind address.
    pub async fn with_config(config: Config) -> Result<Self, HarnessError> {
        let listener = bind_listener("127.0.0.1:0", 0).await?;
        let addr = listener.local_addr()?;
        let relay = Arc::new(ShadowRelay::new(config));
        let server = tokio::spawn(Arc::clone(&relay).serve(listener));
        Ok(Self {
            relay,
            addr,
            server,
        })
    }

    /// WebSocket endpoint of the relay.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// The relay's hub.
    pub fn hub(&self) -> &Arc<Hub> {
        self.relay.hub()
    }

    /// Frames the hub has fanned out so far.
    pub fn messages_relayed(&self) -> u64 {
        self.hub().metrics().messages_relayed.load(Ordering::Relaxed)
    }

    /// Connect a host engine sharing `root`.
    pub async fn host(&self, root: &Path, key: &str) -> Result<Peer, HarnessError> {
        self.connect(SyncConfig::new(root).with_secret(key).as_host())
            .await
    }

    /// Connect a joiner engine syncing into `root`.
    pub async fn joiner(&self, root: &Path, key: &str) -> Result<Peer, HarnessError> {
        self.connect(SyncConfig::new(root).with_secret(key)).await
    }

    /// Connect an engine and wait until the hub has registered it.
    pub async fn connect(&self, config: SyncConfig) -> Result<Peer, HarnessError> {
        let expected = self.hub().peer_count() + 1;
        let root = config.base_dir.clone();
        let transport = WsTransport::connect(&self.ws_url()).await?;
        let client = SyncClient::new(transport, config)?;
        client.start().await?;
        self.wait_for_peers(expected).await?;
        Ok(Peer { client, root })
    }

    /// Wait until exactly `n` peers are registered.
    pub async fn wait_for_peers(&self, n: usize) -> Result<(), HarnessError> {
        if eventually(SYNC_WINDOW, || self.hub().peer_count() == n).await {
            Ok(())
        } else {
            Err(HarnessError::Timeout(format!(
                "{} peers (have {})",
                n,
                self.hub().peer_count()
            )))
        }
    }

    /// Wait until `peer` has taken over the read-only option.
    pub async fn wait_for_read_only(&self, peer: &Peer) -> Result<(), HarnessError> {
        if eventually(SYNC_WINDOW, || peer.client.is_read_only()).await {
            Ok(())
        } else {
            Err(HarnessError::Timeout("read-only control message".to_string()))
        }
    }

    /// Stop the relay and wait for it to exit.
    pub async fn stop(self) {
        self.relay.shutdown();
        match tokio::time::timeout(Duration::from_secs(5), self.server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::warn!("relay exited with error: {}", e),
            Ok(Err(e)) => tracing::warn!("relay task failed: {}", e),
            Err(_) => tracing::warn!("relay did not stop in time"),
        }
    }
}
