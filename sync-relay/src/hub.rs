//! The relay hub: peer registry and fan-out.
//!
//! The hub forwards every text frame from one peer to all other registered
//! peers, byte for byte. It keeps no history; a peer that joins late sees
//! the session-options control frame and whatever arrives afterwards.
//!
//! Registry access and socket writes are decoupled. A broadcast copies the
//! current peer handles out of the registry, then writes to all of them
//! concurrently with a per-peer deadline. Peers whose write fails or times
//! out are removed once the broadcast has finished, and their eviction
//! token is cancelled so the owning session stops at once.

use crate::error::{HubError, PeerWriteError};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::future::join_all;
use shadow_sync_types::ControlMessage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One frame queued for a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Text message, relayed unchanged.
    Text(Arc<str>),
    /// Keepalive ping.
    Ping,
}

/// Write half of a peer connection.
#[async_trait]
pub trait PeerSink: Send + Sync + 'static {
    /// Write one frame to the peer.
    async fn write(&self, frame: OutboundFrame) -> Result<(), PeerWriteError>;
}

/// Registry handle for a connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Operational counters for the hub.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Peers admitted.
    pub connections_total: AtomicU64,
    /// Frames received from peers and fanned out.
    pub messages_relayed: AtomicU64,
    /// Bytes written to peers, counted once per recipient.
    pub bytes_relayed: AtomicU64,
    /// Individual peer writes that failed or timed out.
    pub write_failures: AtomicU64,
    /// Peers removed after a failed write.
    pub peers_pruned: AtomicU64,
}

/// What one broadcast did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers the frame was written to.
    pub delivered: usize,
    /// Peers removed because their write failed.
    pub pruned: Vec<PeerId>,
}

struct Registered {
    sink: Arc<dyn PeerSink>,
    evicted: CancellationToken,
}

/// Peer registry and broadcaster for one shadow session.
pub struct Hub {
    read_only_joiners: AtomicBool,
    write_timeout: Duration,
    peers: DashMap<PeerId, Registered>,
    next_id: AtomicU64,
    metrics: HubMetrics,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("read_only_joiners", &self.read_only_joiners())
            .field("write_timeout", &self.write_timeout)
            .field("peers", &self.peers.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl Hub {
    /// Create a hub announcing `read_only_joiners` to every peer.
    pub fn new(read_only_joiners: bool, write_timeout: Duration) -> Self {
        Self {
            read_only_joiners: AtomicBool::new(read_only_joiners),
            write_timeout,
            peers: DashMap::new(),
            next_id: AtomicU64::new(1),
            metrics: HubMetrics::default(),
        }
    }

    /// Current value of the read-only option.
    pub fn read_only_joiners(&self) -> bool {
        self.read_only_joiners.load(Ordering::SeqCst)
    }

    /// Change the option announced to peers admitted from now on.
    pub fn set_read_only_joiners(&self, value: bool) {
        self.read_only_joiners.store(value, Ordering::SeqCst);
    }

    /// The control frame each peer receives on admission.
    pub fn session_options_frame(&self) -> String {
        ControlMessage::ReadOnlyJoiners(self.read_only_joiners()).encode()
    }

    /// Send the session options to a new peer, then register it.
    ///
    /// The peer is not registered if the options cannot be delivered, so
    /// the control frame always precedes any relayed traffic.
    pub async fn admit(&self, sink: Arc<dyn PeerSink>) -> Result<PeerId, HubError> {
        let options: Arc<str> = Arc::from(self.session_options_frame());
        self.write_with_deadline(sink.as_ref(), OutboundFrame::Text(options))
            .await
            .map_err(HubError::Handshake)?;

        let id = PeerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.peers.insert(
            id,
            Registered {
                sink,
                evicted: CancellationToken::new(),
            },
        );
        self.metrics.connections_total.fetch_add(1, Ordering::Relaxed);
        tracing::info!("{} joined ({} connected)", id, self.peers.len());
        Ok(id)
    }

    /// Remove a peer. Returns false if it was already gone.
    pub fn unregister(&self, id: PeerId) -> bool {
        match self.peers.remove(&id) {
            Some((_, peer)) => {
                peer.evicted.cancel();
                tracing::info!("{} left ({} connected)", id, self.peers.len());
                true
            }
            None => false,
        }
    }

    /// Token cancelled when `id` leaves the registry.
    ///
    /// Already cancelled if the peer is not registered.
    pub fn eviction_token(&self, id: PeerId) -> CancellationToken {
        match self.peers.get(&id) {
            Some(peer) => peer.evicted.clone(),
            None => {
                let token = CancellationToken::new();
                token.cancel();
                token
            }
        }
    }

    /// Forward `text` from `sender` to every other registered peer.
    pub async fn broadcast(&self, sender: PeerId, text: &str) -> BroadcastReport {
        let targets: Vec<(PeerId, Arc<dyn PeerSink>)> = self
            .peers
            .iter()
            .filter(|entry| *entry.key() != sender)
            .map(|entry| (*entry.key(), Arc::clone(&entry.value().sink)))
            .collect();

        self.metrics.messages_relayed.fetch_add(1, Ordering::Relaxed);
        if targets.is_empty() {
            return BroadcastReport::default();
        }

        let frame: Arc<str> = Arc::from(text);
        let writes = targets.iter().map(|(id, sink)| {
            let frame = OutboundFrame::Text(Arc::clone(&frame));
            async move { (*id, self.write_with_deadline(sink.as_ref(), frame).await) }
        });
        let results = join_all(writes).await;

        let mut report = BroadcastReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => {
                    report.delivered += 1;
                    self.metrics
                        .bytes_relayed
                        .fetch_add(text.len() as u64, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::warn!("Dropping {}: {}", id, e);
                    self.metrics.write_failures.fetch_add(1, Ordering::Relaxed);
                    report.pruned.push(id);
                }
            }
        }

        for id in &report.pruned {
            if let Some((_, peer)) = self.peers.remove(id) {
                peer.evicted.cancel();
                self.metrics.peers_pruned.fetch_add(1, Ordering::Relaxed);
            }
        }

        tracing::debug!(
            "Relayed {} bytes from {} to {}/{} peers",
            text.len(),
            sender,
            report.delivered,
            targets.len()
        );
        report
    }

    /// Write a frame to one peer, bounded by the hub's write timeout.
    pub async fn write_with_deadline(
        &self,
        sink: &dyn PeerSink,
        frame: OutboundFrame,
    ) -> Result<(), PeerWriteError> {
        match tokio::time::timeout(self.write_timeout, sink.write(frame)).await {
            Ok(result) => result,
            Err(_) => Err(PeerWriteError::TimedOut(self.write_timeout)),
        }
    }

    /// Deadline applied to each peer write.
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Whether `id` is still registered.
    pub fn is_registered(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    /// Number of registered peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Operational counters.
    pub fn metrics(&self) -> &HubMetrics {
        &self.metrics
    }
}
