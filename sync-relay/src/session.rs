//! Per-connection session handling.
//!
//! Each upgraded WebSocket gets one session task. The session admits the
//! peer into the hub, relays its text frames, pings it on a fixed interval,
//! and drops it once it has been silent past the idle timeout. A session
//! also ends as soon as the hub prunes its peer.

use crate::config::HubConfig;
use crate::error::PeerWriteError;
use crate::hub::{Hub, OutboundFrame, PeerId, PeerSink};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Write half of an upgraded WebSocket.
pub struct WsPeer {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsPeer {
    /// Wrap the write half of a socket.
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Send a close frame, giving up after `deadline`.
    ///
    /// A peer that stopped reading never drains the socket, so the send
    /// must not be awaited unbounded.
    async fn close(&self, deadline: Duration) -> bool {
        let send = async {
            let mut sink = self.sink.lock().await;
            sink.send(Message::Close(None)).await.is_ok()
        };
        tokio::time::timeout(deadline, send).await.unwrap_or(false)
    }
}

#[async_trait]
impl PeerSink for WsPeer {
    async fn write(&self, frame: OutboundFrame) -> Result<(), PeerWriteError> {
        let message = match frame {
            OutboundFrame::Text(text) => Message::Text(text.to_string()),
            OutboundFrame::Ping => Message::Ping(Vec::new()),
        };
        let mut sink = self.sink.lock().await;
        sink.send(message)
            .await
            .map_err(|e| PeerWriteError::Io(e.to_string()))
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed the connection.
    Closed,
    /// Nothing received within the idle timeout.
    IdleTimeout,
    /// A keepalive ping could not be written.
    KeepaliveFailed,
    /// The hub dropped the peer after a failed broadcast write.
    Pruned,
    /// Reading from the socket failed.
    ReadError,
    /// The relay is shutting down.
    Shutdown,
}

/// Timing for one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimers {
    /// Interval between pings.
    pub keepalive: Duration,
    /// Silence after which the peer is dropped.
    pub idle: Duration,
}

impl From<&HubConfig> for SessionTimers {
    fn from(config: &HubConfig) -> Self {
        Self {
            keepalive: config.keepalive_interval(),
            idle: config.idle_timeout(),
        }
    }
}

/// Run one peer connection to completion.
pub async fn run_session(
    hub: Arc<Hub>,
    socket: WebSocket,
    timers: SessionTimers,
    shutdown: CancellationToken,
) -> Option<SessionEnd> {
    let (sink, stream) = socket.split();
    let peer = Arc::new(WsPeer::new(sink));

    let id = match hub.admit(peer.clone()).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Rejected connection: {}", e);
            return None;
        }
    };

    let evicted = hub.eviction_token(id);
    let end = relay_frames(&hub, id, &peer, stream, timers, &shutdown, &evicted).await;
    hub.unregister(id);
    if !peer.close(hub.write_timeout()).await {
        tracing::debug!("{} did not take the close frame", id);
    }
    tracing::debug!("{} session ended: {:?}", id, end);
    Some(end)
}

async fn relay_frames(
    hub: &Hub,
    id: PeerId,
    peer: &Arc<WsPeer>,
    mut stream: SplitStream<WebSocket>,
    timers: SessionTimers,
    shutdown: &CancellationToken,
    evicted: &CancellationToken,
) -> SessionEnd {
    let mut keepalive = tokio::time::interval_at(Instant::now() + timers.keepalive, timers.keepalive);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let idle = tokio::time::sleep(timers.idle);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return SessionEnd::Shutdown,
            _ = evicted.cancelled() => return SessionEnd::Pruned,
            _ = &mut idle => {
                tracing::info!("{} idle for {:?}, disconnecting", id, timers.idle);
                return SessionEnd::IdleTimeout;
            }
            _ = keepalive.tick() => {
                if let Err(e) = hub.write_with_deadline(peer.as_ref(), OutboundFrame::Ping).await {
                    tracing::debug!("{} keepalive failed: {}", id, e);
                    return SessionEnd::KeepaliveFailed;
                }
            }
            message = stream.next() => {
                idle.as_mut().reset(Instant::now() + timers.idle);
                match message {
                    Some(Ok(Message::Text(text))) => {
                        hub.broadcast(id, &text).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!("{} sent a {} byte binary frame, ignoring", id, data.len());
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Closed,
                    Some(Err(e)) => {
                        tracing::debug!("{} read failed: {}", id, e);
                        return SessionEnd::ReadError;
                    }
                }
            }
        }
    }
}
