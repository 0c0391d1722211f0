//! Transport abstraction for shadow.
//!
//! The sync engine talks to the relay through a text-frame transport:
//! - `send()` transmits one wire frame
//! - `recv()` waits for the next text frame, `None` once the peer closed
//! - `close()` gracefully terminates
//!
//! [`WsTransport`] is the WebSocket client used in production;
//! [`MockTransport`] captures and injects frames for tests.

mod mock;
mod ws;

pub use mock::MockTransport;
pub use ws::WsTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Transport trait for exchanging wire frames with the relay.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send one text frame.
    async fn send(&self, frame: &str) -> Result<(), TransportError>;

    /// Receive the next text frame.
    ///
    /// Blocks until a frame arrives. Returns `Ok(None)` once the
    /// connection has closed.
    async fn recv(&self) -> Result<Option<String>, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}
