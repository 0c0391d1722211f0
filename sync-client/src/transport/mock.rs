//! Mock transport for testing.
//!
//! Allows queueing inbound frames and capturing sent frames for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// Mock transport for testing.
///
/// `recv()` waits for [`MockTransport::queue_incoming`] rather than
/// returning immediately, so a read loop behaves as it would on a socket.
#[derive(Debug)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    arrived: Arc<Notify>,
}

#[derive(Debug)]
struct MockTransportInner {
    connected: bool,
    sent_frames: Vec<String>,
    receive_queue: VecDeque<String>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
}

impl Default for MockTransportInner {
    fn default() -> Self {
        Self {
            connected: true,
            sent_frames: Vec::new(),
            receive_queue: VecDeque::new(),
            fail_next_send: None,
            fail_next_recv: None,
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner::default())),
            arrived: Arc::new(Notify::new()),
        }
    }
}

impl MockTransport {
    /// Create a new, connected mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a frame to be returned by a pending or future `recv()`.
    pub fn queue_incoming(&self, frame: impl Into<String>) {
        self.lock().receive_queue.push_back(frame.into());
        self.arrived.notify_one();
    }

    /// Get all frames that were sent.
    pub fn sent_frames(&self) -> Vec<String> {
        self.lock().sent_frames.clone()
    }

    /// Get the last frame that was sent.
    pub fn last_sent(&self) -> Option<String> {
        self.lock().sent_frames.last().cloned()
    }

    /// Forget captured frames.
    pub fn clear_sent(&self) {
        self.lock().sent_frames.clear();
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.lock().fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        self.lock().fail_next_recv = Some(error.to_string());
        self.arrived.notify_one();
    }

    /// Simulate the relay closing the connection.
    pub fn disconnect(&self) {
        self.lock().connected = false;
        self.arrived.notify_waiters();
        self.arrived.notify_one();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            arrived: Arc::clone(&self.arrived),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_frames.push(frame.to_string());
        Ok(())
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        loop {
            {
                let mut inner = self.lock();

                if let Some(error) = inner.fail_next_recv.take() {
                    return Err(TransportError::ReceiveFailed(error));
                }
                if let Some(frame) = inner.receive_queue.pop_front() {
                    return Ok(Some(frame));
                }
                if !inner.connected {
                    return Ok(None);
                }
            }
            self.arrived.notified().await;
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.disconnect();
        Ok(())
    }
}
