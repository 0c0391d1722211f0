//! Broadcast isolation with a peer that stops reading.

use async_trait::async_trait;
use shadow_sync_relay::{OutboundFrame, PeerSink, PeerWriteError};
use std::sync::atomic::{AtomicBool, Ordering};

/// A peer that accepts the session options and then never completes a write.
#[derive(Debug, Default)]
pub struct StalledPeer {
    greeted: AtomicBool,
}

#[async_trait]
impl PeerSink for StalledPeer {
    async fn write(&self, _frame: OutboundFrame) -> Result<(), PeerWriteError> {
        if !self.greeted.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        std::future::pending().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::{eventually, file_becomes};
    use crate::harness::SmokeHarness;
    use crate::scenarios::KEY;
    use shadow_sync_relay::Config;
    use std::fs;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stalled_peer_does_not_block_delivery() {
        let mut config = Config::default();
        config.hub.write_timeout_secs = 3;
        let harness = SmokeHarness::with_config(config).await.unwrap();
        let host_dir = tempdir().unwrap();
        let joiner_dir = tempdir().unwrap();
        fs::write(host_dir.path().join("a.txt"), "hi").unwrap();

        let host = harness.host(host_dir.path(), KEY).await.unwrap();
        let stalled = harness.hub().admit(Arc::new(StalledPeer::default())).await.unwrap();
        let joiner = harness.joiner(joiner_dir.path(), KEY).await.unwrap();

        let started = Instant::now();
        host.client.send_initial_snapshot().await.unwrap();
        assert!(file_becomes(&joiner.path("a.txt"), b"hi").await);
        assert!(started.elapsed() < Duration::from_secs(2));

        // The stalled peer is dropped once its write deadline passes
        assert!(eventually(Duration::from_secs(6), || !harness.hub().is_registered(stalled)).await);
        assert_eq!(harness.hub().peer_count(), 2);

        fs::write(host.path("b.txt"), "after").unwrap();
        assert!(file_becomes(&joiner.path("b.txt"), b"after").await);

        joiner.stop().await;
        host.stop().await;
        harness.stop().await;
    }
}
