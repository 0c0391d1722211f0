//! Polling helpers for asynchronous outcomes.

use std::path::Path;
use std::time::Duration;

/// How often conditions are polled.
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Default time allowed for a change to propagate.
pub const SYNC_WINDOW: Duration = Duration::from_secs(5);

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually<F: FnMut() -> bool>(timeout: Duration, mut check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Whether `path` holds exactly `expected` within the sync window.
pub async fn file_becomes(path: &Path, expected: &[u8]) -> bool {
    eventually(SYNC_WINDOW, || {
        std::fs::read(path)
            .map(|bytes| bytes == expected)
            .unwrap_or(false)
    })
    .await
}

/// Whether `path` is still missing after waiting `settle`.
pub async fn stays_absent(path: &Path, settle: Duration) -> bool {
    tokio::time::sleep(settle).await;
    !path.exists()
}
