//! Per-path debouncing of outbound sends.
//!
//! Each path has at most one pending task. Scheduling again aborts the
//! previous task and starts a fresh delay, so a burst of writes turns
//! into one send once the path has been quiet for the configured delay.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Debug)]
struct Pending {
    generation: u64,
    handle: AbortHandle,
}

type PendingTable = Arc<Mutex<HashMap<PathBuf, Pending>>>;

/// Table of scheduled per-path tasks.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: PendingTable,
    generation: AtomicU64,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

fn lock(table: &PendingTable) -> MutexGuard<'_, HashMap<PathBuf, Pending>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Debouncer {
    /// Create a debouncer whose tasks run on `tracker` and stop with `cancel`.
    pub fn new(delay: Duration, tracker: TaskTracker, cancel: CancellationToken) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            tracker,
            cancel,
        }
    }

    /// Run `action` after the delay unless `key` is scheduled again first.
    pub fn schedule<F, Fut>(&self, key: PathBuf, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay;
        let cancel = self.cancel.clone();
        let table = Arc::clone(&self.pending);
        let task_key = key.clone();

        let mut pending = lock(&self.pending);
        if let Some(previous) = pending.remove(&key) {
            previous.handle.abort();
        }

        let handle = self.tracker.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            {
                let mut pending = lock(&table);
                match pending.get(&task_key) {
                    Some(p) if p.generation == generation => {
                        pending.remove(&task_key);
                    }
                    _ => return,
                }
            }
            action().await;
        });

        pending.insert(
            key,
            Pending {
                generation,
                handle: handle.abort_handle(),
            },
        );
    }

    /// Abort every pending task.
    pub fn cancel_all(&self) {
        let mut pending = lock(&self.pending);
        for (_, p) in pending.drain() {
            p.handle.abort();
        }
    }

    /// Number of paths waiting for their delay to expire.
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }
}
