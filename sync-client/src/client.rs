//! SyncClient - the per-peer sync engine for shadow.
//!
//! One engine runs per relay connection. It watches the shared root,
//! sends local changes, and applies remote ones.
//!
//! # Architecture
//!
//! ```text
//! notify event → debounce → filter → hash-dedupe → encode/seal → Transport
//! Transport → decode/open → validate → filter → atomic write → ledger
//! ```
//!
//! The hash ledger records the digest of the last version of each path
//! that was sent or applied. Applying a remote file updates the ledger,
//! so the watcher event caused by that write finds an unchanged hash and
//! nothing is echoed back.
//!
//! # Example
//!
//! ```ignore
//! use shadow_sync_client::{SyncClient, SyncConfig, WsTransport};
//!
//! let transport = WsTransport::connect("ws://localhost:8080/ws").await?;
//! let config = SyncConfig::new("/srv/project").with_secret(key).as_host();
//! let client = SyncClient::new(transport, config)?;
//!
//! client.start().await?;
//! let sent = client.send_initial_snapshot().await?;
//! client.closed().await;
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use notify::{EventKind, RecursiveMode, Watcher};
use shadow_sync_core::{
    editor_shadow_target, is_hardcoded_ignored, relative_to_root, validate_relative, ContentHash,
    PathError, RelPath,
};
use shadow_sync_types::{
    ControlMessage, FilePayload, Frame, FrameError, MAX_SYNCED_FILE_BYTES,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use walkdir::WalkDir;

use crate::crypto::{Codec, CryptoError};
use crate::debounce::Debouncer;
use crate::fs::{atomic_write_file, resolve_within};
use crate::ignore::{is_ignored_inbound, OutboundIgnore};
use crate::transport::{Transport, TransportError};

/// Default per-path debounce delay.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

const WATCH_REMEDIATION: &str = "this filesystem does not support change notifications; \
     run `mkdir -p /tmp/shadow && cd /tmp/shadow` and start the session from there";

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Malformed wire frame.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Inbound path failed validation.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// File content above the synced-file ceiling.
    #[error("{path} too large: {size} bytes (limit: {limit} bytes)")]
    TooLarge {
        /// Relative path.
        path: String,
        /// Observed size.
        size: u64,
        /// Maximum allowed size.
        limit: usize,
    },

    /// Plaintext frame received while a shared secret is configured.
    #[error("plaintext frame rejected: session is end-to-end encrypted")]
    PlaintextRejected,

    /// Encrypted frame received without a shared secret.
    #[error("encrypted frame received but no E2E key is configured")]
    MissingKey,

    /// Filesystem watch could not be registered.
    #[error("cannot watch {}: {reason} ({remediation})", path.display())]
    WatchFailed {
        /// Directory that could not be watched.
        path: PathBuf,
        /// Underlying watcher error.
        reason: String,
        /// What the user can do about it.
        remediation: &'static str,
    },

    /// The shared root cannot be used.
    #[error("cannot use {} as shared root: {source}", path.display())]
    BaseDir {
        /// Configured root.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Filesystem error for one file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `start()` called twice.
    #[error("engine already started")]
    AlreadyStarted,
}

/// Configuration for SyncClient.
#[derive(Clone)]
pub struct SyncConfig {
    /// Directory the engine is scoped to.
    pub base_dir: PathBuf,
    /// When set, only this file name inside `base_dir` is synced.
    pub single_file: Option<String>,
    /// Shared secret. `None` runs the legacy plaintext protocol.
    pub secret: Option<String>,
    /// Hosts ignore the read-only control option.
    pub is_host: bool,
    /// Per-path debounce delay.
    pub debounce: Duration,
}

impl SyncConfig {
    /// Create a configuration scoped to `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            single_file: None,
            secret: None,
            is_host: false,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Scope to a shared path: a directory, or a single file inside its parent.
    pub fn for_share_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        if meta.is_dir() {
            return Ok(Self::new(path));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "share path has no file name")
            })?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self::new(parent).with_single_file(name))
    }

    /// Set the shared secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Restrict syncing to one file name inside the root.
    pub fn with_single_file(mut self, name: impl Into<String>) -> Self {
        self.single_file = Some(name.into());
        self
    }

    /// Run as the sharing host.
    pub fn as_host(mut self) -> Self {
        self.is_host = true;
        self
    }

    /// Set the debounce delay.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }
}

// Don't leak the secret in debug output
impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("base_dir", &self.base_dir)
            .field("single_file", &self.single_file)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("is_host", &self.is_host)
            .field("debounce", &self.debounce)
            .finish()
    }
}

/// Why an outbound change was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A remote change is being written to disk.
    ApplyingRemote,
    /// The host made joiners read-only.
    ReadOnly,
    /// Path is outside the shared root.
    OutsideRoot,
    /// Single-file session and this is another file.
    NotSharedFile,
    /// Matched an ignore rule.
    Ignored,
    /// Directory, socket, or other non-regular file.
    NotRegularFile,
    /// Vanished before it could be read.
    Missing,
    /// Same content as the last version sent or applied.
    Unchanged,
}

/// Result of [`SyncClient::send_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Frame handed to the transport.
    Sent(RelPath),
    /// Nothing sent.
    Skipped(SkipReason),
}

/// Result of [`SyncClient::handle_incoming`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// File written to disk.
    Applied(RelPath),
    /// Session option taken over.
    Control(ControlMessage),
    /// Control frame not recognised, or not applicable to this peer.
    ControlIgnored,
    /// Path filtered by the hardcoded rule.
    Ignored(RelPath),
    /// Single-file session and the frame names another file.
    NotSharedFile(RelPath),
}

struct ApplyGuard<'a>(&'a AtomicBool);

impl<'a> ApplyGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Inner<T: Transport> {
    transport: T,
    base_dir: PathBuf,
    single_file: Option<String>,
    is_host: bool,
    codec: Option<Codec>,
    outbound: OutboundIgnore,
    ledger: DashMap<String, ContentHash>,
    applying: AtomicBool,
    read_only: AtomicBool,
    started: AtomicBool,
    debouncer: Debouncer,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

/// The per-peer sync engine.
pub struct SyncClient<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for SyncClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> SyncClient<T> {
    /// Create an engine over an open transport.
    ///
    /// Fails when the secret is blank or the root is not a directory.
    pub fn new(transport: T, config: SyncConfig) -> Result<Self, ClientError> {
        let codec = config.secret.as_deref().map(Codec::new).transpose()?;

        let base_dir = config
            .base_dir
            .canonicalize()
            .map_err(|source| ClientError::BaseDir {
                path: config.base_dir.clone(),
                source,
            })?;
        if !base_dir.is_dir() {
            return Err(ClientError::BaseDir {
                path: config.base_dir,
                source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
            });
        }

        let outbound = OutboundIgnore::new(&base_dir);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let debouncer = Debouncer::new(config.debounce, tracker.clone(), cancel.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                base_dir,
                single_file: config.single_file,
                is_host: config.is_host,
                codec,
                outbound,
                ledger: DashMap::new(),
                applying: AtomicBool::new(false),
                read_only: AtomicBool::new(false),
                started: AtomicBool::new(false),
                debouncer,
                cancel,
                tracker,
            }),
        })
    }

    /// Register the filesystem watch and spawn the event and read loops.
    ///
    /// A watch that cannot be registered is fatal for the session.
    pub async fn start(&self) -> Result<(), ClientError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let watch_failed = |e: notify::Error| ClientError::WatchFailed {
            path: self.inner.base_dir.clone(),
            reason: e.to_string(),
            remediation: WATCH_REMEDIATION,
        };
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })
        .map_err(watch_failed)?;

        let mode = if self.inner.single_file.is_some() {
            RecursiveMode::NonRecursive
        } else {
            RecursiveMode::Recursive
        };
        watcher
            .watch(&self.inner.base_dir, mode)
            .map_err(watch_failed)?;
        tracing::info!("Watching {}", self.inner.base_dir.display());

        let inner = Arc::clone(&self.inner);
        self.inner.tracker.spawn(async move {
            // The watcher stops when dropped at the end of this task
            let _watcher = watcher;
            inner.event_loop(rx).await;
        });

        let inner = Arc::clone(&self.inner);
        self.inner.tracker.spawn(async move {
            inner.read_loop().await;
        });

        Ok(())
    }

    /// Send the current version of `path` unless a skip rule applies.
    pub async fn send_file(&self, path: &Path) -> Result<SendOutcome, ClientError> {
        self.inner.send_file(path).await
    }

    /// Decode and apply one wire frame.
    pub async fn handle_incoming(&self, text: &str) -> Result<InboundOutcome, ClientError> {
        self.inner.handle_incoming(text).await
    }

    /// Send every eligible file under the root. Returns the number sent.
    pub async fn send_initial_snapshot(&self) -> Result<usize, ClientError> {
        self.inner.send_initial_snapshot().await
    }

    /// Whether joiner edits are currently suppressed.
    pub fn is_read_only(&self) -> bool {
        !self.inner.is_host && self.inner.read_only.load(Ordering::SeqCst)
    }

    /// Canonical shared root.
    pub fn base_dir(&self) -> &Path {
        &self.inner.base_dir
    }

    /// Whether git ignore rules filter outbound paths.
    pub fn gitignore_enabled(&self) -> bool {
        self.inner.outbound.has_git()
    }

    /// Token cancelled when the session ends.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Wait until the connection closes or [`SyncClient::shutdown`] is called.
    pub async fn closed(&self) {
        self.inner.cancel.cancelled().await;
    }

    /// Stop the watcher, read loop and pending sends, then close the transport.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.inner.cancel.cancel();
        self.inner.debouncer.cancel_all();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.transport.close().await?;
        Ok(())
    }

    /// Get the transport (for testing).
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }
}

impl<T: Transport> Inner<T> {
    fn relative(&self, path: &Path) -> Option<String> {
        relative_to_root(&self.base_dir, path)
    }

    fn is_shared_file(&self, rel: &str) -> bool {
        match &self.single_file {
            Some(name) => rel == name,
            None => true,
        }
    }

    async fn outbound_ignored(self: &Arc<Self>, rel: &str, is_dir: bool) -> bool {
        if is_hardcoded_ignored(rel) {
            return true;
        }
        if !self.outbound.has_git() {
            return false;
        }
        let inner = Arc::clone(self);
        let rel = rel.to_string();
        tokio::task::spawn_blocking(move || inner.outbound.is_ignored(&rel, is_dir))
            .await
            .unwrap_or(false)
    }

    async fn send_file(self: &Arc<Self>, path: &Path) -> Result<SendOutcome, ClientError> {
        if self.applying.load(Ordering::SeqCst) {
            return Ok(SendOutcome::Skipped(SkipReason::ApplyingRemote));
        }
        if !self.is_host && self.read_only.load(Ordering::SeqCst) {
            return Ok(SendOutcome::Skipped(SkipReason::ReadOnly));
        }

        let Some(rel) = self.relative(path) else {
            return Ok(SendOutcome::Skipped(SkipReason::OutsideRoot));
        };
        if !self.is_shared_file(&rel) {
            return Ok(SendOutcome::Skipped(SkipReason::NotSharedFile));
        }
        let rel = validate_relative(&rel)?;

        // Symlinks are not followed, same as the snapshot walk
        let meta = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SendOutcome::Skipped(SkipReason::Missing));
            }
            Err(e) => return Err(e.into()),
        };
        if self.outbound_ignored(rel.as_str(), meta.is_dir()).await {
            return Ok(SendOutcome::Skipped(SkipReason::Ignored));
        }
        if !meta.is_file() {
            return Ok(SendOutcome::Skipped(SkipReason::NotRegularFile));
        }
        if meta.len() > MAX_SYNCED_FILE_BYTES as u64 {
            return Err(ClientError::TooLarge {
                path: rel.to_string(),
                size: meta.len(),
                limit: MAX_SYNCED_FILE_BYTES,
            });
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SendOutcome::Skipped(SkipReason::Missing));
            }
            Err(e) => return Err(e.into()),
        };
        if bytes.len() > MAX_SYNCED_FILE_BYTES {
            return Err(ClientError::TooLarge {
                path: rel.to_string(),
                size: bytes.len() as u64,
                limit: MAX_SYNCED_FILE_BYTES,
            });
        }

        let hash = ContentHash::of(&bytes);
        if self.ledger.insert(rel.to_string(), hash) == Some(hash) {
            tracing::debug!("Skipping {}: hash unchanged", rel);
            return Ok(SendOutcome::Skipped(SkipReason::Unchanged));
        }

        let payload = FilePayload::new(rel.as_str(), &bytes);
        let frame = match &self.codec {
            Some(codec) => Frame::Encrypted(codec.encrypt(payload.encode().as_bytes())?),
            None => Frame::File(payload),
        };

        if let Err(e) = self.transport.send(&frame.encode()).await {
            // Let a later event for the same content try again
            self.ledger.remove_if(rel.as_str(), |_, h| *h == hash);
            return Err(e.into());
        }

        tracing::info!("-> {} ({} bytes)", rel, bytes.len());
        Ok(SendOutcome::Sent(rel))
    }

    async fn handle_incoming(self: &Arc<Self>, text: &str) -> Result<InboundOutcome, ClientError> {
        let payload = match Frame::decode(text)? {
            Frame::Control(body) => return Ok(self.apply_control(&body)),
            Frame::Encrypted(sealed) => {
                let codec = self.codec.as_ref().ok_or(ClientError::MissingKey)?;
                let plaintext = codec.decrypt(&sealed)?;
                let plaintext = String::from_utf8(plaintext)
                    .map_err(|e| FrameError::InvalidEncoding(e.to_string()))?;
                FilePayload::parse(&plaintext)?
            }
            Frame::File(payload) => {
                if self.codec.is_some() {
                    return Err(ClientError::PlaintextRejected);
                }
                payload
            }
        };

        let rel = validate_relative(payload.path())?;
        if is_ignored_inbound(rel.as_str()) {
            tracing::debug!("Dropping inbound {}: ignored", rel);
            return Ok(InboundOutcome::Ignored(rel));
        }
        if !self.is_shared_file(rel.as_str()) {
            return Ok(InboundOutcome::NotSharedFile(rel));
        }

        let bytes = payload
            .decode_content(MAX_SYNCED_FILE_BYTES)
            .map_err(|e| match e {
                FrameError::TooLarge { size, limit } => ClientError::TooLarge {
                    path: rel.to_string(),
                    size: size as u64,
                    limit,
                },
                other => ClientError::Frame(other),
            })?;
        let hash = ContentHash::of(&bytes);
        let root = self.base_dir.clone();
        let dest = rel.to_path(&self.base_dir);
        let len = bytes.len();

        {
            let _applying = ApplyGuard::engage(&self.applying);
            let written = tokio::task::spawn_blocking(move || -> std::io::Result<bool> {
                match resolve_within(&root, &dest)? {
                    Some(target) => atomic_write_file(&target, &bytes).map(|()| true),
                    None => Ok(false),
                }
            })
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))??;
            if !written {
                tracing::warn!("Dropping inbound {}: resolves outside the shared root", rel);
                return Err(PathError::OutsideRoot(rel.to_string()).into());
            }
            self.ledger.insert(rel.to_string(), hash);
        }

        tracing::info!("<- {} ({} bytes)", rel, len);
        Ok(InboundOutcome::Applied(rel))
    }

    fn apply_control(&self, body: &str) -> InboundOutcome {
        match ControlMessage::parse(body) {
            Some(ControlMessage::ReadOnlyJoiners(flag)) if !self.is_host => {
                self.read_only.store(flag, Ordering::SeqCst);
                if flag {
                    tracing::info!("Host made this session read-only; local edits will not be sent");
                }
                InboundOutcome::Control(ControlMessage::ReadOnlyJoiners(flag))
            }
            Some(_) => InboundOutcome::ControlIgnored,
            None => {
                tracing::warn!("Ignoring unrecognized control message: {}", body);
                InboundOutcome::ControlIgnored
            }
        }
    }

    /// Regular files under the root, skipping ignored directories.
    fn snapshot_candidates(&self) -> Vec<PathBuf> {
        if let Some(name) = &self.single_file {
            return vec![self.base_dir.join(name)];
        }
        self.walk_files(&self.base_dir)
    }

    fn walk_files(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                match self.relative(entry.path()) {
                    Some(rel) => !self.outbound.is_ignored(&rel, true),
                    None => false,
                }
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    }

    async fn send_initial_snapshot(self: &Arc<Self>) -> Result<usize, ClientError> {
        let inner = Arc::clone(self);
        let candidates = tokio::task::spawn_blocking(move || inner.snapshot_candidates())
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

        let mut sent = 0;
        for path in candidates {
            match self.send_file(&path).await {
                Ok(SendOutcome::Sent(_)) => sent += 1,
                Ok(SendOutcome::Skipped(reason)) => {
                    tracing::debug!("Snapshot skipped {}: {:?}", path.display(), reason);
                }
                Err(ClientError::Transport(e)) => return Err(e.into()),
                Err(e) => tracing::warn!("Snapshot skipped {}: {}", path.display(), e),
            }
        }
        tracing::info!("Initial snapshot sent {} files", sent);
        Ok(sent)
    }

    async fn event_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => tracing::warn!("Watcher error: {}", e),
                    None => break,
                },
            }
        }
        self.debouncer.cancel_all();
        tracing::debug!("Event loop stopped");
    }

    fn handle_event(self: &Arc<Self>, event: notify::Event) {
        let scan_dirs = match event.kind {
            EventKind::Create(_) | EventKind::Modify(notify::event::ModifyKind::Name(_)) => true,
            EventKind::Modify(_) => false,
            EventKind::Remove(_) => {
                for path in &event.paths {
                    tracing::debug!("Removal of {} is not propagated", path.display());
                }
                return;
            }
            _ => return,
        };

        for path in event.paths {
            self.handle_changed_path(path, scan_dirs);
        }
    }

    fn handle_changed_path(self: &Arc<Self>, path: PathBuf, scan_dirs: bool) {
        let path = match editor_shadow_target(&path) {
            Some(target) if target.exists() => target,
            Some(_) => return,
            None => path,
        };
        let Some(rel) = self.relative(&path) else {
            return;
        };
        if is_hardcoded_ignored(&rel) {
            return;
        }

        if path.is_dir() {
            if scan_dirs && self.single_file.is_none() {
                self.schedule_directory(path);
            }
            return;
        }
        self.schedule_send(path);
    }

    fn schedule_send(self: &Arc<Self>, path: PathBuf) {
        let inner = Arc::clone(self);
        let target = path.clone();
        self.debouncer.schedule(path, move || async move {
            match inner.send_file(&target).await {
                Ok(_) => {}
                Err(ClientError::TooLarge { path, size, limit }) => {
                    tracing::warn!("File {} too large ({} bytes, limit {})", path, size, limit);
                }
                Err(e) => tracing::warn!("Failed to send {}: {}", target.display(), e),
            }
        });
    }

    /// Files inside a new directory may predate the watch on it.
    fn schedule_directory(self: &Arc<Self>, dir: PathBuf) {
        let inner = Arc::clone(self);
        self.tracker.spawn(async move {
            let walker = Arc::clone(&inner);
            let files = match tokio::task::spawn_blocking(move || walker.walk_files(&dir)).await {
                Ok(files) => files,
                Err(e) => {
                    tracing::warn!("Directory scan failed: {}", e);
                    return;
                }
            };
            for file in files {
                inner.schedule_send(file);
            }
        });
    }

    async fn read_loop(self: Arc<Self>) {
        loop {
            let received = tokio::select! {
                _ = self.cancel.cancelled() => break,
                received = self.transport.recv() => received,
            };

            match received {
                Ok(Some(text)) => match self.handle_incoming(&text).await {
                    Ok(InboundOutcome::Applied(_)) | Ok(InboundOutcome::Control(_)) => {}
                    Ok(other) => tracing::debug!("Inbound frame not applied: {:?}", other),
                    Err(e) => tracing::warn!("Dropping inbound frame: {}", e),
                },
                Ok(None) => {
                    tracing::info!("Connection closed by relay");
                    break;
                }
                Err(e) => {
                    tracing::warn!("Connection lost: {}", e);
                    break;
                }
            }
        }
        self.cancel.cancel();
    }
}
