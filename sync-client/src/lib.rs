//! # shadow-sync-client
//!
//! The per-peer engine of shadow live file sharing.
//!
//! Every participant (host or joiner) runs one engine per relay
//! connection. The engine watches a shared root, pushes local edits to the
//! relay, and writes files received from other peers.
//!
//! ## Features
//!
//! - **E2E Encryption**: ChaCha20-Poly1305 keyed from a shared secret; the relay sees ciphertext only
//! - **Echo Suppression**: per-path content hash ledger
//! - **Ignore Rules**: hardcoded rules plus the enclosing git repository's ignore rules
//! - **Transport Abstraction**: WebSocket for real sessions, mock for tests
//!
//! ## Example
//!
//! ```ignore
//! use shadow_sync_client::{SyncClient, SyncConfig, WsTransport};
//!
//! let transport = WsTransport::connect("wss://relay.example.com/ws").await?;
//! let client = SyncClient::new(transport, SyncConfig::new(".").with_secret(key))?;
//! client.start().await?;
//! client.closed().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod crypto;
pub mod debounce;
pub mod fs;
pub mod ignore;
pub mod transport;

pub use client::{
    ClientError, InboundOutcome, SendOutcome, SkipReason, SyncClient, SyncConfig,
    DEFAULT_DEBOUNCE,
};
pub use crypto::{generate_share_key, Codec, CryptoError, KEY_SIZE, NONCE_SIZE, SHARE_KEY_BYTES};
pub use debounce::Debouncer;
pub use fs::{atomic_write_file, resolve_within};
pub use ignore::{is_ignored_inbound, GitIgnoreMatcher, OutboundIgnore};
pub use transport::{MockTransport, Transport, TransportError, WsTransport};
