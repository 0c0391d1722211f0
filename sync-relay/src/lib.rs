//! # shadow-sync-relay
//!
//! WebSocket relay hub for shadow live file sharing.
//!
//! The relay:
//! - Accepts WebSocket connections from peers on `/ws`
//! - Announces the session options to each peer as it joins
//! - Fans every text frame out to all other peers, unchanged
//! - Never sees plaintext when peers use a shared secret
//!
//! ## Architecture
//!
//! ```text
//! Host ──────┐                    ┌── Joiner
//!            │     WebSocket      │
//!            ├───────────────────►│
//!            │                    │
//!        ┌───┴────────────────────┴───┐
//!        │        sync-relay          │
//!        │  ┌─────────────────────┐   │
//!        │  │  Hub (peer registry)│   │
//!        │  └─────────────────────┘   │
//!        └────────────────────────────┘
//! ```
//!
//! ## Endpoints
//!
//! - `/ws` - peer sessions
//! - `/health` - JSON status
//! - `/metrics` - Prometheus counters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod hub;
pub mod server;
pub mod session;

pub use config::{Config, ConfigError, HubConfig, ServerConfig, SessionConfig};
pub use error::{HubError, PeerWriteError, RelayError};
pub use hub::{BroadcastReport, Hub, HubMetrics, OutboundFrame, PeerId, PeerSink};
pub use server::{bind_listener, ShadowRelay};
pub use session::{SessionEnd, SessionTimers, WsPeer};
