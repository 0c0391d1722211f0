//! End-to-end scenarios.
//!
//! - `session` - initial snapshot, rename behavior, read-only joiners
//! - `filtering` - ignored paths stay on the host
//! - `content` - large files, live edits, echo suppression
//! - `hub` - broadcast isolation from a stuck peer

pub mod content;
pub mod filtering;
pub mod hub;
pub mod session;

/// Shared secret used by every scenario.
pub const KEY: &str = "smoke-test-key";
