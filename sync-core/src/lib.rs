//! # sync-core
//!
//! Pure logic for shadow (no I/O, instant tests).
//!
//! This crate holds the decisions the sync engine makes about paths and
//! content without touching the network or the disk:
//!
//! - [`ignore`] - the always-on hardcoded ignore rule
//! - [`path`] - wire path validation and root scoping
//! - [`hash`] - content digests used for echo suppression
//! - [`link`] - session URLs carrying the shared secret in their fragment
//!
//! The actual I/O (filesystem watching, git queries, sockets) is performed
//! by `sync-client`, which feeds paths and bytes through these functions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hash;
pub mod ignore;
pub mod link;
pub mod path;

pub use hash::ContentHash;
pub use ignore::is_hardcoded_ignored;
pub use link::{append_key_fragment, normalize_session_url, LinkError, SessionLink};
pub use path::{editor_shadow_target, relative_to_root, validate_relative, PathError, RelPath};
