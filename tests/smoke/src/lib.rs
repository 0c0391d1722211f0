//! # smoke-tests
//!
//! End-to-end scenarios for shadow.
//!
//! Every scenario runs a real relay on a loopback port and connects real
//! sync engines to it over WebSocket, each scoped to its own temporary
//! directory:
//! - `session` - snapshot delivery, rename behavior, read-only joiners
//! - `filtering` - ignored paths never leave the host
//! - `content` - near-limit files, live edits, echo suppression
//! - `hub` - a stuck peer does not hold up the others

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assertions;
pub mod harness;

pub mod scenarios;
