//! # sync-types
//!
//! Wire framing for the shadow live file-sync protocol.
//!
//! Every transport frame is a single text message of the form
//! `<prefix>|<payload>`. The prefix selects one of three channels:
//!
//! - [`CONTROL_CHANNEL`] - session options pushed by the relay on connect
//! - [`ENCRYPTED_CHANNEL`] - an end-to-end sealed [`FilePayload`]
//! - anything else - a legacy plaintext [`FilePayload`] keyed by its path
//!
//! The relay never parses frames; only peers do.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod limits;
mod messages;

pub use envelope::{Frame, CONTROL_CHANNEL, ENCRYPTED_CHANNEL, SEPARATOR};
pub use error::FrameError;
pub use limits::{MAX_INCOMING_MESSAGE_BYTES, MAX_PATH_BYTES, MAX_SYNCED_FILE_BYTES};
pub use messages::{ControlMessage, FilePayload, READ_ONLY_JOINERS_KEY};
