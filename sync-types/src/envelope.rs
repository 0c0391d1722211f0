//! Channel envelope around every wire message.
//!
//! A frame is `<prefix>|<payload>`, split at the first separator. The
//! relay forwards frames byte-for-byte; only peers call [`Frame::decode`].

use crate::error::FrameError;
use crate::messages::FilePayload;

/// Prefix of the control channel (session options pushed by the relay).
pub const CONTROL_CHANNEL: &str = "__shadow_control__";

/// Prefix of the end-to-end encrypted channel.
pub const ENCRYPTED_CHANNEL: &str = "__shadow_e2e__";

/// Separator between channel prefix and payload.
pub const SEPARATOR: char = '|';

const RESERVED_PREFIX: &str = "__shadow_";

/// One wire frame, classified by channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Control payload, e.g. `read_only_joiners=1`.
    Control(String),
    /// Base64 of `nonce ++ sealed(plaintext file payload)`.
    Encrypted(String),
    /// Legacy plaintext file payload.
    File(FilePayload),
}

impl Frame {
    /// Render the frame as its wire text.
    pub fn encode(&self) -> String {
        match self {
            Frame::Control(payload) => join(CONTROL_CHANNEL, payload),
            Frame::Encrypted(sealed) => join(ENCRYPTED_CHANNEL, sealed),
            Frame::File(file) => file.encode(),
        }
    }

    /// Classify a wire message by its prefix.
    ///
    /// Reserved `__shadow_*__` prefixes other than the two known channels
    /// are rejected so a future channel is never mistaken for a file path.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let (prefix, payload) = text
            .split_once(SEPARATOR)
            .ok_or(FrameError::MissingSeparator)?;
        if prefix.is_empty() {
            return Err(FrameError::EmptyPrefix);
        }

        match prefix {
            CONTROL_CHANNEL => Ok(Frame::Control(payload.to_string())),
            ENCRYPTED_CHANNEL => Ok(Frame::Encrypted(payload.to_string())),
            p if p.starts_with(RESERVED_PREFIX) && p.ends_with("__") => {
                Err(FrameError::UnknownChannel(p.to_string()))
            }
            path => Ok(Frame::File(FilePayload::from_parts(path, payload))),
        }
    }

    /// Short channel label for logs.
    pub fn channel(&self) -> &'static str {
        match self {
            Frame::Control(_) => "control",
            Frame::Encrypted(_) => "encrypted",
            Frame::File(_) => "plaintext",
        }
    }
}

pub(crate) fn join(prefix: &str, payload: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 1 + payload.len());
    out.push_str(prefix);
    out.push(SEPARATOR);
    out.push_str(payload);
    out
}
