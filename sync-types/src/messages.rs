//! Message bodies carried inside frames.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::envelope::{join, CONTROL_CHANNEL, SEPARATOR};
use crate::error::FrameError;

/// Control key announcing whether joiners may push edits.
pub const READ_ONLY_JOINERS_KEY: &str = "read_only_joiners";

/// Session option pushed by the relay once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Joiners receive changes but never broadcast their own.
    ReadOnlyJoiners(bool),
}

impl ControlMessage {
    /// Control payload, e.g. `read_only_joiners=0`.
    pub fn payload(&self) -> String {
        match self {
            ControlMessage::ReadOnlyJoiners(v) => {
                format!("{}={}", READ_ONLY_JOINERS_KEY, if *v { "1" } else { "0" })
            }
        }
    }

    /// Full wire text including the control prefix.
    pub fn encode(&self) -> String {
        join(CONTROL_CHANNEL, &self.payload())
    }

    /// Parse a control payload.
    ///
    /// Returns `None` for unknown keys or non-boolean values; the caller
    /// ignores those rather than failing.
    pub fn parse(payload: &str) -> Option<Self> {
        let (key, value) = payload.split_once('=')?;
        let flag = match value.trim() {
            "1" => true,
            "0" => false,
            _ => return None,
        };
        match key.trim() {
            READ_ONLY_JOINERS_KEY => Some(ControlMessage::ReadOnlyJoiners(flag)),
            _ => None,
        }
    }
}

/// `<relativePath>|<base64 content>`.
///
/// Sent as-is on the legacy plaintext channel and used as the plaintext
/// sealed inside an encrypted frame.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePayload {
    path: String,
    content: String,
}

impl FilePayload {
    /// Build a payload from a relative path and raw bytes.
    pub fn new(path: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            path: path.into(),
            content: STANDARD.encode(bytes),
        }
    }

    pub(crate) fn from_parts(path: &str, content: &str) -> Self {
        Self {
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    /// Parse the decrypted plaintext of an encrypted frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let (path, content) = text
            .split_once(SEPARATOR)
            .ok_or(FrameError::MissingSeparator)?;
        if path.is_empty() {
            return Err(FrameError::EmptyPrefix);
        }
        Ok(Self::from_parts(path, content))
    }

    /// Wire path exactly as the sender wrote it. Not validated here.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Encoded content length in bytes.
    pub fn encoded_len(&self) -> usize {
        self.content.len()
    }

    /// Decode the content, refusing anything larger than `limit` bytes.
    ///
    /// The base64 length gives a lower bound on the decoded size, so an
    /// oversized payload is rejected before any allocation.
    pub fn decode_content(&self, limit: usize) -> Result<Vec<u8>, FrameError> {
        let estimated = (self.content.len() / 4) * 3;
        let padding = self.content.bytes().rev().take_while(|b| *b == b'=').count();
        let estimated = estimated.saturating_sub(padding);
        if estimated > limit {
            return Err(FrameError::TooLarge {
                size: estimated,
                limit,
            });
        }

        let bytes = STANDARD
            .decode(self.content.as_bytes())
            .map_err(|e| FrameError::InvalidEncoding(e.to_string()))?;
        if bytes.len() > limit {
            return Err(FrameError::TooLarge {
                size: bytes.len(),
                limit,
            });
        }
        Ok(bytes)
    }

    /// Render as `<path>|<content>`.
    pub fn encode(&self) -> String {
        join(&self.path, &self.content)
    }
}

impl std::fmt::Debug for FilePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePayload")
            .field("path", &self.path)
            .field("content", &format_args!("[{} bytes]", self.content.len()))
            .finish()
    }
}
