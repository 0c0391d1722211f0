//! Error types for wire framing.

use thiserror::Error;

/// Errors that can occur while parsing or decoding a wire frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The frame has no `|` separator.
    #[error("missing channel separator")]
    MissingSeparator,

    /// The prefix before the separator is empty.
    #[error("empty channel prefix")]
    EmptyPrefix,

    /// A reserved `__shadow_*` prefix that this version does not know.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// File content is not valid base64.
    #[error("invalid content encoding: {0}")]
    InvalidEncoding(String),

    /// Decoded file content exceeds the synced-file ceiling.
    #[error("payload too large: {size} bytes (limit: {limit} bytes)")]
    TooLarge {
        /// Actual (or lower-bound estimated) decoded size.
        size: usize,
        /// Maximum allowed size.
        limit: usize,
    },
}
