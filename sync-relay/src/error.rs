//! Error types for the shadow relay.

use std::time::Duration;

/// Main error type for relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Bind address could not be parsed.
    #[error("invalid bind address {address}: {reason}")]
    InvalidAddress {
        /// Configured address.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Every port in the search range was taken.
    #[error("no free port in {first}..={last}")]
    NoFreePort {
        /// First port tried.
        first: u16,
        /// Last port tried.
        last: u16,
    },

    /// Hub error.
    #[error("hub error: {0}")]
    Hub(#[from] HubError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hub errors.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The session-options message could not be delivered, so the peer was not admitted.
    #[error("handshake failed: {0}")]
    Handshake(#[source] PeerWriteError),
}

/// Failure writing one frame to one peer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerWriteError {
    /// The connection is already closed.
    #[error("peer connection closed")]
    Closed,

    /// The write did not finish in time.
    #[error("write timed out after {0:?}")]
    TimedOut(Duration),

    /// Socket-level failure.
    #[error("write failed: {0}")]
    Io(String),
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_error_names_cause() {
        let err = HubError::Handshake(PeerWriteError::Closed);
        assert_eq!(err.to_string(), "handshake failed: peer connection closed");
    }

    #[test]
    fn no_free_port_shows_range() {
        let err = RelayError::NoFreePort { first: 8080, last: 8180 };
        assert_eq!(err.to_string(), "no free port in 8080..=8180");
    }
}
