//! Size ceilings shared by senders, receivers and the relay.

/// Largest raw file content that is ever read, sent, or applied (10 MiB).
pub const MAX_SYNCED_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Longest relative path accepted inside a file payload.
pub const MAX_PATH_BYTES: usize = 4096;

/// Read ceiling for one inbound wire message (20 MiB).
///
/// A maximum-size file grows to roughly 18.7 MB on the wire once its
/// content is base64 encoded, sealed, and base64 encoded again.
pub const MAX_INCOMING_MESSAGE_BYTES: usize = 20 * 1024 * 1024;
