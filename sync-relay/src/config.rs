//! Configuration loading for the shadow relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`).
//! Every section and field is optional.

use serde::Deserialize;
use shadow_sync_types::MAX_INCOMING_MESSAGE_BYTES;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the relay.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener configuration.
    pub server: ServerConfig,
    /// Session options announced to every peer.
    pub session: SessionConfig,
    /// Hub timing and size limits.
    pub hub: HubConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0:8080).
    pub bind_address: String,
    /// How many successive ports to try when the configured one is taken (default: 100).
    pub port_search_span: u16,
}

/// Session options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Joiners may watch but not push edits (default: false).
    pub read_only_joiners: bool,
}

/// Hub timing and size limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Interval between keepalive pings in seconds (default: 30).
    pub keepalive_interval_secs: u64,
    /// A peer silent for this long is dropped (default: 60).
    pub idle_timeout_secs: u64,
    /// Per-peer write deadline during broadcast (default: 10).
    pub write_timeout_secs: u64,
    /// Largest accepted WebSocket message (default: 20 MiB).
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            port_search_span: 100,
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            keepalive_interval_secs: 30,
            idle_timeout_secs: 60,
            write_timeout_secs: 10,
            max_message_bytes: MAX_INCOMING_MESSAGE_BYTES,
        }
    }
}

impl HubConfig {
    /// Keepalive interval.
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs.max(1))
    }

    /// Idle timeout.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.max(1))
    }

    /// Per-peer write deadline.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs.max(1))
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
