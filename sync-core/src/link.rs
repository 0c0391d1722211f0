//! Session links.
//!
//! A host shares one URL of the form `https://host/#<key>`. The fragment
//! carries the shared secret and is never sent to the relay: joiners strip
//! it, rewrite the scheme to WebSocket and point the path at `/ws`.

use thiserror::Error;
use url::Url;

/// Errors while parsing or building a session link.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    /// Empty or whitespace-only input.
    #[error("session URL is required")]
    Empty,

    /// Not parseable as a URL.
    #[error("invalid session URL: {0}")]
    Invalid(String),

    /// Parsed, but without a host.
    #[error("invalid session URL: expected full URL with scheme and host")]
    MissingHost,

    /// Scheme other than http, https, ws or wss.
    #[error("unsupported URL scheme {0:?}")]
    UnsupportedScheme(String),
}

/// A joinable WebSocket endpoint plus the key found in its fragment.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionLink {
    /// `ws://` or `wss://` URL ending in `/ws`, without fragment.
    pub ws_url: String,
    /// Trimmed fragment, if non-empty.
    pub key: Option<String>,
}

impl std::fmt::Debug for SessionLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLink")
            .field("ws_url", &self.ws_url)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Turn a shared link into the WebSocket URL to dial.
pub fn normalize_session_url(raw: &str) -> Result<SessionLink, LinkError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LinkError::Empty);
    }

    let mut url = Url::parse(trimmed).map_err(|e| LinkError::Invalid(e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(LinkError::MissingHost);
    }

    let key = url
        .fragment()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);
    url.set_fragment(None);

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(LinkError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| LinkError::UnsupportedScheme(url.scheme().to_string()))?;

    let path = url.path().to_string();
    if path.is_empty() || path == "/" {
        url.set_path("/ws");
    } else if !path.ends_with("/ws") {
        url.set_path(&format!("{}/ws", path.trim_end_matches('/')));
    }

    Ok(SessionLink {
        ws_url: url.to_string(),
        key,
    })
}

/// Attach `key` as the fragment of `raw`, replacing any existing one.
pub fn append_key_fragment(raw: &str, key: &str) -> Result<String, LinkError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| LinkError::Invalid(e.to_string()))?;
    url.set_fragment(Some(key));
    Ok(url.to_string())
}
