//! Join command - mirror a host's shared files into a local directory.

use anyhow::{Context, Result};
use std::path::PathBuf;

use shadow_sync_client::{SyncClient, SyncConfig, WsTransport};
use shadow_sync_core::normalize_session_url;

/// Options for `shadow join`.
#[derive(Debug, Clone)]
pub struct JoinOptions {
    /// Session link printed by `shadow start`.
    pub url: String,
    /// Shared secret, when the link carries none.
    pub key: Option<String>,
    /// Directory to sync into.
    pub dir: PathBuf,
}

/// Where to connect and which key to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTarget {
    /// WebSocket endpoint.
    pub ws_url: String,
    /// Shared secret.
    pub key: String,
}

/// Resolve the relay endpoint and the key: a non-blank `--key` first, then
/// the link fragment.
pub fn resolve_target(url: &str, key_flag: Option<&str>) -> Result<JoinTarget> {
    if url.trim().is_empty() {
        anyhow::bail!("session URL is required");
    }
    let link = normalize_session_url(url).context("invalid session URL")?;
    let key = key_flag
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or(link.key)
        .filter(|k| !k.is_empty())
        .context("missing E2E key (use URL fragment like #<key> or pass --key)")?;
    Ok(JoinTarget {
        ws_url: link.ws_url,
        key,
    })
}

/// Run the join command.
pub async fn run(opts: JoinOptions) -> Result<()> {
    let target = resolve_target(&opts.url, opts.key.as_deref())?;
    std::fs::create_dir_all(&opts.dir)
        .with_context(|| format!("failed to create {}", opts.dir.display()))?;

    println!("Joining session, syncing into {}", opts.dir.display());
    let transport = WsTransport::connect(&target.ws_url)
        .await
        .context("error making connection")?;
    let client = SyncClient::new(transport, SyncConfig::new(&opts.dir).with_secret(target.key))
        .context("error initializing E2E client")?;
    client.start().await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = client.closed() => println!("Host ended the session."),
    }

    client.shutdown().await?;
    println!();
    println!("Goodbye!");
    Ok(())
}
