//! Start command - host a session for a file or directory.
//!
//! Runs the relay hub in-process, connects a host engine to it, and prints
//! the link joiners need.

use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shadow_sync_client::{generate_share_key, OutboundIgnore, SyncClient, SyncConfig, WsTransport};
use shadow_sync_core::append_key_fragment;
use shadow_sync_relay::{bind_listener, Config, ShadowRelay};

use crate::guardrails::{confirm_large_share, estimate_share, validate_share_base_dir};

/// Options for `shadow start`.
#[derive(Debug, Clone)]
pub struct StartOptions {
    /// File or directory to share.
    pub path: PathBuf,
    /// First port to try.
    pub port: Option<u16>,
    /// Shared secret; generated when absent.
    pub key: Option<String>,
    /// Joiners may not push edits.
    pub read_only_joiners: bool,
    /// Externally reachable URL of this relay (e.g. a tunnel).
    pub public_url: Option<String>,
    /// Relay configuration file.
    pub config: Option<PathBuf>,
    /// Skip the large-directory confirmation.
    pub force: bool,
}

/// Create the share target if missing. Returns true when a file was created.
pub fn ensure_share_path(path: &Path) -> Result<bool> {
    match std::fs::metadata(path) {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(true)
        }
        Err(e) => Err(e).with_context(|| format!("error checking {}", path.display())),
    }
}

/// Load relay settings and apply command-line overrides.
pub fn relay_config(opts: &StartOptions) -> Result<Config> {
    let mut config = match &opts.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = opts.port {
        let host = config
            .server
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.server.bind_address = format!("{}:{}", host, port);
    }
    if opts.read_only_joiners {
        config.session.read_only_joiners = true;
    }
    Ok(config)
}

/// The link joiners paste into `shadow join`.
pub fn share_link(public_url: Option<&str>, port: u16, key: &str) -> Result<String> {
    let base = match public_url {
        Some(url) => url.to_string(),
        None => format!("http://localhost:{}", port),
    };
    Ok(append_key_fragment(&base, key)?)
}

/// WebSocket URL the host engine dials to reach the in-process relay.
///
/// A wildcard bind is reached over loopback of the same address family.
pub fn host_dial_url(bound: SocketAddr) -> String {
    let ip = match bound.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!("ws://{}/ws", SocketAddr::new(ip, bound.port()))
}

/// Run the start command.
pub async fn run(opts: StartOptions) -> Result<()> {
    if ensure_share_path(&opts.path)? {
        println!("Created {} (empty file)", opts.path.display());
    }

    let path = std::fs::canonicalize(&opts.path).context("failed to resolve share path")?;
    let engine_config = SyncConfig::for_share_path(&path).context("failed to stat share path")?;
    validate_share_base_dir(&engine_config.base_dir)?;

    if engine_config.single_file.is_none() {
        println!("Sharing directory: {}", path.display());
        if !opts.force {
            let base = engine_config.base_dir.clone();
            let estimate = tokio::task::spawn_blocking(move || {
                estimate_share(&base, &OutboundIgnore::new(&base))
            })
            .await
            .context("failed to inspect share directory")?;
            if estimate.is_large() {
                let interactive = std::io::stdin().is_terminal();
                let confirmed = confirm_large_share(
                    &mut std::io::stdin().lock(),
                    &mut std::io::stdout(),
                    interactive,
                    estimate,
                )?;
                if !confirmed {
                    anyhow::bail!("start canceled");
                }
            }
        }
    }

    let key = match opts.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => key.to_string(),
        None => generate_share_key().context("failed to generate E2E key")?,
    };

    let config = relay_config(&opts)?;
    let read_only = config.session.read_only_joiners;
    let listener = bind_listener(&config.server.bind_address, config.server.port_search_span).await?;
    let bound = listener.local_addr()?;
    let port = bound.port();
    if let Some(requested) = opts.port.filter(|p| *p != port) {
        println!("Port {} was in use, using port {} instead", requested, port);
    }

    let relay = Arc::new(ShadowRelay::new(config));
    let server = tokio::spawn(Arc::clone(&relay).serve(listener));

    let link = share_link(opts.public_url.as_deref(), port, &key)?;
    println!();
    println!("Shadowing {}", path.display());
    println!();
    println!("Share this command with your partner:");
    println!();
    println!("  shadow join '{}'", link);
    println!();
    println!("E2E: file payloads are encrypted client-to-client.");
    if read_only {
        println!("Mode: joiners are read-only. Host edits continue syncing.");
    }

    let transport = WsTransport::connect(&host_dial_url(bound))
        .await
        .context("error connecting to websocket")?;
    let client = SyncClient::new(transport, engine_config.with_secret(key).as_host())
        .context("error initializing E2E client")?;
    client.start().await?;

    match client.send_initial_snapshot().await {
        Ok(count) => println!("Initial snapshot sent ({} files)", count),
        Err(e) => println!("Error sending initial snapshot: {}", e),
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = client.closed() => {}
    }

    client.shutdown().await?;
    relay.shutdown();
    server.await??;
    println!();
    println!("Goodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn options(path: PathBuf) -> StartOptions {
        StartOptions {
            path,
            port: None,
            key: None,
            read_only_joiners: false,
            public_url: None,
            config: None,
            force: false,
        }
    }

    #[test]
    fn missing_path_created_as_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("solution.py");

        assert!(ensure_share_path(&path).unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"");
        assert!(!ensure_share_path(&path).unwrap());
    }

    #[test]
    fn port_flag_overrides_bind_port() {
        let mut opts = options(PathBuf::from("."));
        opts.port = Some(9100);
        opts.read_only_joiners = true;

        let config = relay_config(&opts).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9100");
        assert!(config.session.read_only_joiners);
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("relay.toml");
        std::fs::write(&file, "[server]\nbind_address = \"127.0.0.1:7000\"\n").unwrap();
        let mut opts = options(PathBuf::from("."));
        opts.config = Some(file);

        let config = relay_config(&opts).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:7000");
        assert!(!config.session.read_only_joiners);
    }

    #[test]
    fn host_dials_loopback_for_wildcard_bind() {
        assert_eq!(
            host_dial_url("0.0.0.0:8080".parse().unwrap()),
            "ws://127.0.0.1:8080/ws"
        );
        assert_eq!(host_dial_url("[::]:8080".parse().unwrap()), "ws://[::1]:8080/ws");
    }

    #[test]
    fn host_dials_specific_bind_address() {
        assert_eq!(
            host_dial_url("192.168.1.20:9000".parse().unwrap()),
            "ws://192.168.1.20:9000/ws"
        );
        assert_eq!(
            host_dial_url("127.0.0.1:9000".parse().unwrap()),
            "ws://127.0.0.1:9000/ws"
        );
    }

    #[test]
    fn share_link_carries_key() {
        let link = share_link(None, 8080, "abc").unwrap();
        assert_eq!(link, "http://localhost:8080/#abc");

        let link = share_link(Some("https://demo.trycloudflare.com"), 8080, "abc").unwrap();
        assert_eq!(link, "https://demo.trycloudflare.com/#abc");
    }
}
