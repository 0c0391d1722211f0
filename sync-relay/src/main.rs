//! shadow-relay binary entry point.
//!
//! Usage:
//! ```bash
//! shadow-relay --config relay.toml
//! shadow-relay --port 9000 --read-only-joiners
//! ```

use anyhow::Context;
use clap::Parser;
use shadow_sync_relay::{bind_listener, Config, ShadowRelay};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Standalone relay hub for shadow sessions.
#[derive(Parser, Debug)]
#[command(name = "shadow-relay", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config file.
    #[arg(long)]
    bind: Option<String>,

    /// Make joiners read-only.
    #[arg(long)]
    read_only_joiners: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if cli.read_only_joiners {
        config.session.read_only_joiners = true;
    }

    let listener = bind_listener(&config.server.bind_address, config.server.port_search_span)
        .await
        .context("binding relay listener")?;
    let relay = Arc::new(ShadowRelay::new(config));

    let shutdown = relay.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
            shutdown.cancel();
        }
    });

    relay.serve(listener).await.context("relay failed")?;
    Ok(())
}
