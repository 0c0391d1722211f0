//! # shadow
//!
//! Live, end-to-end encrypted file sharing for pairing sessions.
//!
//! ## Commands
//!
//! - `start`: Share a file or directory and print a join link
//! - `join`: Mirror a shared session into a local directory
//!
//! ## Example
//!
//! ```bash
//! # Share the current project
//! shadow start .
//!
//! # On another machine, paste the printed command
//! shadow join 'https://example.trycloudflare.com/#<key>'
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod guardrails;

use commands::{join, start};

/// Live, end-to-end encrypted file sharing.
#[derive(Parser, Debug)]
#[command(name = "shadow")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Share a file or directory
    Start {
        /// File or directory to share (created as an empty file if missing)
        #[arg(conflicts_with = "path_flag")]
        path: Option<PathBuf>,

        /// Path to share, instead of the positional argument
        #[arg(long = "path", value_name = "PATH")]
        path_flag: Option<PathBuf>,

        /// First port to try; the next free one is used if taken
        #[arg(long, short)]
        port: Option<u16>,

        /// E2E key (generated when omitted)
        #[arg(long, short)]
        key: Option<String>,

        /// Joiners can watch but not edit
        #[arg(long)]
        read_only_joiners: bool,

        /// Public URL that reaches this machine (e.g. a tunnel)
        #[arg(long)]
        public_url: Option<String>,

        /// Relay configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Share large directories without asking
        #[arg(long)]
        force: bool,
    },

    /// Join a shared session
    Join {
        /// Session link printed by `shadow start`
        url: String,

        /// E2E key; overrides the link #fragment
        #[arg(long, short)]
        key: Option<String>,

        /// Directory to sync into
        #[arg(long, short, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            path,
            path_flag,
            port,
            key,
            read_only_joiners,
            public_url,
            config,
            force,
        } => {
            start::run(start::StartOptions {
                path: share_path(path, path_flag),
                port,
                key,
                read_only_joiners,
                public_url,
                config,
                force,
            })
            .await?;
        }
        Commands::Join { url, key, dir } => {
            join::run(join::JoinOptions { url, key, dir }).await?;
        }
    }

    Ok(())
}

/// The positional path, else `--path`, else the current directory.
fn share_path(positional: Option<PathBuf>, flag: Option<PathBuf>) -> PathBuf {
    positional.or(flag).unwrap_or_else(|| PathBuf::from("."))
}
