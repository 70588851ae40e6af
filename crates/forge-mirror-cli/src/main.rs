//! Forge Mirror CLI - runs mirror maintenance jobs against a forge database.
//!
//! Each command prints its result as a single JSON line on stdout; logs go
//! to stderr.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use forge_mirror::CancellationToken;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "forge-mirror")]
#[command(about = "Tag/release sync and LFS backfill for mirrored repositories")]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true, default_value = "forge-mirror.json")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a repository directory in the database
    AddRepo {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: String,
        /// Path of the git directory
        #[arg(long)]
        path: PathBuf,
        /// Mark the repository as a pull mirror
        #[arg(long)]
        mirror: bool,
    },
    /// Make the repository's tag-mirrored releases match its git tags
    SyncTags {
        #[arg(long)]
        repo_id: i64,
    },
    /// Download LFS objects the repository references but does not hold
    BackfillLfs {
        #[arg(long)]
        repo_id: i64,
        /// Content store directory of the upstream
        #[arg(long)]
        upstream: PathBuf,
    },
    /// Find the wiki repository of a remote
    WikiUrl {
        remote: String,
        /// Probe over smart HTTP instead of `git ls-remote`
        #[arg(long)]
        http: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG takes precedence over --debug
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            signal_token.cancel();
        }
    });

    info!("Using config {}", args.config.display());
    let output = match args.command {
        Command::AddRepo {
            owner,
            name,
            path,
            mirror,
        } => commands::add_repo(&args.config, owner, name, path, mirror).await?,
        Command::SyncTags { repo_id } => commands::sync_tags(&args.config, repo_id).await?,
        Command::BackfillLfs { repo_id, upstream } => {
            commands::backfill_lfs(&args.config, repo_id, upstream, cancel).await?
        }
        Command::WikiUrl { remote, http } => commands::wiki_url(&remote, http).await?,
    };

    println!("{}", output);
    Ok(())
}
