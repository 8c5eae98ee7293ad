//! Canopy CLI entry point

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Repository ingestion pipeline: walks a codebase, parses it, and writes a code graph", long_about = None)]
struct Cli {
    /// Repository root to ingest
    #[arg(default_value = ".")]
    target: PathBuf,

    /// Override the repository slug (defaults to the target directory name)
    #[arg(long)]
    repo_id: Option<String>,

    /// Bound on concurrently-parsed files (defaults to canopy.toml / built-in default)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Skip cleanup of any temp clone made for this run
    #[arg(long)]
    keep_temp: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("canopy={log_level}")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("canopy v{}", env!("CARGO_PKG_VERSION"));

    commands::run_ingestion(cli.target, cli.repo_id, cli.concurrency, cli.keep_temp).await
}
