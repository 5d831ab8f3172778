//! Mock OpenBao server
//!
//! Serves the versioned secret simulator until interrupted.

use anyhow::{Context, Result};
use bootroot_mock_openbao::{config::PORT_ENV, MockOpenBao, SimulatorConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mock-openbao")]
#[command(about = "Versioned OpenBao simulator for bootroot e2e tests", long_about = None)]
struct Cli {
    /// Interface to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = PORT_ENV)]
    port: Option<u16>,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => SimulatorConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SimulatorConfig::default(),
    }
    .with_overrides(cli.host, cli.port);

    MockOpenBao::new(config)
        .serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received Ctrl-C, shutting down");
        })
        .await
        .context("Mock OpenBao server failed")?;

    Ok(())
}
