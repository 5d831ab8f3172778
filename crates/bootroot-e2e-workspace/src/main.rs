//! Baseline workspace generator
//!
//! Materializes a scenario file into an artifact directory and prints where
//! the layout manifest landed.

use anyhow::{Context, Result};
use bootroot_e2e_workspace::{
    materialize::LAYOUT_FILE, IssuerKind, Materializer, MaterializerConfig, Scenario,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "generate-baseline-workspace")]
#[command(about = "Generate a baseline bootroot e2e workspace from a scenario", long_about = None)]
struct Cli {
    /// Scenario JSON file
    #[arg(long)]
    scenario_file: PathBuf,

    /// Directory to populate (created if missing)
    #[arg(long)]
    artifact_dir: PathBuf,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Certificate backend
    #[arg(long, value_enum)]
    issuer: Option<IssuerKind>,

    /// DNS suffix for issued certificates
    #[arg(long)]
    domain: Option<String>,

    /// OpenBao address recorded in state.json
    #[arg(long)]
    openbao_url: Option<String>,

    /// KV mount recorded in state.json
    #[arg(long)]
    kv_mount: Option<String>,

    /// Binary to install as bin/bootroot-agent instead of the shell stub
    #[arg(long)]
    agent_stub: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn materializer_config(&self) -> Result<MaterializerConfig> {
        let mut config = match &self.config {
            Some(path) => MaterializerConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => MaterializerConfig::default(),
        };
        if let Some(issuer) = self.issuer {
            config.issuer = issuer;
        }
        if let Some(domain) = &self.domain {
            config.domain = domain.clone();
        }
        if let Some(url) = &self.openbao_url {
            config.openbao_url = url.clone();
        }
        if let Some(mount) = &self.kv_mount {
            config.kv_mount = mount.clone();
        }
        if let Some(stub) = &self.agent_stub {
            config.agent_stub = Some(stub.clone());
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.materializer_config()?;
    let scenario = Scenario::load(&cli.scenario_file)
        .with_context(|| format!("Failed to load scenario {}", cli.scenario_file.display()))?;

    let layout = Materializer::new(config)
        .run(&scenario, &cli.artifact_dir)
        .context("Workspace generation failed")?;

    info!(
        scenario = %layout.scenario_id,
        services = layout.services.len(),
        "workspace ready"
    );
    println!("{}", cli.artifact_dir.join(LAYOUT_FILE).display());
    Ok(())
}
