//! fitvault CLI
//!
//! Command-line interface for fitting, saving and reusing anomaly detection
//! pipelines.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use fitvault_store::StoreConfig;
use fitvault_store::config::DEFAULT_ROOT;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fitvault")]
#[command(about = "Fitted pipeline store for anomaly detection", long_about = None)]
struct Cli {
    /// Directory holding saved pipelines
    #[arg(long, global = true, env = "FITVAULT_ROOT", default_value = DEFAULT_ROOT)]
    root: PathBuf,

    /// JSON file of extra carrier rules
    #[arg(long, global = true, env = "FITVAULT_REGISTRY")]
    registry: Option<PathBuf>,

    /// Seed for detector initialisation
    #[arg(long, global = true, env = "FITVAULT_SEED", default_value = "0")]
    seed: u64,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitvault_store=info,fitvault_runner=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut store = StoreConfig::from_env().context("Invalid store configuration")?;
    store.root = cli.root;
    store.validate().context("Invalid store configuration")?;

    let config = Config {
        store,
        registry: cli.registry,
        seed: cli.seed,
    };

    handle_command(cli.command, &config)
}
