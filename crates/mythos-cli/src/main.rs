//! `mythos`: command-line front end for the Mythos persona ledger.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments
//! 2. Load configuration from `--config`, or `mythos-config.yaml` if present
//! 3. Initialize structured logging (tracing) on stderr
//! 4. Open the data directory and recover the store from snapshot and log
//! 5. Run the subcommand, printing its result on stdout

mod cli;
mod commands;
mod error;

use std::io::Write;
use std::path::Path;

use clap::Parser;
use mythos_core::config::LoggingConfig;
use mythos_core::{MythosConfig, MythosEngine};
use mythos_db::FileStorage;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

/// Config file read when `--config` is not given.
const DEFAULT_CONFIG: &str = "mythos-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, recovery or the subcommand fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    init_tracing(&config.logging);
    debug!(
        data_dir = %config.storage.data_dir.display(),
        thresholds = config.evolution.thresholds.len(),
        "Configuration loaded"
    );

    let storage = FileStorage::open(&config.storage)?;
    let mut engine = MythosEngine::open(&config.evolution, storage)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(cli.command, &mut engine, &mut out)?;
    out.flush()?;

    engine.close()?;
    Ok(())
}

/// Read `path`, or the default config file, or fall back to defaults.
fn load_config(path: Option<&Path>) -> Result<MythosConfig, CliError> {
    if let Some(path) = path {
        return Ok(MythosConfig::from_file(path)?);
    }
    let default_path = Path::new(DEFAULT_CONFIG);
    if default_path.exists() {
        return Ok(MythosConfig::from_file(default_path)?);
    }
    let mut config = MythosConfig::default();
    config.storage.apply_env_overrides();
    Ok(config)
}

/// Install the global subscriber. `RUST_LOG` overrides `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    info!(json = logging.json, "mythos starting");
}
