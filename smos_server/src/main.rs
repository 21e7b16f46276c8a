//! Coordinator binary: loads configuration, then serves the store catalog
//! over TCP until interrupted.

use clap::Parser;
use smos_common::config::{ConfigError, ConfigLoader, StoreConfig};
use smos_server::run_coordinator;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// smos_server - coordinator for the shared memory object store
#[derive(Parser, Debug)]
#[command(name = "smos_server")]
#[command(version)]
#[command(about = "Coordinator process for the shared memory object store")]
struct Args {
    /// Path to a TOML configuration file; missing file falls back to defaults.
    #[arg(short, long, default_value = "/etc/smos/smos.toml")]
    config: PathBuf,

    /// Overrides the configured lower end of the port range.
    #[arg(long)]
    port_min: Option<u16>,

    /// Overrides the configured upper end of the port range.
    #[arg(long)]
    port_max: Option<u16>,

    /// Overrides the configured authentication key.
    #[arg(long)]
    authkey: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(&args);

    let mut config = match StoreConfig::load(&args.config) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound) => {
            info!(path = %args.config.display(), "no config file found, using defaults");
            StoreConfig::default()
        }
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return Err(Box::new(e));
        }
    };

    if let Some(port_min) = args.port_min {
        config.port_min = port_min;
    }
    if let Some(port_max) = args.port_max {
        config.port_max = port_max;
    }
    if let Some(authkey) = args.authkey {
        config.authkey = authkey;
    }
    config.validate()?;

    info!(
        port_min = config.port_min,
        port_max = config.port_max,
        "starting coordinator"
    );

    let mut handle = run_coordinator(config.port_min, config.port_max, config.authkey).await?;
    info!(port = handle.port, "coordinator ready");

    match signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => error!(error = %e, "unable to listen for shutdown signal"),
    }

    handle.shutdown();
    handle.store.stop_all()?;
    info!("coordinator shutdown complete");
    Ok(())
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
