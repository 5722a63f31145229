//! Runner for the ledger emulator: loads configuration and produces blocks on a timer
use anyhow::Result;
use clap::Parser;
use config::{Config, Environment, File};
use emulator_common::configuration::EmulatorConfig;
use ledger_emulator::{BlockTimer, Emulator};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

#[derive(Debug, clap::Parser)]
struct Args {
    #[arg(long, value_name = "PATH", default_values_t = vec!["emulator.toml".to_string()])]
    config: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Standard logging using RUST_LOG for log levels
    let fmt_layer = fmt::layer().with_filter(EnvFilter::from_default_env());
    Registry::default().with(fmt_layer).init();

    info!("Ledger emulator process");

    let args = Args::parse();
    let mut builder = Config::builder();
    for file in &args.config {
        builder = builder.add_source(File::with_name(file));
    }
    let config = builder.add_source(Environment::with_prefix("EMULATOR")).build()?;
    let emulator_config = EmulatorConfig::from_config(&config)?;
    let interval = Duration::from_millis(emulator_config.block_interval_ms);

    let emulator = Arc::new(Mutex::new(Emulator::new(emulator_config)?));
    let mut timer = BlockTimer::new(emulator.clone(), interval)?;
    timer.start();

    tokio::signal::ctrl_c().await?;
    timer.stop();

    let clock = emulator.lock().await.clock();
    info!(
        slot = clock.slot,
        block = clock.block,
        epoch = clock.epoch,
        "Ledger emulator stopped"
    );
    Ok(())
}
