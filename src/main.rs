//! Calibrator service binary.
//!
//! Loads the YAML configuration, starts the calibration manager, and runs
//! until SIGINT or SIGTERM, then performs an orderly stop that waits for
//! every pair's tasks to exit.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use thermostat_calibrator::{CalibrationManager, Config, MqttConnector};

#[derive(Parser)]
#[command(name = "calibrator")]
#[command(version)]
#[command(about = "Keeps smart thermostats calibrated against reference sensors over MQTT")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = "config.yml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    info!(
        broker = %format!("{}:{}", config.mqtt.host, config.mqtt.port),
        "initializing calibration manager"
    );

    let connector = MqttConnector::new(config.mqtt.host.clone(), config.mqtt.port);
    let mut manager = CalibrationManager::new(config, connector);

    manager.start().context("starting calibration manager")?;

    wait_for_shutdown_signal().await?;
    info!("shutdown signal received");

    manager.stop().await.context("stopping calibration manager")?;
    info!("exiting");

    Ok(())
}

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("installing SIGINT handler")?,
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("installing SIGINT handler")?;

    Ok(())
}
