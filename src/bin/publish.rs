//! Manual-test publisher.
//!
//! Publishes a fake sensor or thermostat payload on a topic, then keeps
//! listening on that topic for a short while so the calibrator's reaction
//! (if any) is visible. Useful for poking a live broker without real
//! devices.

use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use thermostat_calibrator::{Connector, MqttConnector, SensorPayload, ThermostatPayload};

#[derive(Parser)]
#[command(name = "calibrator-publish")]
#[command(about = "Publish a fake device reading for manual testing")]
struct Cli {
    /// Broker host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Broker port
    #[arg(long, default_value_t = 1883)]
    port: u16,

    /// Topic to publish on
    #[arg(long, default_value = "topic/sensor")]
    topic: String,

    /// Publish a thermostat payload instead of a sensor payload
    #[arg(long)]
    thermostat: bool,

    /// Temperature to report
    #[arg(short, long, default_value_t = 0.0)]
    temperature: f64,

    /// Currently applied calibration offset (thermostat payloads only)
    #[arg(short, long, default_value_t = 0.0)]
    calibration: f64,

    /// QoS level
    #[arg(short, long, default_value_t = 0)]
    qos: u8,

    /// Seconds to keep listening on the topic after publishing
    #[arg(long, default_value_t = 1)]
    listen: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let connector = MqttConnector::new(cli.host.clone(), cli.port);
    let connection = connector.connect("cli-client").await?;

    let payload = if cli.thermostat {
        serde_json::to_vec(&ThermostatPayload {
            local_temperature: cli.temperature,
            local_temperature_calibration: cli.calibration,
        })?
    } else {
        serde_json::to_vec(&SensorPayload {
            temperature: cli.temperature,
        })?
    };

    connection
        .publish(&cli.topic, cli.qos, Bytes::from(payload.clone()))
        .await?;
    println!(
        "published {} on topic {}",
        String::from_utf8_lossy(&payload),
        cli.topic
    );

    let mut subscription = connection.subscribe(&cli.topic, cli.qos).await?;

    let listen = async {
        while let Some(message) = subscription.inbox.recv().await {
            println!("received: {}", String::from_utf8_lossy(&message));
        }
    };
    let _ = tokio::time::timeout(Duration::from_secs(cli.listen), listen).await;

    connection.disconnect().await;
    Ok(())
}
