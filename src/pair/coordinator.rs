// src/pair/coordinator.rs

//! Pair coordinator: task wiring and coordinated stop.
//!
//! One coordinator owns the four tasks of a pair — two subscribers, the
//! decision loop, and the publisher — and the typed point-to-point
//! channels between them:
//!
//! ```text
//! thermostat topic -> subscriber -+
//!                                 +-> decision loop -> publisher -> calibration topic
//! sensor topic     -> subscriber -+
//! ```
//!
//! Each subscriber and the publisher opens its own broker connection, so
//! no connection is ever shared across tasks. Shutdown is cooperative: a
//! watch channel broadcasts the stop signal and `shutdown` awaits every
//! task's `JoinHandle`, so a pair is only considered stopped once all
//! four tasks have actually exited. No fixed delays anywhere.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::decision::run_decision_loop;
use crate::config::{MqttConfig, PairConfig};
use crate::domain::{
    //
    ConnectorPtr,
    SensorPayload,
    SensorReading,
    ThermostatPayload,
    ThermostatReading,
};
use crate::Result;

const CHANNEL_CAPACITY: usize = 32;

/// Runtime handle for one configured pair.
pub struct PairCoordinator {
    name: String,
    stop_tx: watch::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl PairCoordinator {
    /// Wires up and launches the pair's four tasks.
    ///
    /// Returns as soon as the tasks are spawned; connecting and
    /// subscribing happen inside the tasks so that one pair's broker
    /// trouble never blocks or fails its siblings.
    pub fn start(connector: ConnectorPtr, mqtt: &MqttConfig, pair: &PairConfig) -> Self {
        let (stop_tx, stop_rx) = watch::channel(());
        let (thermostat_tx, thermostat_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (sensor_tx, sensor_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (offset_tx, offset_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let mut tasks = Vec::with_capacity(4);

        tasks.push(tokio::spawn(run_decision_loop(
            pair.name.clone(),
            thermostat_rx,
            sensor_rx,
            offset_tx,
            stop_rx.clone(),
        )));

        tasks.push(tokio::spawn(run_subscriber::<ThermostatPayload, _>(
            connector.clone(),
            pair.thermostat_client_id(),
            pair.thermostat_state_topic(&mqtt.base_topic),
            mqtt.qos,
            thermostat_tx,
            stop_rx.clone(),
        )));

        tasks.push(tokio::spawn(run_subscriber::<SensorPayload, _>(
            connector.clone(),
            pair.sensor_client_id(),
            pair.sensor_state_topic(&mqtt.base_topic),
            mqtt.qos,
            sensor_tx,
            stop_rx.clone(),
        )));

        tasks.push(tokio::spawn(run_publisher(
            connector,
            pair.publisher_client_id(),
            pair.calibration_topic(&mqtt.base_topic),
            mqtt.qos,
            offset_rx,
            stop_rx,
        )));

        info!(pair = %pair.name, "pair coordinator started");

        Self {
            name: pair.name.clone(),
            stop_tx,
            tasks,
        }
    }

    /// Signals all four tasks to stop and waits for each to exit.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(());

        for task in self.tasks {
            if let Err(err) = task.await {
                error!(pair = %self.name, %err, "pair task panicked");
            }
        }

        info!(pair = %self.name, "pair coordinator stopped");
    }
}

/// Subscribes to a state topic and forwards decoded readings to the
/// decision loop until told to stop.
///
/// Malformed payloads are logged and dropped; they never reach the
/// decision loop. Connect or subscribe failures end this task only.
async fn run_subscriber<P, R>(
    connector: ConnectorPtr,
    client_id: String,
    topic: String,
    qos: u8,
    out: mpsc::Sender<R>,
    mut stop_rx: watch::Receiver<()>,
) where
    P: DeserializeOwned + Into<R>,
    R: Send,
{
    let connection = match connector.connect(&client_id).await {
        Ok(connection) => connection,
        Err(err) => {
            error!(topic = %topic, %err, "broker connection failed");
            return;
        }
    };

    let mut subscription = match connection.subscribe(&topic, qos).await {
        Ok(subscription) => subscription,
        Err(err) => {
            error!(topic = %topic, %err, "subscription failed");
            connection.disconnect().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,

            payload = subscription.inbox.recv() => {
                let Some(payload) = payload else { break };

                match serde_json::from_slice::<P>(&payload) {
                    Ok(decoded) => {
                        if out.send(decoded.into()).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(topic = %topic, %err, "dropping malformed payload"),
                }
            }
        }
    }

    connection.disconnect().await;
    debug!(topic = %topic, "subscriber stopped");
}

/// Publishes each emitted offset on the calibration topic, in emission
/// order, until told to stop.
///
/// A failed publish drops that offset; there is no retry or requeue.
async fn run_publisher(
    connector: ConnectorPtr,
    client_id: String,
    topic: String,
    qos: u8,
    mut offset_rx: mpsc::Receiver<f64>,
    mut stop_rx: watch::Receiver<()>,
) {
    let connection = match connector.connect(&client_id).await {
        Ok(connection) => connection,
        Err(err) => {
            error!(topic = %topic, %err, "broker connection failed");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,

            offset = offset_rx.recv() => {
                let Some(offset) = offset else { break };

                let payload = match calibration_payload(offset) {
                    Ok(payload) => payload,
                    Err(err) => {
                        error!(%err, "failed to encode calibration payload");
                        continue;
                    }
                };

                info!(topic = %topic, offset, "publishing calibration offset");

                if let Err(err) = connection.publish(&topic, qos, payload).await {
                    error!(topic = %topic, %err, "publish failed, offset dropped");
                }
            }
        }
    }

    connection.disconnect().await;
    debug!(topic = %topic, "publisher stopped");
}

/// Encodes an offset as the JSON string the thermostat firmware expects:
/// exactly one fractional digit, e.g. `"4.5"`.
fn calibration_payload(offset: f64) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(&format!("{offset:.1}"))?))
}
