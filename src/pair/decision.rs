// src/pair/decision.rs

//! Pair state and decision loop.
//!
//! `PairState` holds the latest known reading from each source and decides
//! whether an incoming reading warrants a new calibration offset. It is
//! owned exclusively by the decision loop task — the single-writer
//! invariant that makes the rest of the pair lock-free.
//!
//! "No reading yet" is an explicit `None`, never a sentinel value, so
//! below-zero temperatures behave like any other reading.

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::calibrate::calibrate;
use crate::domain::{SensorReading, ThermostatReading};

/// Latest known readings for one (sensor, thermostat) pair.
#[derive(Debug, Default)]
pub struct PairState {
    last_measured: Option<f64>,
    last_sensor: Option<f64>,
}

impl PairState {
    /// Handles a thermostat reading.
    ///
    /// Returns the offset to publish, or `None` when the measured
    /// temperature is unchanged or the sensor side is still unknown.
    pub fn on_thermostat(&mut self, reading: ThermostatReading) -> Option<f64> {
        let measured = reading.measured();

        if self.last_measured == Some(measured) {
            return None;
        }

        debug!(measured, "thermostat measured temperature changed");
        self.last_measured = Some(measured);

        self.last_sensor.map(|sensor| calibrate(sensor, measured))
    }

    /// Handles a sensor reading; same emission rules as [`Self::on_thermostat`].
    pub fn on_sensor(&mut self, reading: SensorReading) -> Option<f64> {
        if self.last_sensor == Some(reading.temperature) {
            return None;
        }

        debug!(temperature = reading.temperature, "sensor temperature changed");
        self.last_sensor = Some(reading.temperature);

        self.last_measured
            .map(|measured| calibrate(reading.temperature, measured))
    }
}

/// Serializes both reading streams into a single decision stream.
///
/// Each event is processed fully (store, compare, optionally compute and
/// emit) before the next one is taken, which is what gives the
/// single-writer guarantee on `PairState`. The stop signal ends the loop
/// unconditionally; readings not yet taken from the channels are
/// discarded and no final offset is flushed.
pub(crate) async fn run_decision_loop(
    pair: String,
    mut thermostat_rx: mpsc::Receiver<ThermostatReading>,
    mut sensor_rx: mpsc::Receiver<SensorReading>,
    offset_tx: mpsc::Sender<f64>,
    mut stop_rx: watch::Receiver<()>,
) {
    let mut state = PairState::default();
    let mut thermostat_open = true;
    let mut sensor_open = true;

    loop {
        let emitted = tokio::select! {
            _ = stop_rx.changed() => break,

            reading = thermostat_rx.recv(), if thermostat_open => match reading {
                Some(reading) => state.on_thermostat(reading),
                None => {
                    thermostat_open = false;
                    None
                }
            },

            reading = sensor_rx.recv(), if sensor_open => match reading {
                Some(reading) => state.on_sensor(reading),
                None => {
                    sensor_open = false;
                    None
                }
            },
        };

        if let Some(offset) = emitted {
            info!(pair = %pair, offset, "new calibration offset");
            if offset_tx.send(offset).await.is_err() {
                // Publisher is gone; nothing left to emit to.
                break;
            }
        }
    }

    debug!(pair = %pair, "decision loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn thermostat(temperature: f64, calibration: f64) -> ThermostatReading {
        ThermostatReading {
            temperature,
            calibration,
        }
    }

    fn sensor(temperature: f64) -> SensorReading {
        SensorReading { temperature }
    }

    #[test]
    fn no_emission_until_both_sources_known() {
        let mut state = PairState::default();

        assert_eq!(state.on_thermostat(thermostat(17.0, 0.0)), None);
        assert_eq!(state.on_thermostat(thermostat(18.0, 0.0)), None);
        assert_eq!(state.on_sensor(sensor(21.6)), Some(calibrate(21.6, 18.0)));
    }

    #[test]
    fn sensor_first_then_thermostat_emits() {
        let mut state = PairState::default();

        assert_eq!(state.on_sensor(sensor(21.6)), None);
        assert_eq!(state.on_thermostat(thermostat(17.0, 0.0)), Some(4.5));
    }

    #[test]
    fn unchanged_reading_is_a_no_op() {
        let mut state = PairState::default();

        state.on_sensor(sensor(21.6));
        state.on_thermostat(thermostat(17.0, 0.0));

        assert_eq!(state.on_sensor(sensor(21.6)), None);
        assert_eq!(state.on_thermostat(thermostat(17.0, 0.0)), None);
    }

    #[test]
    fn same_measured_via_different_fields_is_a_no_op() {
        let mut state = PairState::default();

        state.on_sensor(sensor(21.6));
        state.on_thermostat(thermostat(21.0, 0.0));

        // 21.5 - 0.5 is the same measured 21.0 as before.
        assert_eq!(state.on_thermostat(thermostat(21.5, 0.5)), None);
    }

    #[test]
    fn differing_thermostat_reading_emits_exactly_once() {
        let mut state = PairState::default();

        state.on_sensor(sensor(21.6));
        state.on_thermostat(thermostat(21.0, 0.0));

        let offset = state.on_thermostat(thermostat(17.5, 0.5));
        assert_eq!(offset, Some(calibrate(21.6, 17.0)));
        assert_eq!(offset, Some(4.5));
    }

    #[test]
    fn negative_temperatures_are_valid_readings() {
        let mut state = PairState::default();

        assert_eq!(state.on_sensor(sensor(-2.6)), None);
        assert_eq!(state.on_thermostat(thermostat(-5.0, 0.0)), Some(2.5));
    }

    #[tokio::test]
    async fn loop_emits_in_order_and_stops_on_signal() {
        let (thermostat_tx, thermostat_rx) = mpsc::channel(8);
        let (sensor_tx, sensor_rx) = mpsc::channel(8);
        let (offset_tx, mut offset_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(());

        let task = tokio::spawn(run_decision_loop(
            "test".to_string(),
            thermostat_rx,
            sensor_rx,
            offset_tx,
            stop_rx,
        ));

        thermostat_tx.send(thermostat(17.0, 0.0)).await.unwrap();
        sensor_tx.send(sensor(21.6)).await.unwrap();
        assert_eq!(offset_rx.recv().await, Some(4.5));

        sensor_tx.send(sensor(22.6)).await.unwrap();
        assert_eq!(offset_rx.recv().await, Some(5.5));

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("decision loop did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn loop_survives_one_closed_input() {
        let (thermostat_tx, thermostat_rx) = mpsc::channel(8);
        let (sensor_tx, sensor_rx) = mpsc::channel(8);
        let (offset_tx, mut offset_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(());

        let task = tokio::spawn(run_decision_loop(
            "test".to_string(),
            thermostat_rx,
            sensor_rx,
            offset_tx,
            stop_rx,
        ));

        thermostat_tx.send(thermostat(17.0, 0.0)).await.unwrap();
        drop(thermostat_tx);

        // Sensor updates still drive recalibration.
        sensor_tx.send(sensor(21.6)).await.unwrap();
        assert_eq!(offset_rx.recv().await, Some(4.5));

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("decision loop did not stop")
            .unwrap();
    }
}
