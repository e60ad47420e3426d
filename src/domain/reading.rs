// src/domain/reading.rs

//! Wire payloads and decoded readings.
//!
//! The wire structs mirror the JSON the devices actually put on the bus;
//! field names are part of the external contract and must not change.
//! The reading structs are what the decision loop consumes.

use serde::{Deserialize, Serialize};

/// JSON payload on a thermostat state topic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThermostatPayload {
    pub local_temperature: f64,
    pub local_temperature_calibration: f64,
}

/// JSON payload on a sensor state topic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensorPayload {
    pub temperature: f64,
}

/// A thermostat's self-reported temperature and the offset it is
/// currently applying.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermostatReading {
    pub temperature: f64,
    pub calibration: f64,
}

impl ThermostatReading {
    /// The raw temperature the device measured, before its own
    /// correction was applied.
    pub fn measured(&self) -> f64 {
        self.temperature - self.calibration
    }
}

impl From<ThermostatPayload> for ThermostatReading {
    fn from(payload: ThermostatPayload) -> Self {
        Self {
            temperature: payload.local_temperature,
            calibration: payload.local_temperature_calibration,
        }
    }
}

/// Ground-truth temperature from the reference sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f64,
}

impl From<SensorPayload> for SensorReading {
    fn from(payload: SensorPayload) -> Self {
        Self {
            temperature: payload.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thermostat_payload_field_names() {
        let payload: ThermostatPayload =
            serde_json::from_str(r#"{"local_temperature": 21.5, "local_temperature_calibration": 0.5}"#)
                .unwrap();

        let reading = ThermostatReading::from(payload);
        assert_eq!(reading.temperature, 21.5);
        assert_eq!(reading.calibration, 0.5);
        assert_eq!(reading.measured(), 21.0);
    }

    #[test]
    fn sensor_payload_field_names() {
        let payload: SensorPayload = serde_json::from_str(r#"{"temperature": 19.3}"#).unwrap();
        assert_eq!(SensorReading::from(payload).temperature, 19.3);
    }

    #[test]
    fn measured_subtracts_negative_calibration() {
        let reading = ThermostatReading {
            temperature: 20.0,
            calibration: -1.5,
        };
        assert_eq!(reading.measured(), 21.5);
    }
}
