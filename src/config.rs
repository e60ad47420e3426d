//! Service configuration.
//!
//! Loaded once at startup from a YAML file and shared read-only with the
//! manager and its pair coordinators. Topic composition lives here so that
//! the coordinator only ever sees fully qualified topic strings.

use std::path::Path;

use serde::Deserialize;

use crate::Result;

/// Top-level configuration: one broker, any number of device pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub paired_devices: Vec<PairConfig>,
}

/// Broker connection settings shared by every pair.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    /// Prefix for every subscription and publish topic.
    pub base_topic: String,
    #[serde(default = "default_qos")]
    pub qos: u8,
    /// Pacing delay in seconds for the manual-test publisher.
    #[serde(default)]
    pub delay: u64,
}

fn default_qos() -> u8 {
    1
}

/// One (reference sensor, thermostat) association.
#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    pub name: String,
    pub sensor_topic: String,
    pub thermostat_topic: String,
    pub calibration_sub_topic: String,
}

impl Config {
    /// Loads and parses the configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}

impl PairConfig {
    /// Full topic the thermostat reports its state on.
    pub fn thermostat_state_topic(&self, base: &str) -> String {
        format!("{base}/{}", self.thermostat_topic)
    }

    /// Full topic the reference sensor reports on.
    pub fn sensor_state_topic(&self, base: &str) -> String {
        format!("{base}/{}", self.sensor_topic)
    }

    /// Full topic calibration offsets are published to.
    pub fn calibration_topic(&self, base: &str) -> String {
        format!(
            "{base}/{}/{}",
            self.thermostat_topic, self.calibration_sub_topic
        )
    }

    /// Client identity for the thermostat subscription connection.
    pub fn thermostat_client_id(&self) -> String {
        format!("{}-subscriber", self.thermostat_topic)
    }

    /// Client identity for the sensor subscription connection.
    pub fn sensor_client_id(&self) -> String {
        format!("{}-subscriber", self.sensor_topic)
    }

    /// Client identity for the calibration publish connection.
    pub fn publisher_client_id(&self) -> String {
        format!("{}-publisher", self.thermostat_topic)
    }
}
