//! Keeps smart thermostats calibrated against independent reference
//! sensors over an MQTT bus.
//!
//! The service subscribes to each thermostat's state topic and its paired
//! sensor's state topic. Whenever either reading changes, it computes a
//! quantized calibration offset and publishes it back on the thermostat's
//! calibration sub-topic. Per pair, all readings flow through a single
//! decision loop task, so state needs no locks and offsets are emitted in
//! a deterministic order.
//!
//! The message bus is consumed through the narrow [`Connector`] /
//! [`Connection`] interface; [`MqttConnector`] talks to a real broker and
//! [`MemoryBroker`] provides in-process reference semantics for tests.

// Import all sub modules once...
mod calibrate;
mod config;
mod domain;
mod error;
mod manager;
mod pair;
mod transport;

// Re-export main types
pub use calibrate::calibrate;
pub use config::{Config, MqttConfig, PairConfig};
pub use error::{Error, Result};
pub use manager::CalibrationManager;
pub use pair::{PairCoordinator, PairState};

pub use transport::{MemoryBroker, MqttConnector};

// --- public re-exports
pub use domain::{
    //
    Connection,
    ConnectionPtr,
    Connector,
    ConnectorPtr,
    SensorPayload,
    SensorReading,
    SubscriptionHandle,
    ThermostatPayload,
    ThermostatReading,
};
