//! Transport implementations.
//!
//! This module provides concrete implementations of the domain-level
//! `Connector`/`Connection` traits: an in-process broker used by the
//! tests and an MQTT transport for production.
//!
//! Domain and pair code must not depend on transport-specific types.

mod memory;
mod mqtt;

pub use memory::MemoryBroker;
pub use mqtt::MqttConnector;
