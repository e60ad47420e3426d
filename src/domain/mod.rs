//! Domain layer public interface.
//!
//! This module defines domain-level abstractions that are independent of
//! transport implementations, protocols, or infrastructure concerns.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod reading;
mod transport;

pub use reading::{SensorPayload, SensorReading, ThermostatPayload, ThermostatReading};

pub use transport::{
    //
    Connection,
    ConnectionPtr,
    Connector,
    ConnectorPtr,
    SubscriptionHandle,
};
