// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! This module defines the message-bus interface consumed by the pair
//! coordinator. It intentionally avoids any reference to concrete
//! protocols, brokers, or client libraries; concrete implementations live
//! under `src/transport/`.
//!
//! The transport layer is responsible only for delivering opaque payload
//! bytes to and from topics. Decoding, deduplication, and calibration
//! semantics are handled by the pair layer.
//!
//! Connections are exclusive to a single task: each subscriber task and
//! each publisher task opens its own connection and never shares it, so
//! no implementation needs to defend against concurrent use of a single
//! broker session.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::Result;

/// Handle returned from a successful subscription.
///
/// The subscription remains active until the owning connection is
/// disconnected or the handle is dropped.
pub struct SubscriptionHandle {
    /// Receiver channel for raw payloads arriving on the subscribed topic.
    pub inbox: mpsc::Receiver<Bytes>,
}

/// One live broker connection.
///
/// Implementations must ensure that once `subscribe()` returns
/// successfully, payloads published to the topic after that point are
/// deliverable through the handle's inbox, and that `publish()` hands the
/// payload to the broker before returning.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    /// Subscribe to a topic. At most one subscription per connection.
    async fn subscribe(&self, topic: &str, qos: u8) -> Result<SubscriptionHandle>;

    /// Publish a payload to a topic.
    async fn publish(&self, topic: &str, qos: u8, payload: Bytes) -> Result<()>;

    /// Release the connection and any background work it owns.
    async fn disconnect(&self);
}

/// Factory for broker connections.
///
/// The broker address is fixed at construction; `connect` only supplies
/// the client identity, so one connector serves every task of every pair.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, client_id: &str) -> Result<ConnectionPtr>;
}

/// Shared connection pointer.
pub type ConnectionPtr = Arc<dyn Connection>;

/// Shared connector pointer.
pub type ConnectorPtr = Arc<dyn Connector>;
