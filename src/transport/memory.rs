// src/transport/memory.rs

//! In-memory transport implementation.
//!
//! This transport simulates a message broker entirely within the process.
//! It is the reference implementation of transport semantics and is what
//! the integration tests run the full calibrator against, without
//! introducing network, broker, or timing-related variability.
//!
//! ## Semantics
//!
//! - Subscriptions are registered immediately.
//! - Once `subscribe()` returns, subsequent matching publishes are
//!   deliverable.
//! - Topic matching is exact string equality; no wildcard support.
//! - Dropping a `SubscriptionHandle` implicitly dead-letters further
//!   deliveries to it.
//!
//! ## Non-Goals
//!
//! - Persistence, durability, or QoS emulation
//! - Network behavior or failure simulation

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, RwLock};

use crate::domain::{Connection, ConnectionPtr, Connector, SubscriptionHandle};
use crate::Result;

type TopicMap = Arc<RwLock<HashMap<String, Vec<mpsc::Sender<Bytes>>>>>;

const INBOX_CAPACITY: usize = 16;

/// In-process broker shared by every connection it hands out.
#[derive(Default)]
pub struct MemoryBroker {
    topics: TopicMap,
}

impl MemoryBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of registered subscriptions for a topic.
    ///
    /// Lets tests wait for the calibrator's subscriber tasks to come up
    /// before publishing, instead of sleeping.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().await.get(topic).map_or(0, Vec::len)
    }
}

#[async_trait::async_trait]
impl Connector for MemoryBroker {
    async fn connect(&self, _client_id: &str) -> Result<ConnectionPtr> {
        Ok(Arc::new(MemoryConnection {
            topics: Arc::clone(&self.topics),
        }))
    }
}

/// A connection into the shared in-process broker.
struct MemoryConnection {
    topics: TopicMap,
}

#[async_trait::async_trait]
impl Connection for MemoryConnection {
    async fn subscribe(&self, topic: &str, _qos: u8) -> Result<SubscriptionHandle> {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);

        let mut topics = self.topics.write().await;
        topics.entry(topic.to_string()).or_default().push(tx);

        Ok(SubscriptionHandle { inbox: rx })
    }

    /// Deliver the payload to every subscription on exactly this topic.
    async fn publish(&self, topic: &str, _qos: u8, payload: Bytes) -> Result<()> {
        let topics = self.topics.read().await;

        if let Some(senders) = topics.get(topic) {
            for sender in senders {
                // A closed channel means the handle was dropped; skip it.
                let _ = sender.send(payload.clone()).await;
            }
        }

        Ok(())
    }

    async fn disconnect(&self) {
        // Nothing held beyond the shared map; subscriptions die with
        // their handles.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectorPtr;

    #[tokio::test]
    async fn delivers_to_matching_subscription() {
        let broker = MemoryBroker::new();
        let connector: ConnectorPtr = broker.clone();

        let sub_conn = connector.connect("sub").await.unwrap();
        let mut handle = sub_conn.subscribe("a/b", 0).await.unwrap();

        let pub_conn = connector.connect("pub").await.unwrap();
        pub_conn
            .publish("a/b", 0, Bytes::from_static(b"hello"))
            .await
            .unwrap();

        assert_eq!(handle.inbox.recv().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn matching_is_exact() {
        let broker = MemoryBroker::new();
        let connector: ConnectorPtr = broker.clone();

        let sub_conn = connector.connect("sub").await.unwrap();
        let mut handle = sub_conn.subscribe("a/b", 0).await.unwrap();

        let pub_conn = connector.connect("pub").await.unwrap();
        pub_conn
            .publish("a/b/c", 0, Bytes::from_static(b"nope"))
            .await
            .unwrap();
        pub_conn
            .publish("a", 0, Bytes::from_static(b"nope"))
            .await
            .unwrap();

        assert!(handle.inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn counts_subscribers() {
        let broker = MemoryBroker::new();

        assert_eq!(broker.subscriber_count("t").await, 0);

        let conn = broker.connect("c").await.unwrap();
        let _handle = conn.subscribe("t", 0).await.unwrap();

        assert_eq!(broker.subscriber_count("t").await, 1);
    }
}
