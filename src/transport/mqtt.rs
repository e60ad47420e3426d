// src/transport/mqtt.rs

//! MQTT transport implementation using `rumqttc`.
//!
//! Each `connect()` call opens an independent broker connection driven by
//! its own background **actor task** that owns the MQTT `EventLoop`. The
//! actor is responsible for:
//!
//! - publishing outbound messages via `AsyncClient`,
//! - registering the broker subscription,
//! - polling the `EventLoop` for incoming publishes,
//! - clean shutdown of the connection.
//!
//! All interaction with the MQTT client is serialized through the actor's
//! command channel; no other task ever touches the event loop directly.
//!
//! ## Connection behavior
//!
//! `connect()` resolves only once the broker has answered the initial
//! handshake: a successful ConnAck returns a live connection, a refused
//! ConnAck or a transport error surfaces as [`Error::Connect`]. After the
//! handshake, event loop errors are logged and polling continues (rumqttc
//! re-establishes the session on the next poll); on reconnect the actor
//! re-issues its subscription.
//!
//! ## Subscription confirmation
//!
//! `subscribe()` waits for SUBACK confirmation before returning. A
//! connection carries at most one subscription (the calibrator opens one
//! connection per subscriber task), so a single pending slot is enough to
//! correlate the SUBACK.

use std::time::Duration;

use bytes::Bytes;
use rumqttc::{
    //
    AsyncClient,
    ConnectReturnCode,
    Event,
    EventLoop,
    MqttOptions,
    Packet,
    QoS,
    SubscribeReasonCode,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{Connection, ConnectionPtr, Connector, SubscriptionHandle};
use crate::{Error, Result};

const EVENT_LOOP_PAUSE: Duration = Duration::from_secs(2);
const INBOX_CAPACITY: usize = 16;
const CMD_CAPACITY: usize = 8;
const EVENT_LOOP_REQUEST_CAPACITY: usize = 10;

/// Connector that opens one rumqttc connection per `connect()` call.
pub struct MqttConnector {
    host: String,
    port: u16,
}

impl MqttConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Arc<Self> {
        Arc::new(Self {
            host: host.into(),
            port,
        })
    }
}

#[async_trait::async_trait]
impl Connector for MqttConnector {
    async fn connect(&self, client_id: &str) -> Result<ConnectionPtr> {
        let options = MqttOptions::new(client_id, &self.host, self.port);
        let (client, event_loop) = AsyncClient::new(options, EVENT_LOOP_REQUEST_CAPACITY);

        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();

        let actor = ConnectionActor {
            client_id: client_id.to_string(),
            client,
            event_loop,
            cmd_rx,
            subscriber: None,
            subscribed: None,
            pending_subscribe: None,
            ready: Some(ready_tx),
            reconnect: false,
        };

        let driver = tokio::spawn(actor.run());

        // Resolved by the actor on the first ConnAck or handshake error.
        ready_rx.await.map_err(|_| Error::Connect {
            client_id: client_id.to_string(),
            reason: "connection actor exited during handshake".to_string(),
        })??;

        Ok(Arc::new(MqttConnection {
            cmd_tx,
            driver: Mutex::new(Some(driver)),
        }))
    }
}

//
// Actor commands
//

enum Cmd {
    Subscribe {
        topic: String,
        qos: QoS,
        resp: oneshot::Sender<Result<SubscriptionHandle>>,
    },
    Publish {
        topic: String,
        qos: QoS,
        payload: Bytes,
        resp: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        resp: oneshot::Sender<()>,
    },
}

enum ActorStep {
    Continue,
    Stop,
}

/// MQTT-backed implementation of the `Connection` trait.
///
/// Thin handle; all broker interaction happens in the actor task.
struct MqttConnection {
    cmd_tx: mpsc::Sender<Cmd>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait::async_trait]
impl Connection for MqttConnection {
    async fn subscribe(&self, topic: &str, qos: u8) -> Result<SubscriptionHandle> {
        let (resp_tx, resp_rx) = oneshot::channel();

        self.cmd_tx
            .send(Cmd::Subscribe {
                topic: topic.to_string(),
                qos: to_qos(qos),
                resp: resp_tx,
            })
            .await
            .map_err(|_| Error::ChannelClosed)?;

        resp_rx.await.map_err(|_| Error::ChannelClosed)?
    }

    async fn publish(&self, topic: &str, qos: u8, payload: Bytes) -> Result<()> {
        let (resp_tx, resp_rx) = oneshot::channel();

        self.cmd_tx
            .send(Cmd::Publish {
                topic: topic.to_string(),
                qos: to_qos(qos),
                payload,
                resp: resp_tx,
            })
            .await
            .map_err(|_| Error::ChannelClosed)?;

        resp_rx.await.map_err(|_| Error::ChannelClosed)?
    }

    async fn disconnect(&self) {
        let (resp_tx, resp_rx) = oneshot::channel();

        let _ = self.cmd_tx.send(Cmd::Disconnect { resp: resp_tx }).await;
        let _ = resp_rx.await;

        if let Some(driver) = self.driver.lock().await.take() {
            let _ = driver.await;
        }
    }
}

struct ConnectionActor {
    client_id: String,
    client: AsyncClient,
    event_loop: EventLoop,
    cmd_rx: mpsc::Receiver<Cmd>,
    /// Inbox sender for the connection's single subscription.
    subscriber: Option<mpsc::Sender<Bytes>>,
    /// Confirmed subscription, re-issued after a reconnect.
    subscribed: Option<(String, QoS)>,
    /// Subscription awaiting SUBACK.
    pending_subscribe: Option<PendingSubscribe>,
    /// Resolves the caller of `connect()` after the handshake.
    ready: Option<oneshot::Sender<Result<()>>>,
    reconnect: bool,
}

struct PendingSubscribe {
    topic: String,
    qos: QoS,
    inbox: mpsc::Receiver<Bytes>,
    resp: oneshot::Sender<Result<SubscriptionHandle>>,
}

impl ConnectionActor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if matches!(self.handle_cmd(cmd).await, ActorStep::Stop) {
                                break;
                            }
                        }
                        // All connection handles dropped.
                        None => break,
                    }
                }

                event = self.event_loop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            self.handle_incoming(publish.payload);
                        }
                        Ok(Event::Incoming(Packet::SubAck(suback))) => {
                            self.handle_suback(suback);
                        }
                        Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                            if !self.handle_connack(connack).await {
                                break;
                            }
                        }
                        Ok(_event) => {
                            debug!(client_id = %self.client_id, "ignoring mqtt event");
                        }
                        Err(err) => {
                            if let Some(ready) = self.ready.take() {
                                // Handshake never completed; report and stop.
                                let _ = ready.send(Err(Error::Connect {
                                    client_id: self.client_id.clone(),
                                    reason: err.to_string(),
                                }));
                                break;
                            }
                            self.reconnect = true;
                            error!(client_id = %self.client_id, %err, "mqtt event loop error");
                            tokio::time::sleep(EVENT_LOOP_PAUSE).await;
                        }
                    }
                }
            }
        }
    }

    async fn handle_cmd(&mut self, cmd: Cmd) -> ActorStep {
        match cmd {
            Cmd::Subscribe { topic, qos, resp } => {
                self.handle_subscribe(topic, qos, resp).await;
                ActorStep::Continue
            }
            Cmd::Publish {
                topic,
                qos,
                payload,
                resp,
            } => {
                let _ = resp.send(self.handle_publish(topic, qos, payload).await);
                ActorStep::Continue
            }
            Cmd::Disconnect { resp } => {
                if let Err(err) = self.client.disconnect().await {
                    debug!(client_id = %self.client_id, %err, "mqtt disconnect failed");
                }
                let _ = resp.send(());
                ActorStep::Stop
            }
        }
    }

    async fn handle_publish(&mut self, topic: String, qos: QoS, payload: Bytes) -> Result<()> {
        self.client
            .publish(&topic, qos, false, payload)
            .await
            .map_err(|err| Error::Publish {
                topic,
                reason: err.to_string(),
            })
    }

    /// Sends the subscribe request and parks the responder until SUBACK.
    async fn handle_subscribe(
        &mut self,
        topic: String,
        qos: QoS,
        resp: oneshot::Sender<Result<SubscriptionHandle>>,
    ) {
        if self.subscribed.is_some() || self.pending_subscribe.is_some() {
            let _ = resp.send(Err(Error::Subscribe {
                topic,
                reason: "connection already carries a subscription".to_string(),
            }));
            return;
        }

        if let Err(err) = self.client.subscribe(&topic, qos).await {
            let _ = resp.send(Err(Error::Subscribe {
                topic,
                reason: err.to_string(),
            }));
            return;
        }

        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        self.subscriber = Some(tx);
        self.pending_subscribe = Some(PendingSubscribe {
            topic,
            qos,
            inbox: rx,
            resp,
        });
    }

    fn handle_suback(&mut self, suback: rumqttc::SubAck) {
        let Some(pending) = self.pending_subscribe.take() else {
            // SUBACK for a reconnect re-subscribe.
            debug!(client_id = %self.client_id, "suback for re-subscribe");
            return;
        };

        let accepted = suback
            .return_codes
            .iter()
            .all(|code| !matches!(code, SubscribeReasonCode::Failure));

        if accepted {
            info!(client_id = %self.client_id, topic = %pending.topic, "subscribed");
            self.subscribed = Some((pending.topic, pending.qos));
            let _ = pending.resp.send(Ok(SubscriptionHandle {
                inbox: pending.inbox,
            }));
        } else {
            self.subscriber = None;
            let _ = pending.resp.send(Err(Error::Subscribe {
                topic: pending.topic,
                reason: format!("broker refused: {:?}", suback.return_codes),
            }));
        }
    }

    /// Returns false when the handshake failed and the actor should stop.
    async fn handle_connack(&mut self, connack: rumqttc::ConnAck) -> bool {
        if connack.code != ConnectReturnCode::Success {
            let reason = format!("broker refused connection: {:?}", connack.code);
            error!(client_id = %self.client_id, %reason, "mqtt connect failed");

            if let Some(ready) = self.ready.take() {
                let _ = ready.send(Err(Error::Connect {
                    client_id: self.client_id.clone(),
                    reason,
                }));
            }
            return false;
        }

        info!(client_id = %self.client_id, "connected to broker");

        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Ok(()));
        }

        if self.reconnect {
            self.reconnect = false;
            if let Some((topic, qos)) = self.subscribed.clone() {
                if let Err(err) = self.client.subscribe(&topic, qos).await {
                    error!(client_id = %self.client_id, %topic, %err, "re-subscribe failed");
                }
            }
        }

        true
    }

    fn handle_incoming(&self, payload: Bytes) {
        let Some(subscriber) = &self.subscriber else {
            return;
        };

        if subscriber.try_send(payload).is_err() {
            warn!(client_id = %self.client_id, "inbox full or closed, message dropped");
        }
    }
}

fn to_qos(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}
