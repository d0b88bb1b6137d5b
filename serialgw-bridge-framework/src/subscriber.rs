//! MQTT event loop driver and inbound message delivery.

use std::time::Duration;

use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Outgoing, Packet, QoS};
use serialgw_common::session::{SOCKET_ERROR, connection_result_code, connection_result_reason};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A message received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Payload as UTF-8 text.
    pub fn payload_str(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload)
    }
}

impl From<rumqttc::Publish> for BusMessage {
    fn from(publish: rumqttc::Publish) -> Self {
        Self {
            topic: publish.topic,
            payload: publish.payload.to_vec(),
        }
    }
}

/// Log a connection result the way operators expect to read it.
pub fn log_connection_result(code: i32) {
    let reason = connection_result_reason(code);
    if code == 0 {
        info!(code, reason, "Connected to MQTT broker");
    } else {
        error!(code, reason, "MQTT connection failed");
    }
}

/// Drives the MQTT event loop.
///
/// - Subscribes to every registered filter on each successful CONNACK, so a
///   reconnect restores the subscriptions.
/// - Forwards incoming publishes to a channel without ever waiting on the
///   consumer; messages are dropped when the channel is full.
/// - Pauses between failed polls; the event loop reconnects on the next poll.
pub struct EventLoopDriver {
    eventloop: EventLoop,
    client: AsyncClient,
    filters: Vec<String>,
    qos: QoS,
    reconnect_delay: Duration,
    inbound: mpsc::Sender<BusMessage>,
}

impl EventLoopDriver {
    /// Create a driver that forwards publishes to `inbound`.
    pub fn new(
        eventloop: EventLoop,
        client: AsyncClient,
        qos: QoS,
        reconnect_delay: Duration,
        inbound: mpsc::Sender<BusMessage>,
    ) -> Self {
        Self {
            eventloop,
            client,
            filters: Vec::new(),
            qos,
            reconnect_delay,
            inbound,
        }
    }

    /// Register a topic filter to subscribe to on every connection.
    pub fn subscribe(&mut self, filter: impl Into<String>) {
        self.filters.push(filter.into());
    }

    /// Registered topic filters.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Poll the event loop until the client disconnects.
    pub async fn run(mut self) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    let code = connection_result_code(ack.code);
                    log_connection_result(code);
                    if code == 0 {
                        self.subscribe_all();
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.deliver(BusMessage::from(publish));
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    debug!(pkid = ack.pkid, "Subscription acknowledged");
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    info!("Disconnected from MQTT broker");
                    break;
                }
                Ok(_) => {}
                Err(ConnectionError::ConnectionRefused(code)) => {
                    log_connection_result(connection_result_code(code));
                    tokio::time::sleep(self.reconnect_delay).await;
                }
                Err(e) => {
                    error!(
                        code = SOCKET_ERROR,
                        reason = connection_result_reason(SOCKET_ERROR),
                        error = %e,
                        "MQTT connection error, retrying in {:?}",
                        self.reconnect_delay
                    );
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    fn subscribe_all(&self) {
        for filter in &self.filters {
            match self.client.try_subscribe(filter.as_str(), self.qos) {
                Ok(()) => info!(filter = %filter, "Subscribed"),
                Err(e) => error!(filter = %filter, error = %e, "Failed to subscribe"),
            }
        }
    }

    fn deliver(&self, message: BusMessage) {
        match self.inbound.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!(topic = %message.topic, "Inbound queue full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                debug!(topic = %message.topic, "No inbound consumer, dropping message");
            }
        }
    }
}
