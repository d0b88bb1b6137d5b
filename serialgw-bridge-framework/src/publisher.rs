//! Message publisher for MQTT.

use rumqttc::{AsyncClient, QoS};

use crate::error::{BridgeError, Result};

/// Something bridge workers can publish `(topic, payload)` pairs to.
///
/// Implemented by [`Publisher`] for the real broker; tests substitute a
/// recording implementation.
pub trait BusPublisher {
    /// Queue one message for publishing without waiting on the broker.
    fn publish(&self, topic: &str, payload: &str) -> Result<()>;

    /// Publish a batch of messages.
    ///
    /// Returns the number of successfully queued messages and logs errors.
    fn publish_batch<'a, I>(&self, messages: I) -> PublishStats
    where
        I: IntoIterator<Item = (String, &'a str)>,
    {
        let mut stats = PublishStats::default();

        for (topic, payload) in messages {
            match self.publish(&topic, payload) {
                Ok(()) => {
                    stats.success += 1;
                    tracing::debug!(topic = %topic, payload = %payload, "Published");
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!(error = %e, "Failed to publish message");
                }
            }
        }

        stats
    }
}

/// Publisher for sending messages to the MQTT broker.
///
/// Wraps an MQTT client handle. Publishing never blocks: when the client
/// request queue is full (broker unreachable), the publish fails and the
/// message is dropped.
#[derive(Clone, Debug)]
pub struct Publisher {
    client: AsyncClient,
    qos: QoS,
}

impl Publisher {
    /// Create a new publisher.
    pub fn new(client: AsyncClient, qos: QoS) -> Self {
        Self { client, qos }
    }

    /// Publish raw bytes to a topic with the retain flag set.
    pub fn publish_retained(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .try_publish(topic, self.qos, true, payload)
            .map_err(|e| BridgeError::publish(topic, e))
    }

    /// Publish a JSON value to a topic with the retain flag set.
    pub fn publish_json<T: serde::Serialize>(&self, topic: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_vec(value)?;
        self.publish_retained(topic, payload)
    }
}

impl BusPublisher for Publisher {
    fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        self.client
            .try_publish(topic, self.qos, false, payload.as_bytes().to_vec())
            .map_err(|e| BridgeError::publish(topic, e))
    }
}

/// Statistics from a batch publish operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    /// Number of successfully published messages.
    pub success: usize,
    /// Number of failed publishes.
    pub failed: usize,
}

impl PublishStats {
    /// Total number of attempted publishes.
    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Accepts everything except topics ending in `/fail`.
    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl BusPublisher for Recording {
        fn publish(&self, topic: &str, payload: &str) -> Result<()> {
            if topic.ends_with("/fail") {
                return Err(BridgeError::publish(topic, "rejected"));
            }
            self.sent
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_publish_batch_counts_failures() {
        let recording = Recording::default();
        let stats = recording.publish_batch(vec![
            ("sensors/</5/Temperature".to_string(), "20.6"),
            ("sensors/</5/fail".to_string(), "x"),
            ("sensors/</5/Battery".to_string(), "LOW"),
        ]);

        assert_eq!(stats, PublishStats { success: 2, failed: 1 });
        assert_eq!(recording.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_publish_stats_total() {
        let mut stats = PublishStats::default();
        assert_eq!(stats.total(), 0);

        stats.success = 8;
        stats.failed = 2;
        assert_eq!(stats.total(), 10);
    }

    #[test]
    fn test_publisher_queue_full() {
        let options = rumqttc::MqttOptions::new("test", "localhost", 1883);
        let (client, _eventloop) = AsyncClient::new(options, 1);
        let publisher = Publisher::new(client, QoS::AtMostOnce);

        // Nothing drains the queue, so the second publish has no room.
        assert!(publisher.publish("sensors/</5/A", "1").is_ok());
        let err = publisher.publish("sensors/</5/B", "2").unwrap_err();
        assert!(matches!(err, BridgeError::Publish { ref topic, .. } if topic == "sensors/</5/B"));
    }
}
