//! Bridge status reporting.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::publisher::Publisher;

/// Bridge status information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    /// Bridge name (e.g., "serial").
    pub bridge: String,
    /// Bridge version.
    pub version: String,
    /// Current status ("running", "offline", "error").
    pub status: String,
    /// When the status was produced (millis since epoch).
    pub timestamp: i64,
    /// Additional metadata (bridge-specific).
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl BridgeStatus {
    fn with_state(bridge: impl Into<String>, version: impl Into<String>, status: &str) -> Self {
        Self {
            bridge: bridge.into(),
            version: version.into(),
            status: status.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a new status with "running" state.
    pub fn running(bridge: impl Into<String>, version: impl Into<String>) -> Self {
        Self::with_state(bridge, version, "running")
    }

    /// Create a status with "offline" state.
    pub fn offline(bridge: impl Into<String>, version: impl Into<String>) -> Self {
        Self::with_state(bridge, version, "offline")
    }

    /// Create a status with "error" state.
    pub fn error(
        bridge: impl Into<String>,
        version: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::with_state(bridge, version, "error")
            .with_metadata(serde_json::json!({ "error": error.into() }))
    }

    /// Add metadata to the status.
    ///
    /// Object fields are merged into the status; other values are ignored.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = metadata {
            self.metadata.extend(map);
        }
        self
    }

    /// Publish this status, retained, to `topic`.
    pub fn publish(&self, publisher: &Publisher, topic: &str) -> Result<()> {
        publisher.publish_json(topic, self)
    }
}

/// Helper to publish bridge status on startup and shutdown.
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    publisher: Publisher,
    topic: String,
    bridge_name: String,
    version: String,
}

impl StatusPublisher {
    /// Create a new status publisher.
    pub fn new(
        publisher: Publisher,
        topic: impl Into<String>,
        bridge_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            bridge_name: bridge_name.into(),
            version: version.into(),
        }
    }

    /// Topic the status is published to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish "running" status with optional metadata.
    pub fn publish_running(&self, metadata: Option<serde_json::Value>) -> Result<()> {
        let mut status = BridgeStatus::running(&self.bridge_name, &self.version);
        if let Some(meta) = metadata {
            status = status.with_metadata(meta);
        }
        status.publish(&self.publisher, &self.topic)
    }

    /// Publish "offline" status with optional metadata.
    pub fn publish_offline(&self, metadata: Option<serde_json::Value>) -> Result<()> {
        let mut status = BridgeStatus::offline(&self.bridge_name, &self.version);
        if let Some(meta) = metadata {
            status = status.with_metadata(meta);
        }
        status.publish(&self.publisher, &self.topic)
    }

    /// Publish "error" status.
    pub fn publish_error(&self, error: impl Into<String>) -> Result<()> {
        BridgeStatus::error(&self.bridge_name, &self.version, error)
            .publish(&self.publisher, &self.topic)
    }
}

/// Payload for the broker-side last will: an "offline" status.
pub fn last_will_payload(bridge: &str, version: &str) -> Vec<u8> {
    serde_json::to_vec(&BridgeStatus::offline(bridge, version)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_running() {
        let status = BridgeStatus::running("serial", "0.1.0");
        assert_eq!(status.bridge, "serial");
        assert_eq!(status.status, "running");
        assert!(status.timestamp > 0);
    }

    #[test]
    fn test_status_with_metadata() {
        let status = BridgeStatus::running("serial", "0.1.0").with_metadata(serde_json::json!({
            "device": "/dev/ttyAMA0",
            "baud_rate": 115200
        }));

        assert_eq!(status.metadata["device"], "/dev/ttyAMA0");
        assert_eq!(status.metadata["baud_rate"], 115200);
    }

    #[test]
    fn test_status_serialization() {
        let status =
            BridgeStatus::running("test", "1.0.0").with_metadata(serde_json::json!({ "count": 5 }));

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"bridge\":\"test\""));
        assert!(json.contains("\"status\":\"running\""));
        assert!(json.contains("\"count\":5"));
    }

    #[test]
    fn test_error_status() {
        let status = BridgeStatus::error("serial", "1.0.0", "device unplugged");
        assert_eq!(status.status, "error");
        assert_eq!(status.metadata["error"], "device unplugged");
    }

    #[test]
    fn test_last_will_payload() {
        let payload = last_will_payload("serial", "1.0.0");
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["status"], "offline");
        assert_eq!(value["bridge"], "serial");
    }
}
