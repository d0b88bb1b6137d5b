//! Configuration for the serial bridge.

use serde::{Deserialize, Serialize};
use serialgw_bridge_framework::{BridgeConfig, BridgeError, LoggingConfig, MqttConfig};
use serialgw_common::TopicScheme;
use serialgw_common::topic::{TOPIC_ROOT, validate_root};

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialBridgeConfig {
    /// MQTT broker settings
    pub mqtt: MqttConfig,

    /// Serial device settings
    pub serial: SerialConfig,

    /// Topic layout and status reporting
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyAMA0" or "COM1")
    pub device: String,

    /// Baud rate (default: 115200)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Data bits, 5-8 (default: 8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// Parity (default: none)
    #[serde(default)]
    pub parity: Parity,

    /// Stop bits, 1 or 2 (default: 1)
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    /// Discard bytes buffered by the device before the bridge started
    #[serde(default = "default_true")]
    pub flush_on_open: bool,

    /// Longest line read in one piece; longer lines are split
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_baud_rate() -> u32 {
    115200
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_true() -> bool {
    true
}

fn default_max_line_length() -> usize {
    512
}

/// Serial parity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Topic layout and status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// First topic segment (default: "sensors")
    #[serde(default = "default_topic_root")]
    pub topic_root: String,

    /// Retained status topic; also used for the last will
    #[serde(default)]
    pub status_topic: Option<String>,
}

fn default_topic_root() -> String {
    TOPIC_ROOT.to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            topic_root: default_topic_root(),
            status_topic: None,
        }
    }
}

impl GatewayConfig {
    /// Topic scheme for the configured root.
    pub fn topic_scheme(&self) -> TopicScheme {
        TopicScheme::new(self.topic_root.clone())
    }
}

impl SerialConfig {
    /// Validate the serial settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.device.is_empty() {
            return Err("serial.device is required".to_string());
        }
        if self.baud_rate == 0 {
            return Err("serial.baud_rate must be greater than 0".to_string());
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(format!(
                "serial.data_bits must be 5-8, got {}",
                self.data_bits
            ));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(format!(
                "serial.stop_bits must be 1 or 2, got {}",
                self.stop_bits
            ));
        }
        if self.max_line_length == 0 {
            return Err("serial.max_line_length must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl BridgeConfig for SerialBridgeConfig {
    fn mqtt(&self) -> &MqttConfig {
        &self.mqtt
    }

    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn status_topic(&self) -> Option<&str> {
        self.gateway.status_topic.as_deref()
    }

    fn validate(&self) -> serialgw_bridge_framework::Result<()> {
        self.mqtt
            .validate()
            .map_err(|e| BridgeError::validation(e.to_string()))?;
        self.serial.validate().map_err(BridgeError::validation)?;
        validate_root(&self.gateway.topic_root)
            .map_err(|e| BridgeError::validation(format!("gateway.{}", e)))?;

        if let Some(topic) = &self.gateway.status_topic {
            if topic.is_empty() || topic.contains(['+', '#']) {
                return Err(BridgeError::validation(format!(
                    "gateway.status_topic '{}' must be a non-empty topic without wildcards",
                    topic
                )));
            }
        }

        Ok(())
    }
}
