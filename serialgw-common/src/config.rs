use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Common MQTT broker connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or IP address.
    pub broker_address: String,

    /// Broker TCP port.
    #[serde(default = "default_broker_port")]
    pub broker_port: u16,

    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Client identifier; generated from the process id when absent.
    #[serde(default)]
    pub client_id: Option<String>,

    /// QoS used for publishing and subscribing (0, 1 or 2).
    #[serde(default)]
    pub qos: u8,

    /// Depth of the client request queue.
    #[serde(default = "default_request_capacity")]
    pub request_capacity: usize,

    /// Pause between failed event loop polls while the broker is unreachable.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

fn default_broker_port() -> u16 {
    1883
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_request_capacity() -> usize {
    64
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

impl MqttConfig {
    /// Create a configuration for a broker with default settings.
    pub fn new(broker_address: impl Into<String>) -> Self {
        Self {
            broker_address: broker_address.into(),
            broker_port: default_broker_port(),
            keep_alive_secs: default_keep_alive_secs(),
            client_id: None,
            qos: 0,
            request_capacity: default_request_capacity(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }

    /// Get the full broker address.
    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.broker_address, self.broker_port)
    }

    /// Validate broker settings.
    pub fn validate(&self) -> Result<()> {
        if self.broker_address.trim().is_empty() {
            return Err(Error::Config("mqtt.broker_address cannot be empty".into()));
        }
        if self.qos > 2 {
            return Err(Error::Config(format!(
                "mqtt.qos must be 0, 1 or 2 (got {})",
                self.qos
            )));
        }
        if self.keep_alive_secs < 5 {
            return Err(Error::Config(format!(
                "mqtt.keep_alive_secs must be at least 5 (got {})",
                self.keep_alive_secs
            )));
        }
        if self.request_capacity == 0 {
            return Err(Error::Config("mqtt.request_capacity must be > 0".into()));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Log severity threshold.
///
/// Accepts the classic names (`CRITICAL`, `ERROR`, `WARNING`, `INFO`,
/// `DEBUG`) as well as tracing's (`warn`, `trace`), in any case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Critical,
    Error,
    #[default]
    Warning,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The equivalent `tracing` filter directive.
    ///
    /// `tracing` has no level above `error`, so `Critical` shares it.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Critical | LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Critical => "CRITICAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" | "fatal" => Ok(LogLevel::Critical),
            "error" => Ok(LogLevel::Error),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(Error::Config(format!(
                "Invalid log level '{}'. Expected CRITICAL, ERROR, WARNING, INFO or DEBUG",
                other
            ))),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Common logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level that gets logged.
    #[serde(default)]
    pub level: LogLevel,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,

    /// Append log output to this file instead of stdout.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Load a configuration from a JSON5 string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}
