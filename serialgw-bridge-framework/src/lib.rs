//! SerialGW Bridge Framework
//!
//! Common abstractions for building bridges between a local link and an MQTT broker.
//!
//! # Overview
//!
//! This framework provides:
//! - [`BridgeConfig`] trait for configuration loading and validation
//! - [`BridgeRunner`] for managing bridge lifecycle (startup, shutdown, signal handling)
//! - [`Publisher`] and [`BusPublisher`] for non-blocking publishing to the broker
//! - [`EventLoopDriver`] for keeping the MQTT connection alive and delivering inbound messages
//! - [`BridgeArgs`] for common CLI argument parsing
//! - [`BridgeStatus`] for retained status reporting
//! - [`BridgeStats`] for traffic counters
//!
//! # Example
//!
//! ```ignore
//! use serialgw_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = BridgeArgs::parse_with_default("mybridge.json5");
//!     let config = MyBridgeConfig::load(&args.config)?;
//!
//!     let mut runner = BridgeRunner::new_with_args("mybridge", config, Some(&args))?;
//!
//!     // Spawn link-specific workers
//!     let publisher = runner.publisher();
//!     runner.spawn(my_worker(publisher));
//!
//!     // Run until Ctrl+C
//!     runner.run().await?;
//!     Ok(())
//! }
//! ```

mod args;
mod config;
mod error;
mod publisher;
mod runner;
mod stats;
mod status;
mod subscriber;

pub use args::BridgeArgs;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use publisher::{BusPublisher, PublishStats, Publisher};
pub use runner::{BridgeRunner, BridgeState, ShutdownReason};
pub use stats::{BridgeStats, StatsSnapshot};
pub use status::{BridgeStatus, StatusPublisher, last_will_payload};
pub use subscriber::{BusMessage, EventLoopDriver, log_connection_result};

// Re-export commonly used types from serialgw-common
pub use serialgw_common::{LogFormat, LogLevel, LoggingConfig, MqttConfig};
