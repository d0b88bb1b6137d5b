//! SerialGW Common Library
//!
//! This crate provides the translation core of the serial/MQTT gateway and
//! the types shared by the bridge crates:
//!
//! - [`node`] - Radio node addressing (`NodeId`)
//! - [`frame`] - Serial line decoding and outbound frame encoding
//! - [`topic`] - MQTT topic building and routing
//! - [`config`] - Configuration loading (JSON5 format)
//! - [`session`] - MQTT client construction and connection result codes
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod frame;
pub mod node;
pub mod session;
pub mod topic;

// Re-export commonly used types at the crate root
pub use config::{LogFormat, LogLevel, LoggingConfig, MqttConfig, parse_config};
pub use error::{Error, ParseFailure, Result};
pub use frame::{Reading, Readings, decode_serial_line, encode_serial_frame};
pub use node::NodeId;
pub use session::{connect, connection_result_code, connection_result_reason, qos_from_level};
pub use topic::{Route, TopicScheme, from_bus_topic, subscription_filter, to_bus_topic};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// Output goes to stdout unless `config.file` is set, in which case it is
/// appended to that file. `RUST_LOG` takes precedence over `config.level`.
///
/// # Example
///
/// ```ignore
/// use serialgw_common::{LoggingConfig, LogFormat, LogLevel, init_tracing};
///
/// let config = LoggingConfig {
///     level: LogLevel::Info,
///     format: LogFormat::Json,
///     file: None,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    let (writer, ansi) = match &config.file {
        Some(path) => (BoxMakeWriter::new(file_appender(path)?), false),
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(ansi))
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_writer(writer))
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}

/// Open a non-rotating appender on `path`, creating parent directories.
fn file_appender(
    path: &std::path::Path,
) -> Result<tracing_appender::rolling::RollingFileAppender> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::Config(format!("Invalid log file path: {}", path.display())))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => std::path::Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| {
            Error::Config(format!(
                "Failed to open log file '{}': {}",
                path.display(),
                e
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_appender_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("gateway.log");

        file_appender(&path).unwrap();

        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn test_file_appender_rejects_directory_path() {
        assert!(file_appender(std::path::Path::new("/")).is_err());
    }
}
