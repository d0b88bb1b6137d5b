//! MQTT bridge for line-oriented serial radio gateways.
//!
//! Publishes readings from the serial line to MQTT and writes commands
//! received over MQTT to the serial line.

use anyhow::{Context, Result};
use mqtt_bridge_serial::bridge::{BusToSerial, SerialToBus};
use mqtt_bridge_serial::config::SerialBridgeConfig;
use mqtt_bridge_serial::serial::{self, LineReader};
use serialgw_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = BridgeArgs::parse_with_default("serial.json5");

    // Load configuration
    let config = SerialBridgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let mut runner = BridgeRunner::new_with_args("serial", config, Some(&args))?;
    info!("Loaded configuration from {:?}", args.config);

    let serial_config = runner.config().serial.clone();
    let scheme = runner.config().gateway.topic_scheme();

    let (reader, writer) = match serial::open(&serial_config) {
        Ok(halves) => halves,
        Err(e) => {
            error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    runner.subscribe(scheme.subscription_filter());
    let inbound = runner
        .take_inbound()
        .context("Inbound message channel already taken")?;

    let serial_to_bus = SerialToBus::new(runner.publisher(), scheme.clone(), runner.stats());
    let lines = LineReader::new(reader, serial_config.max_line_length);
    let shutdown = runner.shutdown_signal();
    runner.spawn_with_error(
        "serial-reader".to_string(),
        serial_to_bus.run(lines, shutdown),
    );

    let bus_to_serial = BusToSerial::new(writer, scheme.clone(), runner.stats());
    runner.spawn(bus_to_serial.run(inbound));

    let metadata = serde_json::json!({
        "device": serial_config.device,
        "baud_rate": serial_config.baud_rate,
        "topic_root": scheme.root(),
    });

    runner.run_with_metadata(Some(metadata)).await?;
    Ok(())
}
