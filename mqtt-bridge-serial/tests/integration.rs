//! End-to-end tests of both bridge flows over an in-memory serial device.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mqtt_bridge_serial::bridge::{BusToSerial, SerialToBus};
use mqtt_bridge_serial::config::SerialBridgeConfig;
use mqtt_bridge_serial::serial::{LineReader, SerialError};
use serialgw_bridge_framework::{BridgeConfig, BridgeStats, BusMessage, BusPublisher, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};

#[derive(Clone, Default)]
struct Recording {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl BusPublisher for Recording {
    fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

fn load_config(content: &str) -> SerialBridgeConfig {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("serial.json5");
    std::fs::write(&path, content).unwrap();
    SerialBridgeConfig::load(&path).unwrap()
}

#[tokio::test]
async fn test_serial_lines_reach_the_bus() {
    let config = load_config(
        r#"{
            mqtt: { broker_address: "localhost" },
            serial: { device: "/dev/ttyAMA0", max_line_length: 64 },
            gateway: { topic_root: "home" }
        }"#,
    );

    let (mut radio, device) = tokio::io::duplex(256);
    let publisher = Recording::default();
    let stats = Arc::new(BridgeStats::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = SerialToBus::new(
        publisher.clone(),
        config.gateway.topic_scheme(),
        stats.clone(),
    );
    let task = tokio::spawn(reader.run(
        LineReader::new(BufReader::new(device), config.serial.max_line_length),
        shutdown_rx,
    ));

    radio
        .write_all(b"5,Temperature:20.6,Battery:LOW,RSSI\r\n")
        .await
        .unwrap();
    radio.write_all(b"garbage\n").await.unwrap();
    radio.write_all(b"garbage\n").await.unwrap();
    radio.write_all(b"9,Door:OPEN\n").await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while stats.snapshot().lines_read < 4 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    shutdown_tx.send(true).unwrap();
    assert!(task.await.unwrap().is_ok());

    assert_eq!(
        *publisher.sent.lock().unwrap(),
        vec![
            ("home/</5/Temperature".to_string(), "20.6".to_string()),
            ("home/</5/Battery".to_string(), "LOW".to_string()),
            ("home/</9/Door".to_string(), "OPEN".to_string()),
        ]
    );
    assert_eq!(stats.snapshot().lines_dropped, 2);
}

#[tokio::test]
async fn test_device_unplugged_is_a_fault() {
    let (radio, device) = tokio::io::duplex(64);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = SerialToBus::new(
        Recording::default(),
        Default::default(),
        Arc::new(BridgeStats::new()),
    );

    drop(radio);
    let result = reader
        .run(LineReader::new(BufReader::new(device), 512), shutdown_rx)
        .await;

    assert!(matches!(result, Err(SerialError::Closed)));
}

#[tokio::test]
async fn test_bus_messages_reach_the_radio() {
    let (mut radio, device) = tokio::io::duplex(256);
    let stats = Arc::new(BridgeStats::new());
    let (tx, rx) = mpsc::channel(16);

    let writer = BusToSerial::new(device, Default::default(), stats.clone());
    let task = tokio::spawn(writer.run(rx));

    for (topic, payload) in [
        ("sensors/>/5", "ON"),
        ("sensors/>/5/LED", "OFF"),
        ("sensors/>/1", "RESET"),
        ("sensors/</5/LED", "ignored"),
        ("sensors/>/five/LED", "dropped"),
    ] {
        tx.send(BusMessage::new(topic, payload)).await.unwrap();
    }
    drop(tx);
    task.await.unwrap();

    let mut written = String::new();
    radio.read_to_string(&mut written).await.unwrap();
    assert_eq!(written, "<5:ON><5:LED:OFF><RESET>");

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.messages_received, 5);
    assert_eq!(snapshot.frames_written, 3);
    assert_eq!(snapshot.messages_ignored, 1);
    assert_eq!(snapshot.messages_dropped, 1);
}
