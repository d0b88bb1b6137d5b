//! The two bridge flows: serial lines to MQTT, and MQTT messages to serial frames.

use std::sync::Arc;

use serialgw_bridge_framework::{BridgeStats, BusMessage, BusPublisher, PublishStats};
use serialgw_common::{ParseFailure, Route, TopicScheme, decode_serial_line, encode_serial_frame};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::serial::{Line, LineReader, SerialError};

/// Translates serial lines into MQTT publishes.
///
/// The only reader of the serial device.
pub struct SerialToBus<P> {
    publisher: P,
    scheme: TopicScheme,
    stats: Arc<BridgeStats>,
}

impl<P: BusPublisher> SerialToBus<P> {
    pub fn new(publisher: P, scheme: TopicScheme, stats: Arc<BridgeStats>) -> Self {
        Self {
            publisher,
            scheme,
            stats,
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Publish every reading of one raw line.
    ///
    /// A malformed line is logged, counted and dropped. Failed publishes only
    /// lose their own field.
    pub fn handle_line(&self, raw: &[u8]) -> Result<PublishStats, ParseFailure> {
        self.stats.record_line();

        let readings = match decode_serial_line(raw) {
            Ok(readings) => readings,
            Err(e) => {
                self.stats.record_line_dropped();
                warn!(
                    kind = e.kind(),
                    error = %e,
                    line = %String::from_utf8_lossy(raw).trim_end(),
                    "Dropping serial line"
                );
                return Err(e);
            }
        };

        let node = readings.node();
        let messages = readings.map(|r| (self.scheme.to_bus_topic(r.node, r.topic), r.payload));
        let published = self.publisher.publish_batch(messages);

        self.stats.record_published(published.success as u64);
        self.stats.record_publish_failures(published.failed as u64);

        if published.total() == 0 {
            debug!(node = %node, "Serial line carried no readings");
        }

        Ok(published)
    }

    /// Drop a line that did not fit in the read buffer.
    ///
    /// Nothing from it is published: a fragment could carry a wrong payload
    /// or look like a line from another node.
    pub fn handle_overflow(&self, max_len: usize) {
        self.stats.record_line();
        self.stats.record_line_dropped();
        warn!(
            kind = "overflow",
            max_len,
            "Dropping serial line longer than the limit"
        );
    }

    /// Read lines until shutdown is signalled.
    ///
    /// End of stream or a read error means the device is gone and is returned
    /// as an error.
    pub async fn run<R>(
        self,
        mut lines: LineReader<R>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SerialError>
    where
        R: AsyncBufRead + Unpin,
    {
        info!(topic_root = %self.scheme.root(), "Serial reader started");
        let max_len = lines.max_len();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let line = tokio::select! {
                _ = shutdown.changed() => break,
                line = lines.next_line() => line,
            };

            match line {
                Ok(Some(Line::Complete(raw))) => {
                    let _ = self.handle_line(raw);
                }
                Ok(Some(Line::Overflow)) => self.handle_overflow(max_len),
                Ok(None) => return Err(SerialError::Closed),
                Err(e) => return Err(SerialError::Read(e)),
            }
        }

        debug!("Serial reader stopped");
        Ok(())
    }
}

/// What to do with one bus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write this frame to the serial device.
    Frame(Vec<u8>),
    /// Not addressed to the gateway.
    Ignored,
}

/// Translate a bus message into a serial frame.
pub fn translate_message(
    scheme: &TopicScheme,
    message: &BusMessage,
) -> Result<Outbound, ParseFailure> {
    let payload = message
        .payload_str()
        .map_err(|e| ParseFailure::InvalidUtf8(e.valid_up_to()))?;

    match scheme.from_bus_topic(&message.topic)? {
        Route::Ignore => Ok(Outbound::Ignored),
        Route::ToNode { node, subtopic } => Ok(Outbound::Frame(encode_serial_frame(
            node, subtopic, payload,
        ))),
    }
}

/// Writes frames for bus messages to the serial device.
///
/// The only writer of the serial device.
pub struct BusToSerial<W> {
    writer: W,
    scheme: TopicScheme,
    stats: Arc<BridgeStats>,
}

impl<W: AsyncWrite + Unpin> BusToSerial<W> {
    pub fn new(writer: W, scheme: TopicScheme, stats: Arc<BridgeStats>) -> Self {
        Self {
            writer,
            scheme,
            stats,
        }
    }

    /// Handle one bus message. Nothing is retried.
    pub async fn handle_message(&mut self, message: &BusMessage) {
        self.stats.record_message();

        let frame = match translate_message(&self.scheme, message) {
            Ok(Outbound::Frame(frame)) => frame,
            Ok(Outbound::Ignored) => {
                self.stats.record_message_ignored();
                debug!(topic = %message.topic, "Ignoring message not addressed to a node");
                return;
            }
            Err(e) => {
                self.stats.record_message_dropped();
                warn!(
                    topic = %message.topic,
                    kind = e.kind(),
                    error = %e,
                    "Dropping bus message"
                );
                return;
            }
        };

        let written = async {
            self.writer.write_all(&frame).await?;
            self.writer.flush().await
        }
        .await;

        match written {
            Ok(()) => {
                self.stats.record_frame_written();
                debug!(
                    topic = %message.topic,
                    frame = %String::from_utf8_lossy(&frame),
                    "Wrote serial frame"
                );
            }
            Err(e) => {
                self.stats.record_write_failure();
                warn!(topic = %message.topic, error = %e, "Serial write failed");
            }
        }
    }

    /// Write frames until the inbound channel closes.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<BusMessage>) {
        info!(topic_root = %self.scheme.root(), "Serial writer started");

        while let Some(message) = inbound.recv().await {
            self.handle_message(&message).await;
        }

        debug!("Inbound channel closed, serial writer stopped");
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
