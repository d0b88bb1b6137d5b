//! Serial wire format.
//!
//! Inbound lines from the radio gateway look like:
//!
//! ```text
//! <node>,<topic>:<payload>,<topic>:<payload>,...,RSSI:-40,ACK
//! ```
//!
//! Outbound frames are wrapped in start/end markers so the firmware can
//! find them in the byte stream without a line terminator:
//!
//! ```text
//! <payload>               node 1 (the gateway itself)
//! <node:payload>
//! <node:subtopic:payload>
//! ```

use std::str::Split;

use crate::error::ParseFailure;
use crate::node::NodeId;

/// Separates the node id and fields of an inbound line.
pub const FIELD_DELIMITER: char = ',';

/// Separates topic from payload inside a field, and the parts of a frame.
pub const TOPIC_SEPARATOR: char = ':';

/// First byte of an outbound frame.
pub const FRAME_START: u8 = b'<';

/// Last byte of an outbound frame.
pub const FRAME_END: u8 = b'>';

/// One `topic:payload` field decoded from a serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading<'a> {
    /// Node that sent the line.
    pub node: NodeId,
    /// Sensor topic, whitespace trimmed.
    pub topic: &'a str,
    /// Payload, whitespace trimmed.
    pub payload: &'a str,
}

/// Lazy iterator over the readings of one serial line.
///
/// Fields without a `:` (RSSI/ACK trailers, line noise) are skipped.
#[derive(Debug, Clone)]
pub struct Readings<'a> {
    node: NodeId,
    segments: Split<'a, char>,
}

impl<'a> Readings<'a> {
    /// Node that sent the line.
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl<'a> Iterator for Readings<'a> {
    type Item = Reading<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for segment in self.segments.by_ref() {
            if let Some((topic, payload)) = segment.split_once(TOPIC_SEPARATOR) {
                return Some(Reading {
                    node: self.node,
                    topic: topic.trim(),
                    payload: payload.trim(),
                });
            }
        }
        None
    }
}

/// Decode one raw line read from the serial device.
///
/// The line terminator may still be attached; it is treated as whitespace.
///
/// # Example
/// ```
/// use serialgw_common::frame::decode_serial_line;
///
/// let readings: Vec<_> = decode_serial_line(b"5,Temperature:20.6,Battery:LOW\n")
///     .unwrap()
///     .map(|r| (r.node.get(), r.topic, r.payload))
///     .collect();
/// assert_eq!(readings, vec![(5, "Temperature", "20.6"), (5, "Battery", "LOW")]);
/// ```
pub fn decode_serial_line(raw: &[u8]) -> Result<Readings<'_>, ParseFailure> {
    let text =
        std::str::from_utf8(raw).map_err(|e| ParseFailure::InvalidUtf8(e.valid_up_to()))?;

    let mut segments = text.split(FIELD_DELIMITER);
    let head = segments.next().unwrap_or_default();

    if !text.contains(FIELD_DELIMITER) && head.trim().is_empty() {
        return Err(ParseFailure::Empty);
    }

    let node = head.parse::<NodeId>()?;

    Ok(Readings { node, segments })
}

/// Encode a frame for the radio gateway firmware.
///
/// The gateway node never gets a node prefix, whatever the subtopic.
///
/// # Example
/// ```
/// use serialgw_common::frame::encode_serial_frame;
/// use serialgw_common::NodeId;
///
/// assert_eq!(encode_serial_frame(NodeId(1), None, "ON"), b"<ON>");
/// assert_eq!(encode_serial_frame(NodeId(5), None, "ON"), b"<5:ON>");
/// assert_eq!(encode_serial_frame(NodeId(5), Some("LED"), "ON"), b"<5:LED:ON>");
/// ```
pub fn encode_serial_frame(node: NodeId, subtopic: Option<&str>, payload: &str) -> Vec<u8> {
    let body = match subtopic {
        _ if node.is_gateway() => payload.to_string(),
        None => format!("{}{}{}", node, TOPIC_SEPARATOR, payload),
        Some(subtopic) => format!(
            "{}{sep}{}{sep}{}",
            node,
            subtopic,
            payload,
            sep = TOPIC_SEPARATOR
        ),
    };

    let mut frame = Vec::with_capacity(body.len() + 2);
    frame.push(FRAME_START);
    frame.extend_from_slice(body.as_bytes());
    frame.push(FRAME_END);
    frame
}
