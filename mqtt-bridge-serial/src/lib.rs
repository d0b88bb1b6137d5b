//! MQTT bridge for line-oriented serial radio gateways.
//!
//! Readings arriving on the serial line as
//!
//! ```text
//! <node>,<topic>:<payload>,<topic>:<payload>,...\n
//! ```
//!
//! are published one per field, and messages published to the command
//! topics are written to the serial device as `<...>` frames.
//!
//! # Topics
//!
//! ```text
//! sensors/</<node>/<topic>          readings published by the bridge
//! sensors/>/<node>[/<subtopic>]     commands forwarded to a node
//! ```
//!
//! The `sensors` root is configurable.

pub mod bridge;
pub mod config;
pub mod serial;
