//! Bridge traffic counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Traffic counters shared by the bridge workers.
///
/// Each counter has a single writer (the worker owning that direction),
/// so relaxed ordering is enough.
#[derive(Debug)]
pub struct BridgeStats {
    /// Start time for uptime calculation.
    start_time: Instant,
    /// Lines read from the serial device.
    lines_read: AtomicU64,
    /// Lines dropped because they could not be parsed.
    lines_dropped: AtomicU64,
    /// Readings published to the bus.
    fields_published: AtomicU64,
    /// Publishes that failed.
    publish_failures: AtomicU64,
    /// Messages received from the bus.
    messages_received: AtomicU64,
    /// Messages not addressed to the gateway.
    messages_ignored: AtomicU64,
    /// Messages addressed to the gateway but malformed.
    messages_dropped: AtomicU64,
    /// Frames written to the serial device.
    frames_written: AtomicU64,
    /// Serial writes that failed.
    write_failures: AtomicU64,
}

/// Point-in-time copy of [`BridgeStats`] for logging and status messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub lines_read: u64,
    pub lines_dropped: u64,
    pub fields_published: u64,
    pub publish_failures: u64,
    pub messages_received: u64,
    pub messages_ignored: u64,
    pub messages_dropped: u64,
    pub frames_written: u64,
    pub write_failures: u64,
}

impl Default for BridgeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            lines_read: AtomicU64::new(0),
            lines_dropped: AtomicU64::new(0),
            fields_published: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_ignored: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            frames_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
        }
    }

    pub fn record_line(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_line_dropped(&self) {
        self.lines_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self, count: u64) {
        self.fields_published.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_publish_failures(&self, count: u64) {
        self.publish_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_ignored(&self) {
        self.messages_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_written(&self) {
        self.frames_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            lines_dropped: self.lines_dropped.load(Ordering::Relaxed),
            fields_published: self.fields_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_ignored: self.messages_ignored.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            frames_written: self.frames_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}
