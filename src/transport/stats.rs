//! Per-session traffic counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between the engine thread and the consumer.
#[derive(Debug, Default)]
pub struct LinkStats {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    payload_bytes_sent: AtomicU64,
    payload_bytes_received: AtomicU64,
    poll_cycles: AtomicU64,
    ack_mismatches: AtomicU64,
}

impl LinkStats {
    pub(crate) fn record_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_payload_sent(&self, len: usize) {
        self.payload_bytes_sent
            .fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_payload_received(&self, len: usize) {
        self.payload_bytes_received
            .fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_poll_cycle(&self) {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ack_mismatch(&self) {
        self.ack_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            payload_bytes_sent: self.payload_bytes_sent.load(Ordering::Relaxed),
            payload_bytes_received: self.payload_bytes_received.load(Ordering::Relaxed),
            poll_cycles: self.poll_cycles.load(Ordering::Relaxed),
            ack_mismatches: self.ack_mismatches.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsSnapshot {
    /// Hostmode frames written, commands and data
    pub frames_sent: u64,
    /// Response headers read
    pub frames_received: u64,
    /// User payload bytes handed to the modem
    pub payload_bytes_sent: u64,
    /// User payload bytes queued for the consumer
    pub payload_bytes_received: u64,
    /// Completed engine cycles
    pub poll_cycles: u64,
    /// Data frame acks with unexpected channel or status
    pub ack_mismatches: u64,
}
