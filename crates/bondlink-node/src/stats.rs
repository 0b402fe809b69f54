// ============================================
// File: crates/bondlink-node/src/stats.rs
// ============================================
//! # Connection Statistics
//!
//! Lock-free counters updated by the receiver, the dispatcher and the
//! send path. Read through [`ConnectionStats::snapshot`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use bondlink_core::FailureKind;

/// Per-connection counters.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    frames_rx: AtomicU64,
    frames_tx: AtomicU64,
    bytes_rx: AtomicU64,
    bytes_tx: AtomicU64,
    transmit_failures: AtomicU64,
    queue_drops: AtomicU64,
    events_dispatched: AtomicU64,
    failures: [AtomicU64; FailureKind::ALL.len()],
}

impl ConnectionStats {
    /// Counts a frame handed over by the transport.
    pub fn record_rx(&self, bytes: usize) {
        self.bytes_rx.fetch_add(bytes as u64, Ordering::Relaxed);
        self.frames_rx.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a frame the transport accepted.
    pub fn record_tx(&self, bytes: usize) {
        self.bytes_tx.fetch_add(bytes as u64, Ordering::Relaxed);
        self.frames_tx.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a transmit the transport refused.
    pub fn record_transmit_failure(&self) {
        self.transmit_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an event dropped on a full queue.
    pub fn record_queue_drop(&self) {
        self.queue_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an event handed to the application.
    pub fn record_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a failure of the given kind.
    pub fn record_failure(&self, kind: FailureKind) {
        self.failures[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of one failure counter.
    #[must_use]
    pub fn failures(&self, kind: FailureKind) -> u64 {
        self.failures[kind.index()].load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_rx: self.frames_rx.load(Ordering::Relaxed),
            frames_tx: self.frames_tx.load(Ordering::Relaxed),
            bytes_rx: self.bytes_rx.load(Ordering::Relaxed),
            bytes_tx: self.bytes_tx.load(Ordering::Relaxed),
            transmit_failures: self.transmit_failures.load(Ordering::Relaxed),
            queue_drops: self.queue_drops.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            failures: FailureKind::ALL
                .iter()
                .map(|kind| (kind.name().to_string(), self.failures(*kind)))
                .filter(|(_, n)| *n > 0)
                .collect(),
        }
    }
}

/// Serializable copy of [`ConnectionStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Frames received.
    pub frames_rx: u64,
    /// Frames sent.
    pub frames_tx: u64,
    /// Bytes received.
    pub bytes_rx: u64,
    /// Bytes sent.
    pub bytes_tx: u64,
    /// Transmits refused by the transport.
    pub transmit_failures: u64,
    /// Events dropped on a full queue.
    pub queue_drops: u64,
    /// Events handed to the application.
    pub events_dispatched: u64,
    /// Non-zero failure counters by kind name.
    pub failures: BTreeMap<String, u64>,
}

impl StatsSnapshot {
    /// Failure count for `kind`.
    #[must_use]
    pub fn failure_count(&self, kind: FailureKind) -> u64 {
        self.failures.get(kind.name()).copied().unwrap_or(0)
    }

    /// Sum of all failure counters.
    #[must_use]
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = ConnectionStats::default();
        stats.record_rx(60);
        stats.record_rx(40);
        stats.record_tx(75);
        stats.record_failure(FailureKind::SequenceError);
        stats.record_failure(FailureKind::SequenceError);
        stats.record_failure(FailureKind::AddressError);

        let snap = stats.snapshot();
        assert_eq!((snap.frames_rx, snap.bytes_rx), (2, 100));
        assert_eq!((snap.frames_tx, snap.bytes_tx), (1, 75));
        assert_eq!(snap.failure_count(FailureKind::SequenceError), 2);
        assert_eq!(snap.failure_count(FailureKind::AddressError), 1);
        assert_eq!(snap.failure_count(FailureKind::TypeError), 0);
        assert_eq!(snap.total_failures(), 3);
        assert_eq!(snap.failures.len(), 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = ConnectionStats::default();
        stats.record_failure(FailureKind::TimeoutError);
        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        assert!(json.contains("\"TimeoutError\":1"));
    }
}
