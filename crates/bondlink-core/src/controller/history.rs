// ============================================
// File: crates/bondlink-core/src/controller/history.rs
// ============================================
//! # Frame History
//!
//! ## Main Functionality
//! The last sent, last received and last received response frames of a
//! link. Adjacency checks read the type of the previous frame in the same
//! direction from here.
//!
//! ## Last Modified
//! v0.1.0 - Initial history tracking

use std::time::Instant;

use bondlink_common::{DeviceId, LinkAddress};

use crate::protocol::{Direction, MessageType};

/// One accepted (or sent) frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Remote link address, when the transport reports one.
    pub address: Option<LinkAddress>,
    /// When the frame was accepted or sent.
    pub at: Instant,
    /// Remote device id.
    pub device_id: DeviceId,
    /// Frame sequence number.
    pub sequence: u32,
    /// Frame type.
    pub message_type: MessageType,
}

/// Per-link frame history.
#[derive(Debug, Clone, Default)]
pub struct LinkHistory {
    last_sent: Option<HistoryEntry>,
    last_received: Option<HistoryEntry>,
    last_received_response: Option<HistoryEntry>,
}

impl LinkHistory {
    /// Creates an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_sent: None,
            last_received: None,
            last_received_response: None,
        }
    }

    /// Last frame sent.
    #[must_use]
    pub const fn last_sent(&self) -> Option<&HistoryEntry> {
        self.last_sent.as_ref()
    }

    /// Last frame accepted.
    #[must_use]
    pub const fn last_received(&self) -> Option<&HistoryEntry> {
        self.last_received.as_ref()
    }

    /// Last response frame accepted.
    #[must_use]
    pub const fn last_received_response(&self) -> Option<&HistoryEntry> {
        self.last_received_response.as_ref()
    }

    /// Type of the previous frame in `direction`.
    #[must_use]
    pub fn previous(&self, direction: Direction) -> Option<MessageType> {
        match direction {
            Direction::Receive => self.last_received.map(|e| e.message_type),
            Direction::Transmit => self.last_sent.map(|e| e.message_type),
        }
    }

    /// Records a sent frame.
    pub fn record_sent(&mut self, entry: HistoryEntry) {
        self.last_sent = Some(entry);
    }

    /// Records an accepted frame.
    pub fn record_received(&mut self, entry: HistoryEntry) {
        if entry.message_type.is_response() {
            self.last_received_response = Some(entry);
        }
        self.last_received = Some(entry);
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message_type: MessageType, sequence: u32) -> HistoryEntry {
        HistoryEntry {
            address: None,
            at: Instant::now(),
            device_id: DeviceId::from(2u64),
            sequence,
            message_type,
        }
    }

    #[test]
    fn test_directions_are_separate() {
        let mut history = LinkHistory::new();
        assert_eq!(history.previous(Direction::Receive), None);

        history.record_sent(entry(MessageType::PairingKey, 1));
        history.record_received(entry(MessageType::PairingKeyResponse, 2));

        assert_eq!(
            history.previous(Direction::Transmit),
            Some(MessageType::PairingKey)
        );
        assert_eq!(
            history.previous(Direction::Receive),
            Some(MessageType::PairingKeyResponse)
        );
        assert_eq!(history.last_received_response().unwrap().sequence, 2);
    }

    #[test]
    fn test_response_slot_only_tracks_responses() {
        let mut history = LinkHistory::new();
        history.record_received(entry(MessageType::StatusCheckResponse, 4));
        history.record_received(entry(MessageType::Data, 5));

        assert_eq!(history.last_received().unwrap().sequence, 5);
        assert_eq!(history.last_received_response().unwrap().sequence, 4);

        history.clear();
        assert!(history.last_received().is_none());
    }
}
