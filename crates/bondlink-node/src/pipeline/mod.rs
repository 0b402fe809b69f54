// ============================================
// File: crates/bondlink-node/src/pipeline/mod.rs
// ============================================
//! # Receive/Dispatch Pipeline
//!
//! ## Creation Reason
//! Transport reception and application callbacks run on different tasks
//! so a slow handler never stalls protocol answers on the link.
//!
//! ## Main Functionality
//! - [`receiver`]: pulls frames, runs the controller, answers the peer
//! - [`dispatcher`]: invokes the application handler in acceptance order
//! - `MessageSet`: enqueue filter over message-type slots
//! - `OverflowPolicy`: what to do when the dispatch queue is full
//!
//! ## Pipeline
//! ```text
//! transport ──► receiver ──(bounded mpsc)──► dispatcher ──► EventHandler
//!                  │
//!                  └──► transport (pairing / status / stop-ack answers)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Failure events never block the receiver, whatever the policy
//! - One producer, one consumer: delivery order is acceptance order
//!
//! ## Last Modified
//! v0.1.0 - Initial pipeline

pub mod dispatcher;
pub mod receiver;

use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use bondlink_core::{FailureKind, MessageType};

use crate::events::LinkEvent;
use crate::stats::ConnectionStats;

// ============================================
// MessageSet
// ============================================

bitflags! {
    /// Set of message types, one bit per adjacency slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MessageSet: u16 {
        /// PairingKey
        const PAIRING_KEY = MessageType::PairingKey.bit();
        /// PairingKeyResponse
        const PAIRING_KEY_RESPONSE = MessageType::PairingKeyResponse.bit();
        /// DigestMatch
        const DIGEST_MATCH = MessageType::DigestMatch.bit();
        /// DigestMatchResponse
        const DIGEST_MATCH_RESPONSE = MessageType::DigestMatchResponse.bit();
        /// PairingConfirm
        const PAIRING_CONFIRM = MessageType::PairingConfirm.bit();
        /// StatusCheck
        const STATUS_CHECK = MessageType::StatusCheck.bit();
        /// StatusCheckResponse
        const STATUS_CHECK_RESPONSE = MessageType::StatusCheckResponse.bit();
        /// Data
        const DATA = MessageType::Data.bit();
        /// Ticket
        const TICKET = MessageType::Ticket.bit();
        /// TransactionStart
        const TRANSACTION_START = MessageType::TransactionStart.bit();
        /// TransactionData
        const TRANSACTION_DATA = MessageType::TransactionData.bit();
        /// TransactionStop
        const TRANSACTION_STOP = MessageType::TransactionStop.bit();
        /// TransactionStopAck
        const TRANSACTION_STOP_ACK = MessageType::TransactionStopAck.bit();
        /// Error
        const ERROR = MessageType::Error.bit();

        /// Types carrying application payload.
        const APPLICATION = Self::DATA.bits()
            | Self::TICKET.bits()
            | Self::TRANSACTION_START.bits()
            | Self::TRANSACTION_DATA.bits()
            | Self::TRANSACTION_STOP.bits()
            | Self::TRANSACTION_STOP_ACK.bits();
    }
}

impl MessageSet {
    /// Set holding only `message_type`.
    #[must_use]
    pub const fn of(message_type: MessageType) -> Self {
        Self::from_bits_retain(message_type.bit())
    }

    /// Returns `true` if `message_type` is in the set.
    #[must_use]
    pub const fn contains_type(self, message_type: MessageType) -> bool {
        self.bits() & message_type.bit() != 0
    }

    /// Builds a set from message type names (`"data"`, `"ticket"`, ...).
    ///
    /// # Errors
    /// Returns the first unknown name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> std::result::Result<Self, String> {
        names.iter().try_fold(Self::empty(), |set, name| {
            MessageType::from_name(name.as_ref())
                .map(|t| set | Self::of(t))
                .ok_or_else(|| name.as_ref().to_string())
        })
    }

    /// Names of the types in the set, in slot order.
    #[must_use]
    pub fn names(self) -> Vec<String> {
        MessageType::ALL
            .iter()
            .filter(|t| self.contains_type(**t))
            .map(|t| t.name().to_string())
            .collect()
    }
}

// ============================================
// OverflowPolicy / PipelineSettings
// ============================================

/// Behavior when the dispatch queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Receiver waits for capacity.
    #[default]
    Block,
    /// Event is dropped and counted.
    Drop,
}

/// Tuning for one connection's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Dispatch queue capacity.
    pub queue_capacity: usize,
    /// Full-queue behavior.
    pub overflow: OverflowPolicy,
    /// Accepted types forwarded to the application.
    pub enqueue: MessageSet,
    /// Bound on one transport receive call.
    pub receive_timeout: Duration,
    /// Forward receive failures to the application.
    pub report_failures: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            overflow: OverflowPolicy::Block,
            enqueue: MessageSet::APPLICATION,
            receive_timeout: Duration::from_millis(100),
            report_failures: true,
        }
    }
}

// ============================================
// EventQueue
// ============================================

/// Producer side of the dispatch queue.
#[derive(Debug, Clone)]
pub(crate) struct EventQueue {
    tx: mpsc::Sender<LinkEvent>,
    settings: Arc<PipelineSettings>,
    stats: Arc<ConnectionStats>,
}

impl EventQueue {
    pub(crate) fn new(
        settings: Arc<PipelineSettings>,
        stats: Arc<ConnectionStats>,
    ) -> (Self, mpsc::Receiver<LinkEvent>) {
        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        (Self { tx, settings, stats }, rx)
    }

    /// Returns `true` if accepted frames of this type reach the application.
    pub(crate) fn accepts(&self, message_type: MessageType) -> bool {
        self.settings.enqueue.contains_type(message_type)
    }

    /// Enqueues an event according to the overflow policy.
    pub(crate) async fn push(&self, event: LinkEvent) {
        match self.settings.overflow {
            OverflowPolicy::Block => {
                if self.tx.send(event).await.is_err() {
                    debug!("Dispatch queue closed, event discarded");
                }
            }
            OverflowPolicy::Drop => self.push_nowait(event),
        }
    }

    /// Enqueues a failure event if reporting is enabled. Never waits.
    pub(crate) fn report(&self, kind: FailureKind, detail: impl Into<String>) {
        if self.settings.report_failures {
            self.push_nowait(LinkEvent::Failure {
                kind,
                detail: detail.into(),
            });
        }
    }

    fn push_nowait(&self, event: LinkEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.stats.record_queue_drop(),
            Err(TrySendError::Closed(_)) => debug!("Dispatch queue closed, event discarded"),
        }
    }
}

// ============================================
// Tests
// ============================================
