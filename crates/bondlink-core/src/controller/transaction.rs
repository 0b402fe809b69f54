// ============================================
// File: crates/bondlink-core/src/controller/transaction.rs
// ============================================
//! # Transaction State
//!
//! ## Main Functionality
//! Tracks the bracketed transfer between TransactionStart and
//! TransactionStopAck and forces it closed when it goes quiet.
//!
//! ## State Machine
//! ```text
//!            TransactionStart           TransactionStop
//!  Idle ─────────────────────► Active ─────────────────► AwaitingStop
//!   ▲                          │  ▲ TransactionData           │
//!   │                          │  └──────┘                    │ TransactionStopAck
//!   │                 timeout  ▼                              ▼
//!   └─────────────────────── Stopped ◄────────────────────────┘
//! ```
//! Start, data and stop frames re-arm the deadline in either direction.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `check` never mutates; `apply` is only called for frames that passed
//!   every other check
//!
//! ## Last Modified
//! v0.1.0 - Initial transaction tracking

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use bondlink_common::{Deadline, DeviceId, LinkAddress};

use crate::error::{CoreError, Result};
use crate::protocol::{MessageDefinition, MessageType, TransactionCheck};

/// Transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// None opened yet.
    Idle,
    /// Open.
    Active,
    /// Stop sent or received, waiting for the acknowledgement.
    AwaitingStop,
    /// Closed (acknowledged or timed out).
    Stopped,
}

impl TransactionStatus {
    /// Returns the status name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::AwaitingStop => "awaiting_stop",
            Self::Stopped => "stopped",
        }
    }
}

/// Transaction state of one link.
#[derive(Debug, Clone)]
pub struct TransactionState {
    status: TransactionStatus,
    remote_device: Option<DeviceId>,
    remote_address: Option<LinkAddress>,
    deadline: Deadline,
}

impl TransactionState {
    /// Creates an idle state with the given inactivity budget.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            status: TransactionStatus::Idle,
            remote_device: None,
            remote_address: None,
            deadline: Deadline::new(timeout),
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Peer of the current or last transaction.
    #[must_use]
    pub const fn remote_device(&self) -> Option<DeviceId> {
        self.remote_device
    }

    /// Link address of the current or last transaction.
    #[must_use]
    pub const fn remote_address(&self) -> Option<LinkAddress> {
        self.remote_address
    }

    /// Inactivity budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.deadline.budget()
    }

    /// Validates `definition` against the current status.
    ///
    /// # Errors
    /// `Transaction` if the type is not allowed now.
    pub fn check(&self, definition: &MessageDefinition) -> Result<()> {
        let allowed = match definition.transaction {
            TransactionCheck::None => true,
            TransactionCheck::ActiveOnly => self.status == TransactionStatus::Active,
            TransactionCheck::StoppedOnly => matches!(
                self.status,
                TransactionStatus::Idle | TransactionStatus::Stopped
            ),
        };
        if allowed {
            Ok(())
        } else {
            Err(CoreError::Transaction {
                message_type: definition.message_type.as_byte(),
                state: self.status.name(),
            })
        }
    }

    /// Advances the state for an accepted or sent frame.
    pub fn apply(
        &mut self,
        message_type: MessageType,
        remote_device: DeviceId,
        remote_address: Option<LinkAddress>,
        now: Instant,
    ) {
        match message_type {
            MessageType::TransactionStart => {
                self.status = TransactionStatus::Active;
                self.remote_device = Some(remote_device);
                self.remote_address = remote_address;
                self.deadline.arm(now);
                debug!(peer = %remote_device, "Transaction started");
            }
            MessageType::TransactionData => self.deadline.arm(now),
            MessageType::TransactionStop => {
                self.status = TransactionStatus::AwaitingStop;
                self.deadline.arm(now);
            }
            MessageType::TransactionStopAck if self.status == TransactionStatus::AwaitingStop => {
                self.status = TransactionStatus::Stopped;
                self.deadline.disarm();
                debug!(peer = %remote_device, "Transaction stopped");
            }
            _ => {}
        }
    }

    /// Forces an expired transaction to `Stopped`, reporting it once.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<CoreError> {
        if !self.deadline.expire(now) {
            return None;
        }
        warn!(
            state = self.status.name(),
            budget_ms = u64::try_from(self.timeout().as_millis()).unwrap_or(u64::MAX),
            "Transaction timed out"
        );
        self.status = TransactionStatus::Stopped;
        Some(CoreError::Timeout {
            what: "transaction",
        })
    }

    /// Back to `Idle`.
    pub fn reset(&mut self) {
        self.status = TransactionStatus::Idle;
        self.remote_device = None;
        self.remote_address = None;
        self.deadline.disarm();
    }
}
