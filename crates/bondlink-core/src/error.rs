// ============================================
// File: crates/bondlink-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! One error enum for every way a frame can be refused or an operation of
//! the protocol engine can fail, plus a `Copy` classification
//! (`FailureKind`) that the runtime reports to the application.
//!
//! ## Main Functionality
//! - `CoreError`: Primary error enum for protocol engine operations
//! - `FailureKind`: Wire/application-facing failure classification
//! - Classification helpers (`reverts_pairing`, `is_suspicious`, `skip_hint`)
//!
//! ## Error Categories
//! 1. **Framing**: Length, DeviceId, Type, Address
//! 2. **Ordering**: Sequence, Adjacency, Transaction, Timeout
//! 3. **Crypto**: Authentication, Decryption, Pairing, StatusCheck
//! 4. **Runtime**: NotFound, AllocationFailure, Receiver, Handling
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//! - `FailureKind` codes travel inside Error frames; do not renumber them
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::fmt;

use thiserror::Error;

use bondlink_common::DeviceId;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Errors produced by the protocol engine.
///
/// # Security Note
/// Messages describe what was wrong with a frame but never echo
/// payload bytes or key material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    // ========================================
    // Runtime Errors
    // ========================================

    /// Nothing to read.
    #[error("No data available: {what}")]
    NotFound {
        /// What was looked for
        what: &'static str,
    },

    /// A buffer could not be reserved for the operation.
    #[error("Allocation failed: {context}")]
    AllocationFailure {
        /// What was being allocated
        context: String,
    },

    /// Transport-level receive fault.
    #[error("Receive failed: {reason}")]
    Receiver {
        /// Underlying fault
        reason: String,
    },

    /// Application callback or dispatch fault.
    #[error("Event handling failed: {reason}")]
    Handling {
        /// Underlying fault
        reason: String,
    },

    // ========================================
    // Framing Errors
    // ========================================

    /// Frame length disagrees with the definition or the limit.
    #[error("Length error: got {actual}, expected {expected} ({reason})")]
    Length {
        /// Length found
        actual: usize,
        /// Length required by the rule
        expected: usize,
        /// Which rule was broken
        reason: &'static str,
    },

    /// Buffer is shorter than the length the header declares.
    #[error("Truncated frame: header declares {declared} bytes, received {received}")]
    Truncated {
        /// Length claimed by the header
        declared: usize,
        /// Bytes actually received
        received: usize,
    },

    /// Header device id is not the expected peer.
    #[error("Unexpected device id {got} (expected {})", display_expected(.expected))]
    DeviceId {
        /// Peer we expected, if one is bound
        expected: Option<DeviceId>,
        /// Identifier found in the header
        got: DeviceId,
    },

    /// Unknown message type byte.
    #[error("Unknown message type: 0x{0:02x}")]
    Type(u8),

    /// Frame arrived from an unexpected link address.
    #[error("Frame from unexpected link address {got}")]
    Address {
        /// Address the frame came from
        got: String,
    },

    // ========================================
    // Ordering Errors
    // ========================================

    /// Replayed, reordered or exhausted sequence number.
    #[error("Sequence error: got {got}, {expected}")]
    Sequence {
        /// Rule the sequence failed
        expected: String,
        /// Sequence found in the header
        got: u32,
    },

    /// Message type is not a legal successor of the previous one.
    #[error("Stop-token violation: 0x{message_type:02x} may not follow 0x{previous:02x}")]
    Adjacency {
        /// Offending type byte
        message_type: u8,
        /// Type of the previous frame in the same direction (0xFF if none)
        previous: u8,
    },

    /// Message is not valid in the current transaction state.
    #[error("Transaction error: 0x{message_type:02x} not allowed while {state}")]
    Transaction {
        /// Offending type byte
        message_type: u8,
        /// Current transaction state
        state: &'static str,
    },

    /// A timer expired.
    #[error("Timed out: {what}")]
    Timeout {
        /// What timed out
        what: &'static str,
    },

    // ========================================
    // Cryptographic Errors
    // ========================================

    /// Tag mismatch (header tag or AEAD tag).
    #[error("Authentication failed")]
    Authentication,

    /// Envelope is structurally unusable (short body, IV mismatch, padding).
    #[error("Decryption failed: {reason}")]
    Decryption {
        /// What was wrong
        reason: &'static str,
    },

    /// Envelope sealing failed.
    #[error("Encryption failed: {context}")]
    Encryption {
        /// What was being encrypted
        context: String,
    },

    /// Pairing handshake refused or not complete.
    #[error("Pairing error: {reason}")]
    Pairing {
        /// Why pairing failed
        reason: String,
    },

    /// Error frame whose tag does not prove the peer holds the link key.
    #[error("Unauthenticated error report from peer")]
    UnverifiedReport,

    /// Status-check challenge failed.
    #[error("Status check failed: {reason}")]
    StatusCheck {
        /// Why the check failed
        reason: &'static str,
    },
}

fn display_expected(expected: &Option<DeviceId>) -> String {
    expected.map_or_else(|| "no bound peer".to_string(), |id| id.to_string())
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `Length` error.
    #[must_use]
    pub const fn length(actual: usize, expected: usize, reason: &'static str) -> Self {
        Self::Length {
            actual,
            expected,
            reason,
        }
    }

    /// Creates a `Pairing` error.
    pub fn pairing(reason: impl Into<String>) -> Self {
        Self::Pairing {
            reason: reason.into(),
        }
    }

    /// Creates a `Sequence` error.
    pub fn sequence(got: u32, expected: impl Into<String>) -> Self {
        Self::Sequence {
            expected: expected.into(),
            got,
        }
    }

    /// Creates an `Encryption` error.
    pub fn encryption(context: impl Into<String>) -> Self {
        Self::Encryption {
            context: context.into(),
        }
    }

    // ========================================
    // Classification
    // ========================================

    /// Returns the failure classification reported to the application.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::AllocationFailure { .. } => FailureKind::AllocationFailure,
            Self::Receiver { .. } => FailureKind::ReceiverError,
            Self::Handling { .. } => FailureKind::HandlingError,
            Self::Length { .. } | Self::Truncated { .. } => FailureKind::LengthError,
            Self::DeviceId { .. } => FailureKind::DeviceIdError,
            Self::Type(_) => FailureKind::TypeError,
            Self::Address { .. } => FailureKind::AddressError,
            Self::Sequence { .. } => FailureKind::SequenceError,
            Self::Adjacency { .. } => FailureKind::AdjacencyError,
            Self::Transaction { .. } => FailureKind::TransactionError,
            Self::Timeout { .. } => FailureKind::TimeoutError,
            Self::Authentication => FailureKind::AuthenticationError,
            Self::Decryption { .. } | Self::Encryption { .. } => FailureKind::DecryptionError,
            Self::Pairing { .. } | Self::UnverifiedReport => FailureKind::PairingError,
            Self::StatusCheck { .. } => FailureKind::StatusCheckError,
        }
    }

    /// Returns `true` if the link can no longer be trusted with the
    /// current key and pairing must be redone.
    #[must_use]
    pub const fn reverts_pairing(&self) -> bool {
        matches!(self, Self::Authentication | Self::Decryption { .. })
    }

    /// Returns `true` if the error may indicate an attack rather than a
    /// benign fault.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(
            self,
            Self::Authentication
                | Self::Decryption { .. }
                | Self::UnverifiedReport
                | Self::Sequence { .. }
                | Self::Address { .. }
                | Self::DeviceId { .. }
        )
    }

    /// Number of buffered bytes to discard to resynchronize after a
    /// truncated frame, if any.
    #[must_use]
    pub const fn skip_hint(&self) -> Option<usize> {
        match self {
            Self::Truncated { declared, received } if *declared > *received => {
                Some(*declared - *received)
            }
            _ => None,
        }
    }
}

// ============================================
// FailureKind
// ============================================

/// Failure classification surfaced to the application and carried in
/// Error frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FailureKind {
    /// No data available.
    NotFound = 0x01,
    /// Buffer allocation failed.
    AllocationFailure = 0x02,
    /// Length rule broken.
    LengthError = 0x03,
    /// Unexpected device id.
    DeviceIdError = 0x04,
    /// Unknown message type.
    TypeError = 0x05,
    /// Replay or reordering.
    SequenceError = 0x06,
    /// Stop-token violation.
    AdjacencyError = 0x07,
    /// Tag mismatch.
    AuthenticationError = 0x08,
    /// Envelope unusable.
    DecryptionError = 0x09,
    /// Wrong transaction state.
    TransactionError = 0x0A,
    /// Pairing refused or incomplete.
    PairingError = 0x0B,
    /// Status check failed.
    StatusCheckError = 0x0C,
    /// Transport receive fault.
    ReceiverError = 0x0D,
    /// Callback fault.
    HandlingError = 0x0E,
    /// Timer expired.
    TimeoutError = 0x0F,
    /// Unexpected peer address.
    AddressError = 0x10,
}

impl FailureKind {
    /// Every kind, in code order.
    pub const ALL: [Self; 16] = [
        Self::NotFound,
        Self::AllocationFailure,
        Self::LengthError,
        Self::DeviceIdError,
        Self::TypeError,
        Self::SequenceError,
        Self::AdjacencyError,
        Self::AuthenticationError,
        Self::DecryptionError,
        Self::TransactionError,
        Self::PairingError,
        Self::StatusCheckError,
        Self::ReceiverError,
        Self::HandlingError,
        Self::TimeoutError,
        Self::AddressError,
    ];

    /// Returns the wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Parses a wire code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.code() == code)
    }

    /// Index into per-kind counter arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        (self as u8 - 1) as usize
    }

    /// Returns the kind name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::AllocationFailure => "AllocationFailure",
            Self::LengthError => "LengthError",
            Self::DeviceIdError => "DeviceIdError",
            Self::TypeError => "TypeError",
            Self::SequenceError => "SequenceError",
            Self::AdjacencyError => "AdjacencyError",
            Self::AuthenticationError => "AuthenticationError",
            Self::DecryptionError => "DecryptionError",
            Self::TransactionError => "TransactionError",
            Self::PairingError => "PairingError",
            Self::StatusCheckError => "StatusCheckError",
            Self::ReceiverError => "ReceiverError",
            Self::HandlingError => "HandlingError",
            Self::TimeoutError => "TimeoutError",
            Self::AddressError => "AddressError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(CoreError::Authentication.kind(), FailureKind::AuthenticationError);
        assert_eq!(CoreError::Type(0x42).kind(), FailureKind::TypeError);
        assert_eq!(
            CoreError::length(60, 47, "below minimum length").kind(),
            FailureKind::LengthError
        );
        assert_eq!(CoreError::pairing("x").kind(), FailureKind::PairingError);
    }

    #[test]
    fn test_reverts_pairing() {
        assert!(CoreError::Authentication.reverts_pairing());
        assert!(CoreError::Decryption { reason: "iv" }.reverts_pairing());
        assert!(!CoreError::sequence(1, "greater than 1").reverts_pairing());
        assert!(!CoreError::UnverifiedReport.reverts_pairing());
        assert_eq!(CoreError::UnverifiedReport.kind(), FailureKind::PairingError);
    }

    #[test]
    fn test_skip_hint() {
        let truncated = CoreError::Truncated {
            declared: 100,
            received: 60,
        };
        assert_eq!(truncated.skip_hint(), Some(40));
        assert_eq!(truncated.kind(), FailureKind::LengthError);
        assert_eq!(CoreError::length(100, 60, "fixed length mismatch").skip_hint(), None);
        assert_eq!(CoreError::Authentication.skip_hint(), None);
    }

    #[test]
    fn test_failure_kind_codes() {
        for (i, kind) in FailureKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(FailureKind::from_code(kind.code()), Some(*kind));
        }
        assert_eq!(FailureKind::from_code(0), None);
        assert_eq!(FailureKind::from_code(0x11), None);
        assert_eq!(FailureKind::TimeoutError.to_string(), "TimeoutError");
    }

    #[test]
    fn test_device_id_message() {
        let err = CoreError::DeviceId {
            expected: None,
            got: DeviceId::from(7u64),
        };
        assert!(err.to_string().contains("no bound peer"));
    }
}
