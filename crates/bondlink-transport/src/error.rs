// ============================================
// File: crates/bondlink-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Errors raised by a link transport, separate from protocol errors so
//! the runtime can tell a dead link from a bad frame.
//!
//! ## Main Functionality
//! - `TransportError`: link I/O failures
//! - Classification helpers used by the receive loop
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use bondlink_common::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The link is down.
    #[error("Link not connected")]
    NotConnected,

    /// Transmit did not complete.
    #[error("Transmit failed: {reason}")]
    TransmitFailed {
        /// Why transmit failed
        reason: String,
    },

    /// Receive did not complete.
    #[error("Receive failed: {reason}")]
    ReceiveFailed {
        /// Why receive failed
        reason: String,
    },

    /// Frame larger than the link can carry.
    #[error("Frame of {size} bytes exceeds link limit of {max}")]
    FrameTooLarge {
        /// Frame size
        size: usize,
        /// Link limit
        max: usize,
    },

    /// Transport was closed and will not deliver again.
    #[error("Transport closed")]
    Closed,

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `TransmitFailed` error.
    pub fn transmit_failed(reason: impl Into<String>) -> Self {
        Self::TransmitFailed {
            reason: reason.into(),
        }
    }

    /// Creates a `ReceiveFailed` error.
    pub fn receive_failed(reason: impl Into<String>) -> Self {
        Self::ReceiveFailed {
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if the operation may succeed when repeated.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransmitFailed { .. } | Self::ReceiveFailed { .. }
        )
    }

    /// Returns `true` if the link itself is gone.
    #[must_use]
    pub const fn is_link_down(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Closed)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::FrameTooLarge { size: 70000, max: 65535 };
        assert!(err.to_string().contains("70000"));
        assert!(TransportError::transmit_failed("queue full")
            .to_string()
            .contains("queue full"));
    }

    #[test]
    fn test_error_classification() {
        assert!(TransportError::transmit_failed("x").is_retryable());
        assert!(TransportError::receive_failed("x").is_retryable());
        assert!(!TransportError::NotConnected.is_retryable());
        assert!(TransportError::NotConnected.is_link_down());
        assert!(TransportError::Closed.is_link_down());
    }

    #[test]
    fn test_common_conversion() {
        let err: TransportError = CommonError::parse("LinkAddress", "zz").into();
        assert!(matches!(err, TransportError::Common(_)));
    }
}
