// ============================================
// File: crates/bondlink-node/src/error.rs
// ============================================
//! # Node Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use bondlink_common::CommonError;
use bondlink_core::CoreError;
use bondlink_transport::TransportError;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Node error types.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// File path
        path: String,
        /// Underlying fault
        reason: String,
    },

    /// Configuration value out of range.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Connection was shut down.
    #[error("Connection is shut down")]
    ShutDown,

    /// An application callback failed.
    #[error("Event handler failed: {reason}")]
    Handler {
        /// Underlying fault
        reason: String,
    },

    /// A wait did not complete in time.
    #[error("Timed out waiting for {what}")]
    WaitTimeout {
        /// What was awaited
        what: &'static str,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Protocol error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl NodeError {
    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Handler` error.
    pub fn handler(reason: impl Into<String>) -> Self {
        Self::Handler {
            reason: reason.into(),
        }
    }

    /// Returns `true` for configuration errors.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` if the link key was dropped and pairing must be redone.
    #[must_use]
    pub const fn requires_pairing(&self) -> bool {
        match self {
            Self::Core(e) => e.reverts_pairing() || matches!(e, CoreError::Pairing { .. }),
            _ => false,
        }
    }

    /// Returns `true` if retrying the operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::WaitTimeout { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NodeError::config_load("/etc/bondlink.toml", "file not found");
        assert!(err.to_string().contains("/etc/bondlink.toml"));
    }

    #[test]
    fn test_error_classification() {
        assert!(NodeError::config_invalid("node.device_id", "must not be 0").is_config_error());
        assert!(!NodeError::ShutDown.is_config_error());

        let pairing: NodeError = CoreError::pairing("link not paired").into();
        assert!(pairing.requires_pairing());
        assert!(NodeError::from(CoreError::Authentication).requires_pairing());
        assert!(!NodeError::from(CoreError::Type(0x42)).requires_pairing());

        let transient: NodeError = TransportError::transmit_failed("busy").into();
        assert!(transient.is_retryable());
        assert!(!NodeError::from(TransportError::Closed).is_retryable());
    }
}
