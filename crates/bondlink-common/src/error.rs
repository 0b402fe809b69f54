// ============================================
// File: crates/bondlink-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Base error type for parsing and validating the shared identifiers.
//! Higher crates wrap it (`TransportError`, `NodeError`) via `From`.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never put key material in an error message
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

/// Common result type.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Errors shared across BondLink crates.
///
/// # Example
/// ```
/// use bondlink_common::error::CommonError;
///
/// let err = CommonError::parse("LinkAddress", "zz:01");
/// assert_eq!(err.to_string(), "Failed to parse LinkAddress from 'zz:01'");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Text could not be parsed into the requested type.
    #[error("Failed to parse {what} from '{input}'")]
    Parse {
        /// Target type name
        what: &'static str,
        /// Offending input
        input: String,
    },
}

impl CommonError {
    /// Creates a `Parse` error.
    pub fn parse(what: &'static str, input: impl Into<String>) -> Self {
        Self::Parse {
            what,
            input: input.into(),
        }
    }
}
