// ============================================
// File: crates/bondlink-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! The protocol runtime never talks to a radio or socket directly. It is
//! handed a `LinkTransport` at construction and uses only the operations
//! defined here.
//!
//! ## Main Functionality
//! - `LinkTransport`: receive/transmit capability of one link
//! - `RawFrame`: bytes as they came off the link, with their source
//! - `InterfaceHandle` / `ConnectionStatus`: link identity and state
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be `Send + Sync`; the receiver task and
//!   application senders share one instance
//! - `receive` returning `Ok(None)` means "nothing within the timeout",
//!   not an error
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;

use bondlink_common::LinkAddress;

use crate::error::Result;

// ============================================
// RawFrame
// ============================================

/// Bytes received from the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame bytes (possibly a truncated or trailing fragment).
    pub bytes: Bytes,
    /// Link address of the sender.
    pub source: LinkAddress,
    /// When the bytes were received.
    pub received_at: Instant,
}

impl RawFrame {
    /// Creates a frame received now.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>, source: LinkAddress) -> Self {
        Self {
            bytes: bytes.into(),
            source,
            received_at: Instant::now(),
        }
    }

    /// Frame length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ============================================
// Link identity and state
// ============================================

/// Opaque handle of the underlying link interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceHandle(pub u16);

impl fmt::Display for InterfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Link connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Frames can flow.
    Connected,
    /// Link is down.
    Disconnected,
}

impl ConnectionStatus {
    /// Returns `true` when connected.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ============================================
// LinkTransport Trait
// ============================================

/// Receive/transmit capability of one point-to-point link.
///
/// # Example
/// ```ignore
/// async fn pump<T: LinkTransport>(link: &T) -> Result<()> {
///     while let Some(frame) = link.receive(Duration::from_millis(100)).await? {
///         link.transmit(&frame.bytes).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait LinkTransport: Send + Sync {
    /// Handle of the underlying interface.
    fn interface_handle(&self) -> InterfaceHandle;

    /// Current connection state.
    fn connection_status(&self) -> ConnectionStatus;

    /// Waits up to `timeout` for the next frame.
    ///
    /// # Errors
    /// Returns error if the link failed or closed.
    async fn receive(&self, timeout: Duration) -> Result<Option<RawFrame>>;

    /// Sends one frame; returns the number of bytes written.
    ///
    /// # Errors
    /// Returns error if the link refused the frame.
    async fn transmit(&self, bytes: &[u8]) -> Result<usize>;

    /// Drops everything queued for receive.
    fn clear_receive_queue(&self);

    /// Discards the next `length` buffered bytes.
    fn skip_receive(&self, length: usize);
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_frame() {
        let source = LinkAddress::new([1, 2, 3, 4, 5, 6]);
        let frame = RawFrame::new(vec![1u8, 2, 3], source);
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_empty());
        assert_eq!(frame.source, source);
    }

    #[test]
    fn test_status_and_handle() {
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(!ConnectionStatus::Disconnected.is_connected());
        assert_eq!(InterfaceHandle(7).to_string(), "if7");
    }
}
