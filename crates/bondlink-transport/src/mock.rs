// ============================================
// File: crates/bondlink-transport/src/mock.rs
// ============================================
//! # In-Memory Link
//!
//! ## Creation Reason
//! Two connected endpoints inside one process, for tests and the
//! loopback demo. Each endpoint's transmit lands in the other's receive
//! queue, tagged with the sender's link address.
//!
//! ## Main Functionality
//! - `MockLink::pair`: create two connected endpoints
//! - Fault injection: refuse transmits, drop the connection
//! - Raw injection of arbitrary bytes into an endpoint's receive queue
//! - Record of every transmitted frame
//!
//! ## ⚠️ Important Note for Next Developer
//! - Receive queues are bounded; transmitting into a full queue fails
//!   instead of blocking
//!
//! ## Last Modified
//! v0.1.0 - Initial in-memory link

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, Bytes};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, trace};

use bondlink_common::LinkAddress;

use crate::error::{Result, TransportError};
use crate::traits::{ConnectionStatus, InterfaceHandle, LinkTransport, RawFrame};

/// Default receive queue depth.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Largest frame the mock link carries.
pub const MAX_LINK_FRAME: usize = u16::MAX as usize;

static NEXT_HANDLE: AtomicU16 = AtomicU16::new(1);

// ============================================
// FrameQueue
// ============================================

#[derive(Debug)]
struct FrameQueue {
    frames: Mutex<VecDeque<RawFrame>>,
    notify: Notify,
    depth: usize,
}

impl FrameQueue {
    fn new(depth: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(depth)),
            notify: Notify::new(),
            depth,
        }
    }

    fn push(&self, frame: RawFrame) -> Result<()> {
        {
            let mut frames = self.frames.lock();
            if frames.len() >= self.depth {
                return Err(TransportError::transmit_failed("receive queue full"));
            }
            frames.push_back(frame);
        }
        self.notify.notify_one();
        Ok(())
    }

    fn pop(&self) -> Option<RawFrame> {
        self.frames.lock().pop_front()
    }
}

// ============================================
// MockLink
// ============================================

/// One endpoint of an in-memory link.
///
/// # Example
/// ```
/// use bondlink_transport::MockLink;
///
/// let (a, b) = MockLink::pair(
///     "aa:00:00:00:00:01".parse().unwrap(),
///     "aa:00:00:00:00:02".parse().unwrap(),
/// );
/// assert_eq!(a.peer_address(), b.local_address());
/// ```
#[derive(Debug)]
pub struct MockLink {
    local: LinkAddress,
    peer: LinkAddress,
    handle: InterfaceHandle,
    inbox: Arc<FrameQueue>,
    outbox: Arc<FrameQueue>,
    connected: Arc<AtomicBool>,
    fail_transmit: AtomicBool,
    sent: Mutex<Vec<Bytes>>,
    skipped: AtomicUsize,
}

impl MockLink {
    /// Creates two connected endpoints with the default queue depth.
    #[must_use]
    pub fn pair(a: LinkAddress, b: LinkAddress) -> (Self, Self) {
        Self::pair_with_depth(a, b, DEFAULT_QUEUE_DEPTH)
    }

    /// Creates two connected endpoints with the given queue depth.
    #[must_use]
    pub fn pair_with_depth(a: LinkAddress, b: LinkAddress, depth: usize) -> (Self, Self) {
        let a_inbox = Arc::new(FrameQueue::new(depth));
        let b_inbox = Arc::new(FrameQueue::new(depth));
        let connected = Arc::new(AtomicBool::new(true));
        let endpoint = |local, peer, inbox: &Arc<FrameQueue>, outbox: &Arc<FrameQueue>| Self {
            local,
            peer,
            handle: InterfaceHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)),
            inbox: Arc::clone(inbox),
            outbox: Arc::clone(outbox),
            connected: Arc::clone(&connected),
            fail_transmit: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            skipped: AtomicUsize::new(0),
        };
        let first = endpoint(a, b, &a_inbox, &b_inbox);
        let second = endpoint(b, a, &b_inbox, &a_inbox);
        debug!(a = %a, b = %b, "Mock link created");
        (first, second)
    }

    /// This endpoint's address.
    #[must_use]
    pub const fn local_address(&self) -> LinkAddress {
        self.local
    }

    /// The other endpoint's address.
    #[must_use]
    pub const fn peer_address(&self) -> LinkAddress {
        self.peer
    }

    /// Queues raw bytes for this endpoint as if `source` had sent them.
    ///
    /// # Errors
    /// `TransmitFailed` if the receive queue is full.
    pub fn inject(&self, bytes: impl Into<Bytes>, source: LinkAddress) -> Result<()> {
        self.inbox.push(RawFrame::new(bytes, source))
    }

    /// Frames transmitted by this endpoint so far, draining the record.
    pub fn take_sent(&self) -> Vec<Bytes> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Makes subsequent transmits fail.
    pub fn set_fail_transmit(&self, fail: bool) {
        self.fail_transmit.store(fail, Ordering::Relaxed);
    }

    /// Connects or disconnects both endpoints.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
        // Wake a blocked receiver so it observes the change.
        self.inbox.notify.notify_one();
        self.outbox.notify.notify_one();
    }

    /// Bytes discarded through `skip_receive`.
    #[must_use]
    pub fn skipped_bytes(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Frames waiting in this endpoint's receive queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbox.frames.lock().len()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LinkTransport for MockLink {
    fn interface_handle(&self) -> InterfaceHandle {
        self.handle
    }

    fn connection_status(&self) -> ConnectionStatus {
        if self.is_connected() {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        }
    }

    async fn receive(&self, timeout: Duration) -> Result<Option<RawFrame>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.inbox.notify.notified();
            if let Some(frame) = self.inbox.pop() {
                trace!(len = frame.len(), source = %frame.source, "Mock frame received");
                return Ok(Some(frame));
            }
            if !self.is_connected() {
                return Err(TransportError::NotConnected);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn transmit(&self, bytes: &[u8]) -> Result<usize> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if self.fail_transmit.load(Ordering::Relaxed) {
            return Err(TransportError::transmit_failed("injected fault"));
        }
        if bytes.len() > MAX_LINK_FRAME {
            return Err(TransportError::FrameTooLarge {
                size: bytes.len(),
                max: MAX_LINK_FRAME,
            });
        }
        let frame = Bytes::copy_from_slice(bytes);
        self.outbox.push(RawFrame::new(frame.clone(), self.local))?;
        self.sent.lock().push(frame);
        Ok(bytes.len())
    }

    fn clear_receive_queue(&self) {
        let dropped = {
            let mut frames = self.inbox.frames.lock();
            let n = frames.len();
            frames.clear();
            n
        };
        debug!(dropped, "Mock receive queue cleared");
    }

    fn skip_receive(&self, length: usize) {
        let mut remaining = length;
        let mut frames = self.inbox.frames.lock();
        while remaining > 0 {
            let Some(mut frame) = frames.pop_front() else {
                break;
            };
            if frame.len() <= remaining {
                remaining -= frame.len();
            } else {
                frame.bytes.advance(remaining);
                remaining = 0;
                frames.push_front(frame);
            }
        }
        self.skipped
            .fetch_add(length - remaining, Ordering::Relaxed);
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs() -> (LinkAddress, LinkAddress) {
        (
            LinkAddress::new([0xAA, 0, 0, 0, 0, 1]),
            LinkAddress::new([0xAA, 0, 0, 0, 0, 2]),
        )
    }

    #[tokio::test]
    async fn test_transmit_reaches_peer() {
        let (x, y) = addrs();
        let (a, b) = MockLink::pair(x, y);

        assert_eq!(a.transmit(b"ping").await.unwrap(), 4);
        let frame = b.receive(Duration::from_millis(100)).await.unwrap().unwrap();
        assert_eq!(&frame.bytes[..], b"ping");
        assert_eq!(frame.source, x);
        assert_eq!(a.take_sent(), vec![Bytes::from_static(b"ping")]);
        assert!(a.take_sent().is_empty());
        assert_ne!(a.interface_handle(), b.interface_handle());
    }

    #[tokio::test]
    async fn test_receive_timeout() {
        let (x, y) = addrs();
        let (_a, b) = MockLink::pair(x, y);
        let frame = b.receive(Duration::from_millis(10)).await.unwrap();
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn test_receive_wakes_on_transmit() {
        let (x, y) = addrs();
        let (a, b) = MockLink::pair(x, y);
        let b = Arc::new(b);
        let waiter = {
            let b = Arc::clone(&b);
            tokio::spawn(async move { b.receive(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        a.transmit(b"late").await.unwrap();
        let frame = waiter.await.unwrap().unwrap().unwrap();
        assert_eq!(&frame.bytes[..], b"late");
    }

    #[tokio::test]
    async fn test_faults() {
        let (x, y) = addrs();
        let (a, b) = MockLink::pair(x, y);

        a.set_fail_transmit(true);
        assert!(matches!(
            a.transmit(b"x").await,
            Err(TransportError::TransmitFailed { .. })
        ));
        a.set_fail_transmit(false);

        b.set_connected(false);
        assert_eq!(a.connection_status(), ConnectionStatus::Disconnected);
        assert!(matches!(
            a.transmit(b"x").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            b.receive(Duration::from_millis(10)).await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_queue_depth() {
        let (x, y) = addrs();
        let (a, b) = MockLink::pair_with_depth(x, y, 1);
        a.transmit(b"1").await.unwrap();
        assert!(a.transmit(b"2").await.is_err());
        assert_eq!(b.pending(), 1);
        b.clear_receive_queue();
        assert_eq!(b.pending(), 0);
    }

    #[tokio::test]
    async fn test_skip_receive_spans_frames() {
        let (x, y) = addrs();
        let (_a, b) = MockLink::pair(x, y);
        b.inject(vec![1u8; 4], x).unwrap();
        b.inject(vec![2u8, 3, 4], x).unwrap();

        b.skip_receive(5);
        assert_eq!(b.skipped_bytes(), 5);
        let rest = b.receive(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(&rest.bytes[..], &[3, 4]);

        // Nothing left: only what was actually buffered counts.
        b.skip_receive(10);
        assert_eq!(b.skipped_bytes(), 5);
    }
}
