// ============================================
// File: crates/bondlink-node/src/events.rs
// ============================================
//! # Application Events
//!
//! ## Creation Reason
//! The application is told about accepted frames, completed pairings and
//! receive failures through one callback object injected at start.
//!
//! ## Main Functionality
//! - `LinkEvent`: what the dispatcher delivers
//! - `TicketEvent`: extra notification for ticket-relevant types
//! - `EventHandler`: the callback trait
//! - `ChannelEventHandler`: forwards events into tokio channels
//! - `LoggingEventHandler`: logs events, used by the CLI demo
//!
//! ## ⚠️ Important Note for Next Developer
//! - Callbacks run on the dispatcher task, never on the receiver
//! - A failing callback is counted and logged; it never stops delivery
//!
//! ## Last Modified
//! v0.1.0 - Initial event definitions

use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use bondlink_common::{DeviceId, LinkAddress};
use bondlink_core::{Accepted, FailureKind, Footer, MessageType};

use crate::error::{NodeError, Result};

// ============================================
// Events
// ============================================

/// Accepted inbound frame, as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sending device.
    pub device_id: DeviceId,
    /// Link address the frame came from.
    pub address: Option<LinkAddress>,
    /// Message type.
    pub message_type: MessageType,
    /// Header sequence number.
    pub sequence: u32,
    /// Decrypted payload, padding removed.
    pub payload: Vec<u8>,
    /// Transaction footer, if the type carries one.
    pub footer: Option<Footer>,
    /// When the transport handed the frame over.
    pub received_at: Instant,
}

impl InboundMessage {
    /// Builds the application view of an accepted frame.
    #[must_use]
    pub fn from_accepted(accepted: Accepted, received_at: Instant) -> Self {
        Self {
            device_id: accepted.device_id,
            address: accepted.address,
            message_type: accepted.message_type,
            sequence: accepted.sequence,
            payload: accepted.payload,
            footer: accepted.footer,
            received_at,
        }
    }
}

/// Event delivered by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A frame passed every check.
    Message(InboundMessage),
    /// Pairing with the peer is mutually confirmed on this side.
    Paired {
        /// Paired device
        device_id: DeviceId,
    },
    /// A frame was refused or a timer expired.
    Failure {
        /// Classification
        kind: FailureKind,
        /// Human-readable detail
        detail: String,
    },
}

/// Notification for ticket-relevant message types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketEvent {
    /// Sending device.
    pub device_id: DeviceId,
    /// Message type that carried the ticket.
    pub message_type: MessageType,
    /// Ticket bytes.
    pub ticket: Vec<u8>,
}

impl TicketEvent {
    /// Returns the ticket event for `message`, if its type is ticket-relevant.
    #[must_use]
    pub fn for_message(message: &InboundMessage) -> Option<Self> {
        message
            .message_type
            .definition()
            .ticket_relevant
            .then(|| Self {
                device_id: message.device_id,
                message_type: message.message_type,
                ticket: message.payload.clone(),
            })
    }
}

// ============================================
// EventHandler Trait
// ============================================

/// Application callbacks.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called for every dispatched event.
    ///
    /// # Errors
    /// Counted as a handling failure; delivery continues.
    async fn on_event(&self, event: &LinkEvent) -> Result<()>;

    /// Called after `on_event` for ticket-relevant messages.
    ///
    /// # Errors
    /// Counted as a handling failure; delivery continues.
    async fn on_ticket(&self, _ticket: &TicketEvent) -> Result<()> {
        Ok(())
    }
}

// ============================================
// ChannelEventHandler
// ============================================

/// Forwards events and tickets into unbounded channels.
#[derive(Debug, Clone)]
pub struct ChannelEventHandler {
    events: mpsc::UnboundedSender<LinkEvent>,
    tickets: mpsc::UnboundedSender<TicketEvent>,
}

impl ChannelEventHandler {
    /// Creates the handler and the receiving ends.
    #[must_use]
    pub fn new() -> (
        Self,
        mpsc::UnboundedReceiver<LinkEvent>,
        mpsc::UnboundedReceiver<TicketEvent>,
    ) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let (tickets, ticket_rx) = mpsc::unbounded_channel();
        (Self { events, tickets }, event_rx, ticket_rx)
    }
}

#[async_trait]
impl EventHandler for ChannelEventHandler {
    async fn on_event(&self, event: &LinkEvent) -> Result<()> {
        self.events
            .send(event.clone())
            .map_err(|_| NodeError::handler("event receiver dropped"))
    }

    async fn on_ticket(&self, ticket: &TicketEvent) -> Result<()> {
        self.tickets
            .send(ticket.clone())
            .map_err(|_| NodeError::handler("ticket receiver dropped"))
    }
}

// ============================================
// LoggingEventHandler
// ============================================

/// Logs every event under a fixed label.
#[derive(Debug, Clone)]
pub struct LoggingEventHandler {
    label: &'static str,
}

impl LoggingEventHandler {
    /// Creates a handler whose log lines carry `label`.
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self { label }
    }
}

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn on_event(&self, event: &LinkEvent) -> Result<()> {
        match event {
            LinkEvent::Message(message) => info!(
                node = self.label,
                peer = %message.device_id,
                message_type = %message.message_type,
                seq = message.sequence,
                len = message.payload.len(),
                "Message received"
            ),
            LinkEvent::Paired { device_id } => {
                info!(node = self.label, peer = %device_id, "Paired");
            }
            LinkEvent::Failure { kind, detail } => {
                warn!(node = self.label, kind = %kind, detail = %detail, "Link failure");
            }
        }
        Ok(())
    }

    async fn on_ticket(&self, ticket: &TicketEvent) -> Result<()> {
        let shown = &ticket.ticket[..ticket.ticket.len().min(4)];
        info!(
            node = self.label,
            message_type = %ticket.message_type,
            ticket = %hex::encode(shown),
            "Ticket received"
        );
        Ok(())
    }
}

// ============================================
// Tests
// ============================================
