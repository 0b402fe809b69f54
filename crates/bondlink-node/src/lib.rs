// ============================================
// File: crates/bondlink-node/src/lib.rs
// ============================================
//! # BondLink Node Library
//!
//! ## Creation Reason
//! Runs the protocol engine against a real (or in-memory) link: one
//! `Connection` per peer, a receiver task that validates and answers
//! frames, and a dispatcher task that hands events to the application.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: TOML node configuration
//! - [`connection`]: connection lifecycle and outbound operations
//! - [`pipeline`]: receiver and dispatcher workers
//! - [`events`]: application callback trait and event types
//! - [`stats`]: per-connection counters
//! - [`error`]: node-level error types
//!
//! ## Architecture Overview
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       Connection                           │
//! ├────────────────────────────────────────────────────────────┤
//! │                                                            │
//! │  application ──► send / pair / status_check ──┐            │
//! │                                               ▼            │
//! │  ┌────────────┐    ┌────────────────────────────────────┐  │
//! │  │  Receiver  │───►│  Mutex<LinkController> + transmit  │  │
//! │  │    task    │    └────────────────────────────────────┘  │
//! │  └─────┬──────┘                                            │
//! │        │ bounded mpsc                                      │
//! │        ▼                                                   │
//! │  ┌────────────┐                                            │
//! │  │ Dispatcher │───► EventHandler (on_event / on_ticket)    │
//! │  │    task    │                                            │
//! │  └────────────┘                                            │
//! ├────────────────────────────────────────────────────────────┤
//! │                 LinkTransport (injected)                   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Configuration is fixed once a connection starts
//! - Shutdown order matters: stop tasks, drain queue, then zero keys
//!
//! ## Last Modified
//! v0.1.0 - Initial node library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod stats;

// Re-export primary types
pub use config::NodeConfig;
pub use connection::Connection;
pub use error::{NodeError, Result};
pub use events::{
    ChannelEventHandler, EventHandler, InboundMessage, LinkEvent, LoggingEventHandler,
    TicketEvent,
};
pub use pipeline::{MessageSet, OverflowPolicy, PipelineSettings};
pub use stats::{ConnectionStats, StatsSnapshot};
