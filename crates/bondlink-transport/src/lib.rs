// ============================================
// File: crates/bondlink-transport/src/lib.rs
// ============================================
//! # BondLink Transport - Link I/O Layer
//!
//! ## Creation Reason
//! The protocol engine is transport-agnostic. This crate defines the
//! capability it needs from a physical or virtual link and ships an
//! in-memory implementation for tests and demos.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: `LinkTransport` capability trait
//! - [`mock`]: `MockLink`, a connected in-memory endpoint pair
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 bondlink-node                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   bondlink-core         bondlink-transport          │
//! │                         You are here ◄──            │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             bondlink-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always go through the trait; the node runtime holds
//!   `Arc<dyn LinkTransport>`
//! - Real radio/serial drivers belong in their own crates
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod mock;
pub mod traits;

// Re-export primary types
pub use error::{Result, TransportError};
pub use mock::MockLink;
pub use traits::{ConnectionStatus, InterfaceHandle, LinkTransport, RawFrame};
