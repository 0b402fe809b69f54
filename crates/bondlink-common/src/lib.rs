// ============================================
// File: crates/bondlink-common/src/lib.rs
// ============================================
//! # BondLink Common - Shared Types Library
//!
//! ## Creation Reason
//! Holds the identifiers and small utilities that every BondLink crate
//! agrees on, so the wire engine, the transport layer and the node runtime
//! never disagree on what a device id or a link address looks like.
//!
//! ## Main Functionality
//! - [`types`]: `DeviceId`, `LinkAddress`, `SequenceNumber`
//! - [`time`]: the `Deadline` timer used by the controller
//! - [`error`]: `CommonError` and the crate `Result` alias
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               bondlink-node                         │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   bondlink-core        bondlink-transport           │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             bondlink-common  ◄── You are here       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Leaf crate: no internal dependencies, keep external ones minimal
//! - Every multi-byte value here is little-endian on the wire
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

pub use error::{CommonError, Result};
pub use time::Deadline;
pub use types::{DeviceId, LinkAddress, SequenceNumber};
