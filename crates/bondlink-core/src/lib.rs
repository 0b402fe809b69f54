// ============================================
// File: crates/bondlink-core/src/lib.rs
// ============================================
//! # BondLink Core - Protocol Engine
//!
//! ## Creation Reason
//! Everything that decides whether a frame is acceptable and how an
//! outbound frame is built: wire layout, key agreement, body
//! encryption, ordering and transaction rules. No I/O happens here.
//!
//! ## Main Functionality
//!
//! ### Protocol Module ([`protocol`])
//! - Static message definition table
//! - Schema-driven frame parsing and assembly
//! - Transaction footer
//!
//! ### Crypto Module ([`crypto`])
//! - X25519 key agreement, HKDF-SHA256 key schedule
//! - ChaCha20-Poly1305 body envelope
//! - SHA-256 / HMAC-SHA256 header tags and status digests
//!
//! ### Link State ([`controller`], [`pairing`], [`status_check`])
//! - Pairing handshake with mutual digest confirmation
//! - Sequence, adjacency and transaction enforcement
//! - Liveness challenge
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 bondlink-node                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   bondlink-core         bondlink-transport          │
//! │   You are here                │                     │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             bondlink-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Guarantees
//! - **Confidentiality**: ChaCha20-Poly1305 on payload types
//! - **Integrity**: header tag on every frame, keyed once paired
//! - **Replay Protection**: strictly increasing sequence per direction,
//!   floor carried across re-pairing by the Digest-Match exchange
//! - **Forward Secrecy**: fresh X25519 pair per pairing
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL cryptographic code uses audited RustCrypto implementations
//! - ALL key material MUST be zeroized on drop
//! - Type bytes, slots and failure codes are wire-visible
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod controller;
pub mod crypto;
pub mod error;
pub mod pairing;
pub mod protocol;
pub mod status_check;

// Re-export commonly used items
pub use controller::{
    Accepted, ControllerConfig, FeatureFlags, LinkController, OperatingMode, PreparedFrame,
    Reply, TransactionStatus,
};
pub use error::{CoreError, FailureKind, Result};
pub use pairing::{PairingStatus, Role};
pub use protocol::{Footer, FooterToken, MessageType};
