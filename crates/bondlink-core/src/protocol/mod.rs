// ============================================
// File: crates/bondlink-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Wire-level layout of a BondLink frame and the static table describing
//! every message type.
//!
//! ## Main Functionality
//! - [`definitions`]: `MessageType` and the per-type `MessageDefinition`
//! - [`frame`]: schema-driven header parsing and frame assembly
//! - [`footer`]: the 15-byte stop/continuation trailer
//!
//! ## Frame Layout
//! ```text
//! offset  size  field
//! ──────  ────  ─────────────────────────────
//!      0     8  device id (sender)
//!      8     1  message type
//!      9     2  message length (whole frame, LE)
//!     11     4  sequence number (LE)
//!     15    32  authentication tag
//!     47     *  body
//!                 plaintext body, or
//!                 cipher tag (16) | IV (12) | ciphertext
//!      *    15  footer (definitions that carry one)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All integers are little-endian
//! - Bytes 0..15 are the authenticated header prefix: they feed both the
//!   header tag and the AEAD associated data
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod definitions;
pub mod footer;
pub mod frame;

pub use definitions::{
    AuthPolicy, Direction, LengthPolicy, MessageDefinition, MessageType, SequencePolicy,
    TransactionCheck,
};
pub use footer::{Footer, FooterToken};
pub use frame::{FrameCodec, FrameHeader, FrameView};

// ============================================
// Layout Constants
// ============================================

/// Offset of the sender device id.
pub const DEVICE_ID_OFFSET: usize = 0;

/// Offset of the message type byte.
pub const TYPE_OFFSET: usize = 8;

/// Offset of the 16-bit message length.
pub const LENGTH_OFFSET: usize = 9;

/// Offset of the 32-bit sequence number.
pub const SEQUENCE_OFFSET: usize = 11;

/// Offset of the authentication tag.
pub const AUTH_TAG_OFFSET: usize = 15;

/// Size of the authentication tag.
pub const AUTH_TAG_SIZE: usize = 32;

/// Authenticated header prefix (device id, type, length, sequence).
pub const HEADER_PREFIX_SIZE: usize = AUTH_TAG_OFFSET;

/// Offset of the body; also the full header size.
pub const BODY_OFFSET: usize = AUTH_TAG_OFFSET + AUTH_TAG_SIZE;

/// Full header size.
pub const HEADER_SIZE: usize = BODY_OFFSET;

/// Largest frame the 16-bit length field can describe.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Footer size.
pub const FOOTER_SIZE: usize = 15;

/// Random padding appended to padded plaintexts before sealing.
pub const PADDING_SIZE: usize = 13;

/// Width of a status hash inside a Digest-Match payload.
pub const STATUS_HASH_SIZE: usize = 32;

/// Digest-Match payload: status hash followed by max sequence (LE).
pub const DIGEST_MATCH_SIZE: usize = STATUS_HASH_SIZE + 4;

/// Width of a status-check random.
pub const CHALLENGE_SIZE: usize = 16;
