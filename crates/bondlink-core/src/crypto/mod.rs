// ============================================
// File: crates/bondlink-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Every cryptographic primitive the link uses, behind small typed wrappers
//! built on audited RustCrypto / dalek implementations.
//!
//! ## Main Functionality
//! - [`keys`]: `EphemeralKeyPair` (X25519), `SecretKey`, `SessionKeys`
//! - [`kdf`]: HKDF-SHA256 key schedule producing the three link keys
//! - [`digest`]: header authentication tags and pairing status digests
//! - [`envelope`]: ChaCha20-Poly1305 body envelope with sequence-derived IVs
//!
//! ## Cryptographic Design
//! ```text
//!  Client                                        Server
//!    │  PairingKey (X25519 public) ───────────────► │
//!    │ ◄─────────────── PairingKeyResponse (public) │
//!    │                                              │
//!    │        X25519 ──► HKDF-SHA256 ──┬─► encryption key (AEAD)
//!    │                                 ├─► MAC key (header tag)
//!    │                                 └─► confirm key (status digest)
//!    │                                              │
//!    │  DigestMatch (hash, max seq) ──────────────► │
//!    │ ◄────────── DigestMatchResponse (hash, max)  │
//!    │  PairingConfirm (echo) ────────────────────► │
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER roll custom primitives
//! - ALL secret material implements `ZeroizeOnDrop`
//! - Tags are always compared in constant time (`subtle`)
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod digest;
pub mod envelope;
pub mod kdf;
pub mod keys;

pub use envelope::{ChaChaEnvelope, Envelope, IvMaterial};
pub use keys::{EphemeralKeyPair, SecretKey, SessionKeys};

// ============================================
// Constants
// ============================================

/// Size of an X25519 public key.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of every symmetric key.
pub const KEY_SIZE: usize = 32;

/// Size of the AEAD tag (Poly1305).
pub const CIPHER_TAG_SIZE: usize = 16;

/// Size of the envelope IV (ChaCha20-Poly1305 nonce).
pub const IV_SIZE: usize = 12;

/// Bytes the envelope adds in front of the ciphertext.
pub const ENVELOPE_OVERHEAD: usize = CIPHER_TAG_SIZE + IV_SIZE;

/// HKDF salt for the link key schedule.
pub const HKDF_SALT: &[u8] = b"bondlink-v1";
