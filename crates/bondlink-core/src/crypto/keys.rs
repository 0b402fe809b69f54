// ============================================
// File: crates/bondlink-core/src/crypto/keys.rs
// ============================================
//! # Key Types
//!
//! ## Creation Reason
//! Typed containers for the pairing key material with zeroization and
//! redacted `Debug` output.
//!
//! ## Main Functionality
//! - `EphemeralKeyPair`: single-use X25519 pair for one pairing attempt
//! - `SecretKey`: 32-byte symmetric key
//! - `SessionKeys`: encryption, MAC and confirmation keys of a link
//!
//! ## ⚠️ Important Note for Next Developer
//! - `EphemeralKeyPair::agree` consumes the pair; the secret half can
//!   never be used twice
//! - Only `fingerprint()` may appear in logs
//!
//! ## Last Modified
//! v0.1.0 - Initial key types

use std::fmt;

use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{KEY_SIZE, PUBLIC_KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// EphemeralKeyPair
// ============================================

/// Ephemeral X25519 key pair.
///
/// # Example
/// ```
/// use bondlink_core::crypto::EphemeralKeyPair;
///
/// let alice = EphemeralKeyPair::generate();
/// let bob = EphemeralKeyPair::generate();
/// let (alice_public, bob_public) = (alice.public_bytes(), bob.public_bytes());
///
/// let a = alice.agree(&bob_public).unwrap();
/// let b = bob.agree(&alice_public).unwrap();
/// assert_eq!(a.as_bytes(), b.as_bytes());
/// ```
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generates a fresh key pair from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Returns the public key bytes.
    #[must_use]
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Runs X25519 against the peer's public key, consuming the pair.
    ///
    /// # Errors
    /// `Pairing` if the peer key is a low-order point (the agreement would
    /// not depend on our secret).
    pub fn agree(self, peer_public: &[u8; PUBLIC_KEY_SIZE]) -> Result<SecretKey> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer_public));
        if !shared.was_contributory() {
            return Err(CoreError::pairing("peer public key is not contributory"));
        }
        Ok(SecretKey::from_bytes(*shared.as_bytes()))
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &hex::encode(&self.public.as_bytes()[..4]))
            .finish_non_exhaustive()
    }
}

// ============================================
// SecretKey
// ============================================

/// 32-byte symmetric key, zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    ///
    /// # Security Warning
    /// Do not log or persist the returned bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Short, non-reversible identifier for logs.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(self.0);
        hex::encode(&hash[..4])
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SecretKey {}

// ============================================
// SessionKeys
// ============================================

/// The three keys derived from one pairing.
///
/// | Key | Used for |
/// |-----|----------|
/// | `encryption` | ChaCha20-Poly1305 body envelope |
/// | `mac` | HMAC-SHA256 header tags of keyed types |
/// | `confirm` | Digest-Match status digests |
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    /// AEAD key.
    pub encryption: SecretKey,
    /// Header tag key.
    pub mac: SecretKey,
    /// Status digest key.
    pub confirm: SecretKey,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("fingerprint", &self.encryption.fingerprint())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement_matches() {
        let a = EphemeralKeyPair::generate();
        let b = EphemeralKeyPair::generate();
        let (pa, pb) = (a.public_bytes(), b.public_bytes());
        assert_ne!(pa, pb);

        let ka = a.agree(&pb).unwrap();
        let kb = b.agree(&pa).unwrap();
        assert_eq!(ka, kb);
        assert_eq!(ka.fingerprint(), kb.fingerprint());
    }

    #[test]
    fn test_low_order_point_rejected() {
        let a = EphemeralKeyPair::generate();
        let result = a.agree(&[0u8; PUBLIC_KEY_SIZE]);
        assert!(matches!(result, Err(CoreError::Pairing { .. })));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SecretKey::from_bytes([0xAB; KEY_SIZE]);
        let debug = format!("{key:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ab"));
    }
}
