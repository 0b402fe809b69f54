// ============================================
// File: crates/bondlink-core/src/crypto/envelope.rs
// ============================================
//! # Body Envelope
//!
//! ## Creation Reason
//! Authenticated encryption of frame bodies with ChaCha20-Poly1305.
//!
//! ## Main Functionality
//! - `Envelope`: Trait for sealing/opening bodies
//! - `ChaChaEnvelope`: Production implementation
//! - `IvMaterial`: Sequence-derived nonce
//!
//! ## Envelope Layout (at body offset 47)
//! ```text
//! ┌──────────────────┬──────────────┬─────────────────────────┐
//! │ cipher tag (16)  │ IV (12)      │ ciphertext (variable)   │
//! └──────────────────┴──────────────┴─────────────────────────┘
//! AAD = header bytes 0..15 (device id, type, length, sequence)
//! ```
//!
//! ## Nonce Construction
//! ```text
//! iv (12 bytes) = sequence (4 bytes LE) || sender device id (8 bytes)
//! ```
//! Both ends share one key; the sender id keeps their nonce spaces apart
//! and the strictly increasing sequence keeps each sender's unique.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Tag verification happens before any plaintext is returned
//! - Stored IV must equal the one derived from the header sequence,
//!   otherwise the frame is refused before the cipher runs
//!
//! ## Last Modified
//! v0.1.0 - Initial envelope implementation

use std::fmt::Debug;

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Nonce, Tag,
};

use bondlink_common::DeviceId;

use super::keys::SecretKey;
use super::{CIPHER_TAG_SIZE, ENVELOPE_OVERHEAD, IV_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// IvMaterial
// ============================================

/// Sequence number and the IV derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IvMaterial {
    /// Frame sequence number.
    pub sequence: u32,
    /// Derived 12-byte IV.
    pub iv: [u8; IV_SIZE],
}

impl IvMaterial {
    /// Derives the IV for `sequence` sent by `sender`.
    #[must_use]
    pub fn derive(sequence: u32, sender: DeviceId) -> Self {
        let mut iv = [0u8; IV_SIZE];
        iv[..4].copy_from_slice(&sequence.to_le_bytes());
        iv[4..].copy_from_slice(sender.as_bytes());
        Self { sequence, iv }
    }
}

// ============================================
// Envelope Trait
// ============================================

/// Seals and opens frame bodies.
pub trait Envelope: Send + Sync + Debug {
    /// Encrypts `plaintext`, returning `tag || iv || ciphertext`.
    ///
    /// # Errors
    /// `Encryption` if the cipher refuses the input.
    fn seal(
        &self,
        key: &SecretKey,
        iv: &IvMaterial,
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    /// Verifies and decrypts `tag || iv || ciphertext`.
    ///
    /// # Errors
    /// - `Decryption`: envelope too short or IV mismatch
    /// - `Authentication`: tag does not verify
    fn open(&self, key: &SecretKey, iv: &IvMaterial, aad: &[u8], sealed: &[u8])
        -> Result<Vec<u8>>;

    /// Bytes added by `seal`.
    fn overhead(&self) -> usize {
        ENVELOPE_OVERHEAD
    }
}

// ============================================
// ChaChaEnvelope
// ============================================

/// ChaCha20-Poly1305 envelope.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChaChaEnvelope;

impl ChaChaEnvelope {
    /// Creates a new instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn cipher(key: &SecretKey) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(key.as_bytes())
            .map_err(|_| CoreError::encryption("invalid key length"))
    }
}

impl Envelope for ChaChaEnvelope {
    fn seal(
        &self,
        key: &SecretKey,
        iv: &IvMaterial,
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = Self::cipher(key)?;

        let mut out = Vec::new();
        out.try_reserve_exact(ENVELOPE_OVERHEAD + plaintext.len())
            .map_err(|_| CoreError::AllocationFailure {
                context: "envelope buffer".into(),
            })?;
        out.resize(ENVELOPE_OVERHEAD, 0);
        out.extend_from_slice(plaintext);

        let tag = cipher
            .encrypt_in_place_detached(
                Nonce::from_slice(&iv.iv),
                aad,
                &mut out[ENVELOPE_OVERHEAD..],
            )
            .map_err(|_| CoreError::encryption("ChaCha20-Poly1305 encryption failed"))?;

        out[..CIPHER_TAG_SIZE].copy_from_slice(&tag);
        out[CIPHER_TAG_SIZE..ENVELOPE_OVERHEAD].copy_from_slice(&iv.iv);
        Ok(out)
    }

    fn open(
        &self,
        key: &SecretKey,
        iv: &IvMaterial,
        aad: &[u8],
        sealed: &[u8],
    ) -> Result<Vec<u8>> {
        if sealed.len() < ENVELOPE_OVERHEAD {
            return Err(CoreError::Decryption {
                reason: "envelope shorter than tag and IV",
            });
        }
        let (tag, rest) = sealed.split_at(CIPHER_TAG_SIZE);
        let (stored_iv, ciphertext) = rest.split_at(IV_SIZE);
        if stored_iv != iv.iv {
            return Err(CoreError::Decryption {
                reason: "IV does not match sequence",
            });
        }

        let cipher = Self::cipher(key).map_err(|_| CoreError::Decryption {
            reason: "invalid key length",
        })?;
        let mut plaintext = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&iv.iv),
                aad,
                &mut plaintext,
                Tag::from_slice(tag),
            )
            .map_err(|_| CoreError::Authentication)?;
        Ok(plaintext)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key() -> SecretKey {
        SecretKey::from_bytes([0x42; 32])
    }

    const AAD: &[u8] = &[9u8; 15];

    #[test]
    fn test_seal_open() {
        let env = ChaChaEnvelope::new();
        let iv = IvMaterial::derive(1, DeviceId::from(1u64));
        let sealed = env.seal(&key(), &iv, AAD, b"hello link").unwrap();

        assert_eq!(sealed.len(), ENVELOPE_OVERHEAD + 10);
        assert_eq!(&sealed[CIPHER_TAG_SIZE..ENVELOPE_OVERHEAD], &iv.iv);
        assert_ne!(&sealed[ENVELOPE_OVERHEAD..], b"hello link");

        let opened = env.open(&key(), &iv, AAD, &sealed).unwrap();
        assert_eq!(opened, b"hello link");
    }

    #[test]
    fn test_iv_unique_per_sequence_and_sender() {
        let a = DeviceId::from(1u64);
        let b = DeviceId::from(2u64);
        assert_ne!(IvMaterial::derive(1, a).iv, IvMaterial::derive(2, a).iv);
        assert_ne!(IvMaterial::derive(1, a).iv, IvMaterial::derive(1, b).iv);
    }

    #[test]
    fn test_wrong_sequence_is_decryption_error() {
        let env = ChaChaEnvelope::new();
        let sender = DeviceId::from(1u64);
        let sealed = env
            .seal(&key(), &IvMaterial::derive(5, sender), AAD, b"x")
            .unwrap();
        let result = env.open(&key(), &IvMaterial::derive(6, sender), AAD, &sealed);
        assert!(matches!(result, Err(CoreError::Decryption { .. })));
    }

    #[test]
    fn test_short_envelope() {
        let env = ChaChaEnvelope::new();
        let iv = IvMaterial::derive(1, DeviceId::from(1u64));
        let result = env.open(&key(), &iv, AAD, &[0u8; ENVELOPE_OVERHEAD - 1]);
        assert!(matches!(result, Err(CoreError::Decryption { .. })));
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let env = ChaChaEnvelope::new();
        let iv = IvMaterial::derive(1, DeviceId::from(1u64));
        let sealed = env.seal(&key(), &iv, AAD, b"secret").unwrap();
        let other = SecretKey::from_bytes([0x43; 32]);
        assert_eq!(
            env.open(&other, &iv, AAD, &sealed),
            Err(CoreError::Authentication)
        );
    }

    proptest! {
        #[test]
        fn prop_bit_flip_in_tag_or_ciphertext_is_rejected(
            plaintext in proptest::collection::vec(any::<u8>(), 1..64),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let env = ChaChaEnvelope::new();
            let iv = IvMaterial::derive(3, DeviceId::from(1u64));
            let mut sealed = env.seal(&key(), &iv, AAD, &plaintext).unwrap();

            // Everything except the stored IV.
            let mut positions: Vec<usize> = (0..CIPHER_TAG_SIZE).collect();
            positions.extend(ENVELOPE_OVERHEAD..sealed.len());
            let pos = positions[index.index(positions.len())];
            sealed[pos] ^= 1 << bit;

            prop_assert_eq!(env.open(&key(), &iv, AAD, &sealed), Err(CoreError::Authentication));
        }

        #[test]
        fn prop_bit_flip_in_aad_is_rejected(
            index in 0usize..15,
            bit in 0u8..8,
        ) {
            let env = ChaChaEnvelope::new();
            let iv = IvMaterial::derive(3, DeviceId::from(1u64));
            let sealed = env.seal(&key(), &iv, AAD, b"payload").unwrap();
            let mut aad = AAD.to_vec();
            aad[index] ^= 1 << bit;

            prop_assert_eq!(env.open(&key(), &iv, &aad, &sealed), Err(CoreError::Authentication));
        }
    }
}
