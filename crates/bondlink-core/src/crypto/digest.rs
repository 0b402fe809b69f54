// ============================================
// File: crates/bondlink-core/src/crypto/digest.rs
// ============================================
//! # Digests and Tags
//!
//! ## Creation Reason
//! The 32-byte values the protocol carries in the clear: the header
//! authentication tag of every frame and the status hash of the
//! Digest-Match payload.
//!
//! ## Header Tag
//! ```text
//! unkeyed types: SHA-256(header[0..15] || frame[47..])
//! keyed types:   HMAC-SHA256(mac_key, header[0..15] || frame[47..])
//! ```
//!
//! ## Status Digest
//! ```text
//! HMAC-SHA256(confirm_key, "bondlink-status" || role || sender id ||
//!             receiver id || sender public || receiver public || max seq)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Use `verify_header_tag` / `digests_match`, never `==`, on tags
//!
//! ## Last Modified
//! v0.1.0 - Initial digest helpers

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use bondlink_common::DeviceId;

use super::keys::SecretKey;
use super::PUBLIC_KEY_SIZE;
use crate::error::{CoreError, Result};
use crate::pairing::Role;
use crate::protocol::{AUTH_TAG_SIZE, STATUS_HASH_SIZE};

type HmacSha256 = Hmac<Sha256>;

const STATUS_LABEL: &[u8] = b"bondlink-status";

fn hmac(key: &SecretKey, parts: &[&[u8]]) -> Result<[u8; 32]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|_| CoreError::pairing("invalid MAC key length"))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

// ============================================
// Header Tag
// ============================================

/// Computes the header authentication tag.
///
/// # Arguments
/// * `mac_key` - MAC key for keyed types, `None` for plain SHA-256
/// * `prefix` - Header bytes 0..15
/// * `rest` - Everything after the tag (body and footer)
///
/// # Errors
/// Only if the HMAC key is rejected, which cannot happen for 32-byte keys.
pub fn header_tag(
    mac_key: Option<&SecretKey>,
    prefix: &[u8],
    rest: &[u8],
) -> Result<[u8; AUTH_TAG_SIZE]> {
    match mac_key {
        Some(key) => hmac(key, &[prefix, rest]),
        None => {
            let mut hasher = Sha256::new();
            hasher.update(prefix);
            hasher.update(rest);
            let mut out = [0u8; AUTH_TAG_SIZE];
            out.copy_from_slice(&hasher.finalize());
            Ok(out)
        }
    }
}

/// Verifies a received header tag in constant time.
///
/// # Errors
/// `Authentication` on mismatch.
pub fn verify_header_tag(
    mac_key: Option<&SecretKey>,
    prefix: &[u8],
    rest: &[u8],
    received: &[u8],
) -> Result<()> {
    let expected = header_tag(mac_key, prefix, rest)?;
    if digests_match(&expected, received) {
        Ok(())
    } else {
        Err(CoreError::Authentication)
    }
}

/// Constant-time equality of two digests.
#[must_use]
pub fn digests_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

// ============================================
// Status Digest
// ============================================

/// Inputs bound into a status digest, from the point of view of the side
/// that sends the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDigestInput {
    /// Role of the sender.
    pub role: Role,
    /// Sender device id.
    pub sender: DeviceId,
    /// Receiver device id.
    pub receiver: DeviceId,
    /// Sender ephemeral public key.
    pub sender_public: [u8; PUBLIC_KEY_SIZE],
    /// Receiver ephemeral public key.
    pub receiver_public: [u8; PUBLIC_KEY_SIZE],
    /// Highest sequence number the sender has observed.
    pub max_sequence: u32,
}

impl StatusDigestInput {
    /// The same input as seen from the other end, carrying the other
    /// side's claimed maximum sequence.
    #[must_use]
    pub const fn mirrored(&self, peer_max_sequence: u32) -> Self {
        Self {
            role: self.role.peer(),
            sender: self.receiver,
            receiver: self.sender,
            sender_public: self.receiver_public,
            receiver_public: self.sender_public,
            max_sequence: peer_max_sequence,
        }
    }
}

/// Computes a status digest.
///
/// # Errors
/// Only if the HMAC key is rejected.
pub fn status_digest(
    confirm_key: &SecretKey,
    input: &StatusDigestInput,
) -> Result<[u8; STATUS_HASH_SIZE]> {
    hmac(
        confirm_key,
        &[
            STATUS_LABEL,
            &[input.role.as_byte()],
            input.sender.as_bytes(),
            input.receiver.as_bytes(),
            &input.sender_public,
            &input.receiver_public,
            &input.max_sequence.to_le_bytes(),
        ],
    )
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SecretKey {
        SecretKey::from_bytes([byte; 32])
    }

    #[test]
    fn test_unkeyed_tag_is_sha256() {
        let tag = header_tag(None, b"abc", b"").unwrap();
        assert_eq!(
            hex::encode(tag),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_keyed_tag_depends_on_key() {
        let a = header_tag(Some(&key(1)), b"prefix", b"body").unwrap();
        let b = header_tag(Some(&key(2)), b"prefix", b"body").unwrap();
        assert_ne!(a, b);
        assert!(verify_header_tag(Some(&key(1)), b"prefix", b"body", &a).is_ok());
        assert_eq!(
            verify_header_tag(Some(&key(2)), b"prefix", b"body", &a),
            Err(CoreError::Authentication)
        );
    }

    #[test]
    fn test_status_digest_mirroring() {
        let input = StatusDigestInput {
            role: Role::Client,
            sender: DeviceId::from(1u64),
            receiver: DeviceId::from(2u64),
            sender_public: [1; 32],
            receiver_public: [2; 32],
            max_sequence: 0,
        };
        let mirrored = input.mirrored(9);
        assert_eq!(mirrored.role, Role::Server);
        assert_eq!(mirrored.sender, DeviceId::from(2u64));
        assert_eq!(mirrored.mirrored(0), input);

        let k = key(3);
        assert_ne!(
            status_digest(&k, &input).unwrap(),
            status_digest(&k, &mirrored).unwrap()
        );
        let bumped = StatusDigestInput {
            max_sequence: 1,
            ..input
        };
        assert_ne!(
            status_digest(&k, &input).unwrap(),
            status_digest(&k, &bumped).unwrap()
        );
    }

    #[test]
    fn test_digests_match_length() {
        assert!(digests_match(&[1, 2], &[1, 2]));
        assert!(!digests_match(&[1, 2], &[1, 2, 3]));
        assert!(!digests_match(&[1, 2], &[1, 3]));
    }
}
