// ============================================
// File: crates/bondlink-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation
//!
//! ## Main Functionality
//! - `derive_session_keys`: X25519 output → three link keys via HKDF-SHA256
//!
//! ## Derivation
//! ```text
//! prk  = HKDF-Extract(salt = "bondlink-v1", ikm = shared secret)
//! key  = HKDF-Expand(prk, info = label || client_public || server_public, 32)
//! ```
//! Labels give each key its own domain; the public keys bind the keys to
//! the two ends of this particular pairing.
//!
//! ## Last Modified
//! v0.1.0 - Initial key schedule

use hkdf::Hkdf;
use sha2::Sha256;
use tracing::trace;
use zeroize::Zeroize;

use super::keys::{SecretKey, SessionKeys};
use super::{HKDF_SALT, KEY_SIZE, PUBLIC_KEY_SIZE};
use crate::error::{CoreError, Result};

const LABEL_ENCRYPTION: &[u8] = b"bondlink-encryption";
const LABEL_MAC: &[u8] = b"bondlink-frame-mac";
const LABEL_CONFIRM: &[u8] = b"bondlink-confirm";

/// Derives the link keys from a shared secret.
///
/// # Arguments
/// * `shared` - X25519 agreement output
/// * `client_public` - Public key of the side that sent PairingKey
/// * `server_public` - Public key of the side that answered
///
/// # Errors
/// `Pairing` if HKDF refuses the output length (not reachable with 32 bytes).
pub fn derive_session_keys(
    shared: &SecretKey,
    client_public: &[u8; PUBLIC_KEY_SIZE],
    server_public: &[u8; PUBLIC_KEY_SIZE],
) -> Result<SessionKeys> {
    let hkdf = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared.as_bytes());

    let expand = |label: &[u8]| -> Result<SecretKey> {
        let mut info = Vec::with_capacity(label.len() + PUBLIC_KEY_SIZE * 2);
        info.extend_from_slice(label);
        info.extend_from_slice(client_public);
        info.extend_from_slice(server_public);

        let mut okm = [0u8; KEY_SIZE];
        hkdf.expand(&info, &mut okm)
            .map_err(|_| CoreError::pairing("key derivation failed"))?;
        let key = SecretKey::from_bytes(okm);
        okm.zeroize();
        Ok(key)
    };

    let keys = SessionKeys {
        encryption: expand(LABEL_ENCRYPTION)?,
        mac: expand(LABEL_MAC)?,
        confirm: expand(LABEL_CONFIRM)?,
    };
    trace!(fingerprint = %keys.encryption.fingerprint(), "Derived link keys");
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct_and_deterministic() {
        let shared = SecretKey::from_bytes([7u8; KEY_SIZE]);
        let a = derive_session_keys(&shared, &[1; 32], &[2; 32]).unwrap();
        let b = derive_session_keys(&shared, &[1; 32], &[2; 32]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.encryption, a.mac);
        assert_ne!(a.mac, a.confirm);
    }

    #[test]
    fn test_keys_bound_to_public_keys() {
        let shared = SecretKey::from_bytes([7u8; KEY_SIZE]);
        let a = derive_session_keys(&shared, &[1; 32], &[2; 32]).unwrap();
        let swapped = derive_session_keys(&shared, &[2; 32], &[1; 32]).unwrap();
        assert_ne!(a.encryption, swapped.encryption);
    }
}
