// ============================================
// File: crates/bondlink-core/src/pairing.rs
// ============================================
//! # Pairing Engine
//!
//! ## Creation Reason
//! Establishes the link keys between two devices and confirms, in both
//! directions, that each side derived the same keys from the same
//! handshake state.
//!
//! ## Main Functionality
//! - `Role`: which side opened the handshake
//! - `PairingStatus`: the two confirmation facets
//! - `PairingState`: handshake state machine and key ownership
//! - `DigestMatchPayload`: status hash + highest observed sequence
//!
//! ## Handshake Flow
//! ```text
//! Client (A)                                     Server (B)
//!   │  PairingKey (seq 1)  [A public]               │
//!   │ ─────────────────────────────────────────────► │ generate, agree, derive
//!   │                  PairingKeyResponse (seq 2)   │
//!   │ ◄───────────────────────────────── [B public] │
//!   │ agree, derive                                  │
//!   │  DigestMatch (seq 3) [hash_A, max_A]           │
//!   │ ─────────────────────────────────────────────► │ verify hash_A
//!   │                                                │ → LOCALLY_CONFIRMED
//!   │               DigestMatchResponse (seq 4)     │
//!   │ ◄──────────────────────── [hash_B, max_B]     │
//!   │ verify hash_B → LOCALLY | REMOTELY             │
//!   │  PairingConfirm (seq 5) [hash_B]               │
//!   │ ─────────────────────────────────────────────► │ echo == hash_B
//!   │                                                │ → REMOTELY_CONFIRMED
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Any mismatch reverts to `Idle` and drops every key; never leave a
//!   half-verified key usable
//! - `encryption_key()` only answers once both facets are set
//! - The ephemeral key pair is consumed by the agreement
//!
//! ## Last Modified
//! v0.1.0 - Initial pairing engine

use bitflags::bitflags;
use tracing::{debug, info, warn};

use bondlink_common::DeviceId;

use crate::crypto::digest::{self, StatusDigestInput};
use crate::crypto::kdf::derive_session_keys;
use crate::crypto::{EphemeralKeyPair, SecretKey, SessionKeys, PUBLIC_KEY_SIZE};
use crate::error::{CoreError, Result};
use crate::protocol::{DIGEST_MATCH_SIZE, STATUS_HASH_SIZE};

// ============================================
// Role
// ============================================

/// Handshake role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends PairingKey.
    Client,
    /// Answers PairingKey.
    Server,
}

impl Role {
    /// Byte bound into status digests.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Client => 0x01,
            Self::Server => 0x02,
        }
    }

    /// The opposite role.
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            Self::Client => Self::Server,
            Self::Server => Self::Client,
        }
    }
}

// ============================================
// PairingStatus
// ============================================

bitflags! {
    /// Confirmation facets of a pairing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PairingStatus: u8 {
        /// This side validated the peer's digest.
        const LOCALLY_CONFIRMED = 0b0000_0001;
        /// The peer validated this side's digest.
        const REMOTELY_CONFIRMED = 0b0000_0010;
    }
}

impl PairingStatus {
    /// Both facets set.
    pub const MUTUAL: Self = Self::LOCALLY_CONFIRMED.union(Self::REMOTELY_CONFIRMED);

    /// Returns `true` when the key may protect payloads.
    #[must_use]
    pub const fn is_mutual(self) -> bool {
        self.contains(Self::MUTUAL)
    }
}

// ============================================
// PairingStep
// ============================================

/// Position in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStep {
    /// No handshake running.
    Idle,
    /// Client sent PairingKey.
    AwaitingKeyResponse,
    /// Server answered PairingKey.
    AwaitingDigestMatch,
    /// Client sent DigestMatch.
    AwaitingDigestResponse,
    /// Server sent DigestMatchResponse.
    AwaitingConfirm,
    /// Both facets confirmed.
    Complete,
}

impl PairingStep {
    /// Returns the step name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingKeyResponse => "awaiting_key_response",
            Self::AwaitingDigestMatch => "awaiting_digest_match",
            Self::AwaitingDigestResponse => "awaiting_digest_response",
            Self::AwaitingConfirm => "awaiting_confirm",
            Self::Complete => "complete",
        }
    }
}

// ============================================
// DigestMatchPayload
// ============================================

/// Body of DigestMatch and DigestMatchResponse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestMatchPayload {
    /// Sender's status digest.
    pub status_hash: [u8; STATUS_HASH_SIZE],
    /// Highest sequence the sender has observed.
    pub max_sequence: u32,
}

impl DigestMatchPayload {
    /// Serializes to the 36-byte wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; DIGEST_MATCH_SIZE] {
        let mut out = [0u8; DIGEST_MATCH_SIZE];
        out[..STATUS_HASH_SIZE].copy_from_slice(&self.status_hash);
        out[STATUS_HASH_SIZE..].copy_from_slice(&self.max_sequence.to_le_bytes());
        out
    }

    /// Parses the 36-byte wire form.
    ///
    /// # Errors
    /// `Length` for any other size.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != DIGEST_MATCH_SIZE {
            return Err(CoreError::length(
                bytes.len(),
                DIGEST_MATCH_SIZE,
                "digest match payload",
            ));
        }
        let mut status_hash = [0u8; STATUS_HASH_SIZE];
        status_hash.copy_from_slice(&bytes[..STATUS_HASH_SIZE]);
        let mut max = [0u8; 4];
        max.copy_from_slice(&bytes[STATUS_HASH_SIZE..]);
        Ok(Self {
            status_hash,
            max_sequence: u32::from_le_bytes(max),
        })
    }
}

// ============================================
// PairingState
// ============================================

/// Handshake state machine and owner of the link keys.
pub struct PairingState {
    role: Role,
    local_id: DeviceId,
    step: PairingStep,
    status: PairingStatus,
    keypair: Option<EphemeralKeyPair>,
    keys: Option<SessionKeys>,
    /// Digest input from this side's point of view, set once keys exist.
    local_input: Option<StatusDigestInput>,
    local_hash: Option<[u8; STATUS_HASH_SIZE]>,
    remote_hash: Option<[u8; STATUS_HASH_SIZE]>,
    sequence_floor: u32,
    consecutive_errors: u32,
}

impl PairingState {
    /// Creates an idle state.
    #[must_use]
    pub const fn new(role: Role, local_id: DeviceId) -> Self {
        Self {
            role,
            local_id,
            step: PairingStep::Idle,
            status: PairingStatus::empty(),
            keypair: None,
            keys: None,
            local_input: None,
            local_hash: None,
            remote_hash: None,
            sequence_floor: 0,
            consecutive_errors: 0,
        }
    }

    /// Local role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Confirmation facets.
    #[must_use]
    pub const fn status(&self) -> PairingStatus {
        self.status
    }

    /// Handshake position.
    #[must_use]
    pub const fn step(&self) -> PairingStep {
        self.step
    }

    /// Returns `true` once both facets are set.
    #[must_use]
    pub const fn is_mutual(&self) -> bool {
        self.status.is_mutual()
    }

    /// Sequence floor agreed by the last completed handshake.
    #[must_use]
    pub const fn sequence_floor(&self) -> u32 {
        self.sequence_floor
    }

    /// Status digest this side sent, if any.
    #[must_use]
    pub const fn local_hash(&self) -> Option<&[u8; STATUS_HASH_SIZE]> {
        self.local_hash.as_ref()
    }

    /// Status digest the peer sent, once verified.
    #[must_use]
    pub const fn remote_hash(&self) -> Option<&[u8; STATUS_HASH_SIZE]> {
        self.remote_hash.as_ref()
    }

    /// Key for keyed header tags; available from key derivation on.
    #[must_use]
    pub fn mac_key(&self) -> Option<&SecretKey> {
        self.keys.as_ref().map(|k| &k.mac)
    }

    /// Envelope key; only once mutually confirmed.
    #[must_use]
    pub fn encryption_key(&self) -> Option<&SecretKey> {
        if self.is_mutual() {
            self.keys.as_ref().map(|k| &k.encryption)
        } else {
            None
        }
    }

    // ========================================
    // Client side
    // ========================================

    /// Starts a handshake; returns the PairingKey body.
    ///
    /// # Errors
    /// `Pairing` if called on a server.
    pub fn begin(&mut self) -> Result<[u8; PUBLIC_KEY_SIZE]> {
        if self.role != Role::Client {
            return Err(CoreError::pairing("only the client opens a pairing"));
        }
        self.revert();
        let keypair = EphemeralKeyPair::generate();
        let public = keypair.public_bytes();
        self.keypair = Some(keypair);
        self.step = PairingStep::AwaitingKeyResponse;
        debug!(device_id = %self.local_id, "Pairing started");
        Ok(public)
    }

    /// Handles PairingKeyResponse; returns the DigestMatch body.
    ///
    /// # Errors
    /// `Pairing` if no handshake is pending or the key is unusable.
    pub fn on_key_response(
        &mut self,
        peer_id: DeviceId,
        server_public: &[u8; PUBLIC_KEY_SIZE],
        local_max_sequence: u32,
    ) -> Result<DigestMatchPayload> {
        self.expect(Role::Client, PairingStep::AwaitingKeyResponse)?;
        let keypair = self
            .keypair
            .take()
            .ok_or_else(|| self.fail("key pair missing"))?;
        let client_public = keypair.public_bytes();

        let shared = keypair.agree(server_public).map_err(|e| self.fail_with(e))?;
        let keys = derive_session_keys(&shared, &client_public, server_public)
            .map_err(|e| self.fail_with(e))?;

        let input = StatusDigestInput {
            role: Role::Client,
            sender: self.local_id,
            receiver: peer_id,
            sender_public: client_public,
            receiver_public: *server_public,
            max_sequence: local_max_sequence,
        };
        let hash = digest::status_digest(&keys.confirm, &input).map_err(|e| self.fail_with(e))?;

        self.keys = Some(keys);
        self.local_input = Some(input);
        self.local_hash = Some(hash);
        self.step = PairingStep::AwaitingDigestResponse;
        Ok(DigestMatchPayload {
            status_hash: hash,
            max_sequence: local_max_sequence,
        })
    }

    /// Handles DigestMatchResponse; returns the PairingConfirm body.
    ///
    /// # Errors
    /// `Pairing` on digest mismatch (state reverts).
    pub fn on_digest_response(
        &mut self,
        payload: &DigestMatchPayload,
    ) -> Result<[u8; STATUS_HASH_SIZE]> {
        self.expect(Role::Client, PairingStep::AwaitingDigestResponse)?;
        self.verify_remote(payload)?;
        self.status = PairingStatus::MUTUAL;
        self.step = PairingStep::Complete;
        self.consecutive_errors = 0;
        info!(
            device_id = %self.local_id,
            floor = self.sequence_floor,
            "Pairing confirmed"
        );
        Ok(payload.status_hash)
    }

    // ========================================
    // Server side
    // ========================================

    /// Handles PairingKey; returns the PairingKeyResponse body.
    ///
    /// A new PairingKey always restarts the handshake.
    ///
    /// # Errors
    /// `Pairing` if called on a client or the key is unusable.
    pub fn on_pairing_key(
        &mut self,
        peer_id: DeviceId,
        client_public: &[u8; PUBLIC_KEY_SIZE],
    ) -> Result<[u8; PUBLIC_KEY_SIZE]> {
        if self.role != Role::Server {
            return Err(CoreError::pairing("client received a pairing key"));
        }
        self.revert();

        let keypair = EphemeralKeyPair::generate();
        let server_public = keypair.public_bytes();
        let shared = keypair.agree(client_public).map_err(|e| self.fail_with(e))?;
        let keys = derive_session_keys(&shared, client_public, &server_public)
            .map_err(|e| self.fail_with(e))?;

        self.keys = Some(keys);
        self.local_input = Some(StatusDigestInput {
            role: Role::Server,
            sender: self.local_id,
            receiver: peer_id,
            sender_public: server_public,
            receiver_public: *client_public,
            max_sequence: 0,
        });
        self.step = PairingStep::AwaitingDigestMatch;
        debug!(device_id = %self.local_id, peer = %peer_id, "Pairing key answered");
        Ok(server_public)
    }

    /// Handles DigestMatch; returns the DigestMatchResponse body.
    ///
    /// # Errors
    /// `Pairing` on digest mismatch (state reverts).
    pub fn on_digest_match(
        &mut self,
        payload: &DigestMatchPayload,
        local_max_sequence: u32,
    ) -> Result<DigestMatchPayload> {
        self.expect(Role::Server, PairingStep::AwaitingDigestMatch)?;
        self.verify_remote(payload)?;

        let (keys, input) = match (&self.keys, &mut self.local_input) {
            (Some(keys), Some(input)) => (keys, input),
            _ => return Err(self.fail("keys missing")),
        };
        input.max_sequence = local_max_sequence;
        let hash = digest::status_digest(&keys.confirm, input)?;
        self.sequence_floor = self.sequence_floor.max(local_max_sequence);

        self.local_hash = Some(hash);
        self.status = PairingStatus::LOCALLY_CONFIRMED;
        self.step = PairingStep::AwaitingConfirm;
        Ok(DigestMatchPayload {
            status_hash: hash,
            max_sequence: local_max_sequence,
        })
    }

    /// Handles PairingConfirm.
    ///
    /// # Errors
    /// `Pairing` if the echo differs from the digest this side sent.
    pub fn on_confirm(&mut self, echo: &[u8]) -> Result<()> {
        self.expect(Role::Server, PairingStep::AwaitingConfirm)?;
        let matches = self
            .local_hash
            .as_ref()
            .is_some_and(|hash| digest::digests_match(hash, echo));
        if !matches {
            return Err(self.fail("confirmation does not echo our digest"));
        }
        self.status |= PairingStatus::REMOTELY_CONFIRMED;
        self.step = PairingStep::Complete;
        self.consecutive_errors = 0;
        info!(
            device_id = %self.local_id,
            floor = self.sequence_floor,
            "Pairing confirmed"
        );
        Ok(())
    }

    // ========================================
    // Failure handling
    // ========================================

    /// Drops keys and confirmation; back to `Idle`.
    pub fn revert(&mut self) {
        if self.step != PairingStep::Idle || !self.status.is_empty() {
            debug!(device_id = %self.local_id, step = self.step.name(), "Pairing reverted");
        }
        self.step = PairingStep::Idle;
        self.status = PairingStatus::empty();
        self.keypair = None;
        self.keys = None;
        self.local_input = None;
        self.local_hash = None;
        self.remote_hash = None;
    }

    /// Counts a pairing failure; reverts and returns `true` once
    /// `threshold` consecutive failures are reached.
    pub fn record_error(&mut self, threshold: u32) -> bool {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        if self.consecutive_errors >= threshold {
            warn!(
                device_id = %self.local_id,
                errors = self.consecutive_errors,
                "Pairing error threshold reached"
            );
            self.consecutive_errors = 0;
            self.revert();
            true
        } else {
            false
        }
    }

    /// Consecutive failures counted so far.
    #[must_use]
    pub const fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    fn expect(&self, role: Role, step: PairingStep) -> Result<()> {
        if self.role == role && self.step == step {
            Ok(())
        } else {
            Err(CoreError::pairing(format!(
                "unexpected handshake message in step {}",
                self.step.name()
            )))
        }
    }

    fn verify_remote(&mut self, payload: &DigestMatchPayload) -> Result<()> {
        let expected = match (&self.keys, &self.local_input) {
            (Some(keys), Some(input)) => {
                digest::status_digest(&keys.confirm, &input.mirrored(payload.max_sequence))?
            }
            _ => return Err(self.fail("keys missing")),
        };
        if !digest::digests_match(&expected, &payload.status_hash) {
            warn!(device_id = %self.local_id, "Status digest mismatch");
            return Err(self.fail("status digest mismatch"));
        }
        self.remote_hash = Some(payload.status_hash);
        let local_max = self.local_input.map_or(0, |i| i.max_sequence);
        self.sequence_floor = self
            .sequence_floor
            .max(local_max)
            .max(payload.max_sequence);
        Ok(())
    }

    fn fail(&mut self, reason: &str) -> CoreError {
        self.revert();
        CoreError::pairing(reason)
    }

    fn fail_with(&mut self, error: CoreError) -> CoreError {
        self.revert();
        error
    }
}

impl std::fmt::Debug for PairingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingState")
            .field("role", &self.role)
            .field("step", &self.step)
            .field("status", &self.status)
            .field("sequence_floor", &self.sequence_floor)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    const A: u64 = 0x1;
    const B: u64 = 0x2;

    fn pair(client_max: u32, server_max: u32) -> (PairingState, PairingState) {
        let mut a = PairingState::new(Role::Client, DeviceId::from(A));
        let mut b = PairingState::new(Role::Server, DeviceId::from(B));

        let a_pub = a.begin().unwrap();
        let b_pub = b.on_pairing_key(DeviceId::from(A), &a_pub).unwrap();
        let dm = a
            .on_key_response(DeviceId::from(B), &b_pub, client_max)
            .unwrap();
        let dmr = b.on_digest_match(&dm, server_max).unwrap();
        let echo = a.on_digest_response(&dmr).unwrap();
        b.on_confirm(&echo).unwrap();
        (a, b)
    }

    #[test]
    fn test_full_handshake() {
        let (a, b) = pair(0, 0);
        assert!(a.is_mutual());
        assert!(b.is_mutual());
        assert_eq!(a.step(), PairingStep::Complete);
        assert_eq!(a.encryption_key(), b.encryption_key());
        assert!(a.encryption_key().is_some());
        assert_eq!(a.mac_key(), b.mac_key());
        assert_eq!(a.remote_hash(), b.local_hash());
        assert_eq!(b.remote_hash(), a.local_hash());
    }

    #[test]
    fn test_floor_is_max_of_both_sides() {
        let (a, b) = pair(7, 42);
        assert_eq!(a.sequence_floor(), 42);
        assert_eq!(b.sequence_floor(), 42);
    }

    #[test]
    fn test_server_confirmation_is_staged() {
        let mut a = PairingState::new(Role::Client, DeviceId::from(A));
        let mut b = PairingState::new(Role::Server, DeviceId::from(B));
        let a_pub = a.begin().unwrap();
        let b_pub = b.on_pairing_key(DeviceId::from(A), &a_pub).unwrap();
        let dm = a.on_key_response(DeviceId::from(B), &b_pub, 0).unwrap();

        assert!(b.mac_key().is_some());
        assert!(b.encryption_key().is_none());

        b.on_digest_match(&dm, 0).unwrap();
        assert_eq!(b.status(), PairingStatus::LOCALLY_CONFIRMED);
        assert!(b.encryption_key().is_none());
    }

    #[test]
    fn test_digest_mismatch_reverts() {
        let mut a = PairingState::new(Role::Client, DeviceId::from(A));
        let mut b = PairingState::new(Role::Server, DeviceId::from(B));
        let a_pub = a.begin().unwrap();
        let b_pub = b.on_pairing_key(DeviceId::from(A), &a_pub).unwrap();
        let mut dm = a.on_key_response(DeviceId::from(B), &b_pub, 0).unwrap();

        // Claimed max sequence no longer matches the digest.
        dm.max_sequence = 99;
        let err = b.on_digest_match(&dm, 0).unwrap_err();
        assert!(matches!(err, CoreError::Pairing { .. }));
        assert_eq!(b.status(), PairingStatus::empty());
        assert_eq!(b.step(), PairingStep::Idle);
        assert!(b.mac_key().is_none());
    }

    #[test]
    fn test_wrong_echo_rejected() {
        let mut a = PairingState::new(Role::Client, DeviceId::from(A));
        let mut b = PairingState::new(Role::Server, DeviceId::from(B));
        let a_pub = a.begin().unwrap();
        let b_pub = b.on_pairing_key(DeviceId::from(A), &a_pub).unwrap();
        let dm = a.on_key_response(DeviceId::from(B), &b_pub, 0).unwrap();
        b.on_digest_match(&dm, 0).unwrap();

        assert!(b.on_confirm(&[0u8; STATUS_HASH_SIZE]).is_err());
        assert!(!b.is_mutual());
    }

    #[test]
    fn test_out_of_order_message() {
        let mut a = PairingState::new(Role::Client, DeviceId::from(A));
        let payload = DigestMatchPayload {
            status_hash: [0; STATUS_HASH_SIZE],
            max_sequence: 0,
        };
        assert!(matches!(
            a.on_digest_response(&payload),
            Err(CoreError::Pairing { .. })
        ));
        let mut b = PairingState::new(Role::Server, DeviceId::from(B));
        assert!(b.begin().is_err());
    }

    #[test]
    fn test_error_threshold() {
        let (_, mut b) = pair(0, 0);
        assert!(!b.record_error(3));
        assert!(!b.record_error(3));
        assert!(b.is_mutual());
        assert!(b.record_error(3));
        assert!(!b.is_mutual());
        assert!(b.encryption_key().is_none());
    }

    #[test]
    fn test_payload_codec() {
        let payload = DigestMatchPayload {
            status_hash: [3; STATUS_HASH_SIZE],
            max_sequence: 0x0102_0304,
        };
        let bytes = payload.encode();
        assert_eq!(&bytes[32..], &[4, 3, 2, 1]);
        assert_eq!(DigestMatchPayload::decode(&bytes).unwrap(), payload);
        assert!(DigestMatchPayload::decode(&bytes[..35]).is_err());
    }
}
