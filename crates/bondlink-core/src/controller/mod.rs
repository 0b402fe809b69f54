// ============================================
// File: crates/bondlink-core/src/controller/mod.rs
// ============================================
//! # Link Controller
//!
//! ## Creation Reason
//! Single state object per peer link. Every inbound frame passes through
//! `accept`, every outbound frame through `prepare` / `commit_sent`, so
//! sequence numbers, adjacency history, pairing and transaction state
//! always move together.
//!
//! ## Main Functionality
//! - `LinkController`: validation chain, frame building, state commit
//! - `ControllerConfig`: immutable per-link settings
//! - `Accepted` / `Reply`: result of an accepted frame and the protocol
//!   answer it requires
//! - `PreparedFrame`: outbound frame waiting for the transport
//!
//! ## Inbound Check Order
//! ```text
//! address → length → device id → type → length policy → sequence
//!   → adjacency → transaction → status-check gate → pairing gate
//!   → header tag → envelope → payload semantics → commit
//! ```
//! The first failure short-circuits. Nothing is committed before the
//! whole chain has passed.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `prepare` must not mutate; call `commit_sent` only after the
//!   transport accepted the bytes
//! - Callers serialize access (one lock per link)
//! - Authentication and decryption failures revert the pairing
//! - Only frames tagged under the link MAC key may move the receive
//!   floor or drop the pairing from the peer side
//!
//! ## Last Modified
//! v0.1.0 - Initial controller

mod history;
mod transaction;

pub use history::{HistoryEntry, LinkHistory};
pub use transaction::{TransactionState, TransactionStatus};

use std::time::{Duration, Instant};

use bitflags::bitflags;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use zeroize::Zeroize;

use bondlink_common::{DeviceId, LinkAddress, SequenceNumber};

use crate::crypto::{ChaChaEnvelope, Envelope, IvMaterial, SecretKey, PUBLIC_KEY_SIZE};
use crate::error::{CoreError, FailureKind, Result};
use crate::pairing::{DigestMatchPayload, PairingState, PairingStatus, PairingStep, Role};
use crate::protocol::{
    AuthPolicy, Direction, Footer, FrameCodec, FrameView, MessageDefinition, MessageType,
    SequencePolicy, MAX_FRAME_SIZE, PADDING_SIZE,
};
use crate::status_check::StatusCheckState;

// ============================================
// Configuration
// ============================================

/// Operating mode of the local device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Not configured; a controller refuses to start.
    #[default]
    Uninitialized,
    /// Answers pairing.
    Server,
    /// Opens pairing.
    Client,
}

impl OperatingMode {
    /// Pairing role for this mode.
    #[must_use]
    pub const fn role(self) -> Option<Role> {
        match self {
            Self::Uninitialized => None,
            Self::Server => Some(Role::Server),
            Self::Client => Some(Role::Client),
        }
    }
}

bitflags! {
    /// Optional protocol features.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FeatureFlags: u8 {
        /// Pairing-required types need a mutual pairing.
        const PAIRING_REQUIRED = 0b0000_0001;
        /// Status checks may be sent and answered.
        const STATUS_CHECK = 0b0000_0010;
    }
}

/// Immutable settings of one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Local operating mode.
    pub mode: OperatingMode,
    /// Application identifier.
    pub app_id: u32,
    /// Local device id, written into every outbound header.
    pub device_id: DeviceId,
    /// Pre-bound peer, if known in advance.
    pub peer_device_id: Option<DeviceId>,
    /// Enabled features.
    pub features: FeatureFlags,
    /// Largest frame accepted or built.
    pub max_message_size: usize,
    /// Transaction inactivity budget.
    pub transaction_timeout: Duration,
    /// Status-check response budget.
    pub status_check_timeout: Duration,
    /// Consecutive pairing errors before the pairing is dropped.
    pub pairing_error_threshold: u32,
}

impl ControllerConfig {
    /// Settings with defaults for everything but mode and identity.
    #[must_use]
    pub const fn new(mode: OperatingMode, device_id: DeviceId) -> Self {
        Self {
            mode,
            app_id: 0,
            device_id,
            peer_device_id: None,
            features: FeatureFlags::all(),
            max_message_size: 512,
            transaction_timeout: Duration::from_secs(5),
            status_check_timeout: Duration::from_secs(2),
            pairing_error_threshold: 3,
        }
    }
}

// ============================================
// Results
// ============================================

/// Protocol answer the controller wants sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Answer type.
    pub message_type: MessageType,
    /// Answer payload.
    pub payload: Vec<u8>,
}

impl Reply {
    fn new(message_type: MessageType, payload: &[u8]) -> Self {
        Self {
            message_type,
            payload: payload.to_vec(),
        }
    }
}

/// A frame that passed the whole chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    /// Sender.
    pub device_id: DeviceId,
    /// Link address the frame came from.
    pub address: Option<LinkAddress>,
    /// Frame type.
    pub message_type: MessageType,
    /// Frame sequence.
    pub sequence: u32,
    /// Application payload (decrypted, padding and footer removed).
    pub payload: Vec<u8>,
    /// Footer, for types that carry one.
    pub footer: Option<Footer>,
    /// Protocol answer to send.
    pub reply: Option<Reply>,
    /// The frame completed this side's pairing.
    pub pairing_confirmed: bool,
}

/// Outbound frame, built but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFrame {
    /// Frame type.
    pub message_type: MessageType,
    /// Sequence number used.
    pub sequence: u32,
    /// Wire bytes.
    pub bytes: Vec<u8>,
}

// ============================================
// LinkController
// ============================================

/// Protocol state of one peer link.
pub struct LinkController {
    config: ControllerConfig,
    envelope: Box<dyn Envelope>,
    remote_device: Option<DeviceId>,
    remote_address: Option<LinkAddress>,
    ticket: Option<Vec<u8>>,
    history: LinkHistory,
    transaction: TransactionState,
    pairing: PairingState,
    status_check: StatusCheckState,
    /// Highest free-running sequence accepted.
    rx_floor: u32,
    /// Last free-running sequence sent.
    tx_sequence: u32,
}

impl LinkController {
    /// Creates a controller with the ChaCha20-Poly1305 envelope.
    ///
    /// # Errors
    /// `Handling` if the operating mode is uninitialized.
    pub fn new(config: ControllerConfig) -> Result<Self> {
        Self::with_envelope(config, Box::new(ChaChaEnvelope::new()))
    }

    /// Creates a controller with a custom envelope.
    ///
    /// # Errors
    /// `Handling` if the operating mode is uninitialized.
    pub fn with_envelope(config: ControllerConfig, envelope: Box<dyn Envelope>) -> Result<Self> {
        let role = config.mode.role().ok_or_else(|| CoreError::Handling {
            reason: "operating mode is uninitialized".into(),
        })?;
        Ok(Self {
            remote_device: config.peer_device_id,
            remote_address: None,
            ticket: None,
            history: LinkHistory::new(),
            transaction: TransactionState::new(config.transaction_timeout),
            pairing: PairingState::new(role, config.device_id),
            status_check: StatusCheckState::new(config.status_check_timeout),
            rx_floor: 0,
            tx_sequence: 0,
            envelope,
            config,
        })
    }

    // ========================================
    // Accessors
    // ========================================

    /// Link settings.
    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Bound peer.
    #[must_use]
    pub const fn remote_device(&self) -> Option<DeviceId> {
        self.remote_device
    }

    /// Bound peer link address.
    #[must_use]
    pub const fn remote_address(&self) -> Option<LinkAddress> {
        self.remote_address
    }

    /// Last authentication ticket received.
    #[must_use]
    pub fn ticket(&self) -> Option<&[u8]> {
        self.ticket.as_deref()
    }

    /// Frame history.
    #[must_use]
    pub const fn history(&self) -> &LinkHistory {
        &self.history
    }

    /// Pairing facets.
    #[must_use]
    pub const fn pairing_status(&self) -> PairingStatus {
        self.pairing.status()
    }

    /// Pairing state machine.
    #[must_use]
    pub const fn pairing(&self) -> &PairingState {
        &self.pairing
    }

    /// Transaction status.
    #[must_use]
    pub const fn transaction_status(&self) -> TransactionStatus {
        self.transaction.status()
    }

    /// Highest free-running sequence accepted.
    #[must_use]
    pub const fn rx_floor(&self) -> u32 {
        self.rx_floor
    }

    /// Last free-running sequence sent.
    #[must_use]
    pub const fn tx_sequence(&self) -> u32 {
        self.tx_sequence
    }

    // ========================================
    // Inbound
    // ========================================

    /// Runs the full validation chain on an inbound frame and commits it.
    ///
    /// On failure nothing is committed, except that authentication and
    /// decryption failures revert the pairing and pairing failures count
    /// towards the revert threshold.
    ///
    /// # Errors
    /// The first check that failed.
    pub fn accept(
        &mut self,
        bytes: &[u8],
        source: Option<LinkAddress>,
        now: Instant,
    ) -> Result<Accepted> {
        match self.validate(bytes, source, now) {
            Ok(accepted) => {
                trace!(
                    device_id = %accepted.device_id,
                    message_type = %accepted.message_type,
                    seq = accepted.sequence,
                    "Frame accepted"
                );
                Ok(accepted)
            }
            Err(e) => {
                self.on_failure(&e);
                Err(e)
            }
        }
    }

    fn validate(
        &mut self,
        bytes: &[u8],
        source: Option<LinkAddress>,
        now: Instant,
    ) -> Result<Accepted> {
        if let (Some(known), Some(got)) = (self.remote_address, source) {
            if known != got {
                return Err(CoreError::Address {
                    got: got.to_string(),
                });
            }
        }

        let view = FrameView::parse(bytes, self.max_message_size())?;
        let device_id = view.device_id();
        self.check_device(device_id, view.type_byte())?;

        let message_type = view.message_type()?;
        let definition = message_type.definition();
        definition.check_total(view.len(), self.max_message_size())?;

        let sequence = view.sequence();
        self.check_sequence(definition, sequence)?;
        self.check_adjacency(definition, Direction::Receive)?;
        self.transaction.check(definition)?;
        self.check_features(definition)?;

        let keyed = self.verify_tag(&view, definition)?;

        let (body, footer) = view.split_body(definition)?;
        let payload = if definition.encryption_required {
            let key = self
                .pairing
                .encryption_key()
                .ok_or_else(|| CoreError::pairing("no link key"))?;
            let iv = IvMaterial::derive(sequence, device_id);
            let mut plaintext = self.envelope.open(key, &iv, view.prefix(), body)?;
            if definition.padded {
                let len = plaintext
                    .len()
                    .checked_sub(PADDING_SIZE)
                    .ok_or(CoreError::Decryption {
                        reason: "padding missing",
                    })?;
                plaintext.truncate(len);
            }
            plaintext
        } else {
            body.to_vec()
        };
        definition.check_payload(payload.len())?;

        let (reply, pairing_confirmed) =
            self.handle_payload(message_type, device_id, &payload, keyed)?;

        // Commit.
        self.history.record_received(HistoryEntry {
            address: source,
            at: now,
            device_id,
            sequence,
            message_type,
        });
        if definition.sequence == SequencePolicy::FreeRunning && keyed {
            self.rx_floor = sequence;
        }
        self.transaction.apply(message_type, device_id, source, now);
        if self.remote_device.is_none() {
            info!(peer = %device_id, "Peer device bound");
            self.remote_device = Some(device_id);
        }
        if self.remote_address.is_none() {
            self.remote_address = source;
        }
        if pairing_confirmed {
            self.apply_sequence_floor();
        }

        Ok(Accepted {
            device_id,
            address: source,
            message_type,
            sequence,
            payload,
            footer,
            reply,
            pairing_confirmed,
        })
    }

    fn check_device(&self, got: DeviceId, type_byte: u8) -> Result<()> {
        if got == self.config.device_id {
            return Err(CoreError::DeviceId {
                expected: self.remote_device,
                got,
            });
        }
        match self.remote_device {
            Some(bound) if bound != got => Err(CoreError::DeviceId {
                expected: Some(bound),
                got,
            }),
            Some(_) => Ok(()),
            None => {
                let opens_pairing = type_byte == MessageType::PairingKey.as_byte()
                    || type_byte == MessageType::PairingKeyResponse.as_byte();
                if opens_pairing {
                    Ok(())
                } else {
                    Err(CoreError::DeviceId {
                        expected: None,
                        got,
                    })
                }
            }
        }
    }

    fn check_sequence(&self, definition: &MessageDefinition, got: u32) -> Result<()> {
        match definition.sequence {
            SequencePolicy::Fixed(expected) if got != expected => {
                Err(CoreError::sequence(got, format!("expected {expected}")))
            }
            SequencePolicy::FreeRunning
                if !SequenceNumber::new(got).is_newer_than(&SequenceNumber::new(self.rx_floor)) =>
            {
                Err(CoreError::sequence(
                    got,
                    format!("expected greater than {}", self.rx_floor),
                ))
            }
            _ => Ok(()),
        }
    }

    fn check_adjacency(&self, definition: &MessageDefinition, direction: Direction) -> Result<()> {
        let previous = self.history.previous(direction);
        if definition.allows_after(previous, direction) {
            Ok(())
        } else {
            Err(CoreError::Adjacency {
                message_type: definition.message_type.as_byte(),
                previous: previous.map_or(0xFF, MessageType::as_byte),
            })
        }
    }

    /// Status-check gate and pairing gate, shared by both directions.
    fn check_features(&self, definition: &MessageDefinition) -> Result<()> {
        let features = self.config.features;
        if definition.message_type.is_status_check() && !features.contains(FeatureFlags::STATUS_CHECK)
        {
            return Err(CoreError::StatusCheck {
                reason: "status check disabled",
            });
        }
        if definition.pairing_required
            && features.contains(FeatureFlags::PAIRING_REQUIRED)
            && !self.pairing.is_mutual()
        {
            return Err(CoreError::pairing("link is not mutually confirmed"));
        }
        if definition.encryption_required && self.pairing.encryption_key().is_none() {
            return Err(CoreError::pairing("no link key"));
        }
        Ok(())
    }

    fn tag_key(&self, definition: &MessageDefinition) -> Result<Option<&SecretKey>> {
        match definition.auth {
            AuthPolicy::Plain => Ok(None),
            AuthPolicy::Keyed => self
                .pairing
                .mac_key()
                .map(Some)
                .ok_or_else(|| CoreError::pairing("no frame MAC key")),
            AuthPolicy::KeyedWhenAvailable => Ok(self.pairing.mac_key()),
        }
    }

    /// Checks the header tag; returns whether it was keyed.
    ///
    /// An Error frame that fails the keyed check is refused as
    /// `UnverifiedReport`, which counts towards the revert threshold
    /// instead of reverting.
    fn verify_tag(&self, view: &FrameView<'_>, definition: &MessageDefinition) -> Result<bool> {
        let key = self.tag_key(definition)?;
        match FrameCodec::verify_tag(view, key) {
            Ok(()) => Ok(key.is_some()),
            Err(_) if key.is_some() && definition.message_type == MessageType::Error => {
                Err(CoreError::UnverifiedReport)
            }
            Err(e) => Err(e),
        }
    }

    /// Type-specific handling; returns the reply and whether pairing
    /// completed on this side.
    fn handle_payload(
        &mut self,
        message_type: MessageType,
        device_id: DeviceId,
        payload: &[u8],
        keyed: bool,
    ) -> Result<(Option<Reply>, bool)> {
        match message_type {
            MessageType::PairingKey => {
                let client_public = public_key(payload)?;
                self.transaction.reset();
                self.status_check.clear();
                let server_public = self.pairing.on_pairing_key(device_id, &client_public)?;
                Ok((
                    Some(Reply::new(MessageType::PairingKeyResponse, &server_public)),
                    false,
                ))
            }
            MessageType::PairingKeyResponse => {
                let server_public = public_key(payload)?;
                let digest =
                    self.pairing
                        .on_key_response(device_id, &server_public, self.rx_floor)?;
                Ok((
                    Some(Reply::new(MessageType::DigestMatch, &digest.encode())),
                    false,
                ))
            }
            MessageType::DigestMatch => {
                let remote = DigestMatchPayload::decode(payload)?;
                let digest = self.pairing.on_digest_match(&remote, self.rx_floor)?;
                Ok((
                    Some(Reply::new(MessageType::DigestMatchResponse, &digest.encode())),
                    false,
                ))
            }
            MessageType::DigestMatchResponse => {
                let remote = DigestMatchPayload::decode(payload)?;
                let echo = self.pairing.on_digest_response(&remote)?;
                Ok((Some(Reply::new(MessageType::PairingConfirm, &echo)), true))
            }
            MessageType::PairingConfirm => {
                self.pairing.on_confirm(payload)?;
                Ok((None, true))
            }
            MessageType::StatusCheck => {
                let answer = self.status_check.answer(payload)?;
                Ok((
                    Some(Reply::new(MessageType::StatusCheckResponse, &answer)),
                    false,
                ))
            }
            MessageType::StatusCheckResponse => {
                self.status_check.verify_response(payload)?;
                Ok((None, false))
            }
            MessageType::Ticket => {
                if let Some(old) = self.ticket.as_mut() {
                    old.zeroize();
                }
                self.ticket = Some(payload.to_vec());
                Ok((None, false))
            }
            MessageType::TransactionStop => Ok((
                Some(Reply::new(MessageType::TransactionStopAck, &[])),
                false,
            )),
            MessageType::Error => {
                let kind = payload.first().copied().and_then(FailureKind::from_code);
                warn!(
                    peer = %device_id,
                    kind = kind.map_or("unknown", FailureKind::name),
                    keyed,
                    "Peer reported an error, pairing dropped"
                );
                self.pairing.revert();
                Ok((None, false))
            }
            MessageType::Data
            | MessageType::TransactionStart
            | MessageType::TransactionData
            | MessageType::TransactionStopAck => Ok((None, false)),
        }
    }

    fn on_failure(&mut self, error: &CoreError) {
        if error.reverts_pairing() && self.pairing.step() != PairingStep::Idle {
            warn!(error = %error, "Link key no longer trusted, pairing reverted");
            self.pairing.revert();
        } else if matches!(error, CoreError::Pairing { .. } | CoreError::UnverifiedReport) {
            self.pairing
                .record_error(self.config.pairing_error_threshold);
        }
    }

    fn apply_sequence_floor(&mut self) {
        let floor = self.pairing.sequence_floor();
        self.rx_floor = self.rx_floor.max(floor);
        self.tx_sequence = self.tx_sequence.max(floor);
        debug!(floor, "Sequence floor applied");
    }

    // ========================================
    // Outbound
    // ========================================

    /// Builds an outbound frame without changing any state.
    ///
    /// Gates are checked before ordering so an unpaired link reports
    /// `Pairing` rather than an ordering error.
    ///
    /// # Errors
    /// - `Pairing` / `StatusCheck`: gated feature unavailable
    /// - `Adjacency` / `Transaction`: not allowed after the last sent frame
    /// - `Length`: payload or footer does not fit the definition
    /// - `Sequence`: sequence space exhausted
    pub fn prepare(
        &self,
        message_type: MessageType,
        payload: &[u8],
        footer: Option<&Footer>,
    ) -> Result<PreparedFrame> {
        let definition = message_type.definition();
        self.check_features(definition)?;
        self.check_adjacency(definition, Direction::Transmit)?;
        self.transaction.check(definition)?;
        definition.check_payload(payload.len())?;
        if definition.footer != footer.is_some() {
            return Err(CoreError::length(
                usize::from(footer.is_some()),
                usize::from(definition.footer),
                "footer presence",
            ));
        }

        let sequence = match definition.sequence {
            SequencePolicy::Fixed(value) => value,
            SequencePolicy::FreeRunning => SequenceNumber::new(self.tx_sequence)
                .next()
                .map(|next| next.value())
                .ok_or_else(|| CoreError::sequence(self.tx_sequence, "sequence space exhausted"))?,
        };

        let total = definition.overhead() + payload.len();
        if total > self.max_message_size() {
            return Err(CoreError::length(
                total,
                self.max_message_size(),
                "exceeds maximum message size",
            ));
        }

        let local = self.config.device_id;
        let body = if definition.encryption_required {
            let key = self
                .pairing
                .encryption_key()
                .ok_or_else(|| CoreError::pairing("no link key"))?;
            let mut plaintext = Vec::new();
            plaintext
                .try_reserve_exact(payload.len() + PADDING_SIZE)
                .map_err(|_| CoreError::AllocationFailure {
                    context: "plaintext buffer".into(),
                })?;
            plaintext.extend_from_slice(payload);
            if definition.padded {
                let mut padding = [0u8; PADDING_SIZE];
                OsRng.fill_bytes(&mut padding);
                plaintext.extend_from_slice(&padding);
            }
            let aad = FrameCodec::header_prefix(local, message_type, total, sequence)?;
            let sealed = self.envelope.seal(
                key,
                &IvMaterial::derive(sequence, local),
                &aad,
                &plaintext,
            );
            plaintext.zeroize();
            sealed?
        } else {
            payload.to_vec()
        };

        let bytes = FrameCodec::encode(
            local,
            message_type,
            sequence,
            &body,
            footer,
            self.tag_key(definition)?,
        )?;
        Ok(PreparedFrame {
            message_type,
            sequence,
            bytes,
        })
    }

    /// Records a frame the transport accepted.
    pub fn commit_sent(&mut self, frame: &PreparedFrame, now: Instant) {
        let remote = self.remote_device.unwrap_or_default();
        self.history.record_sent(HistoryEntry {
            address: self.remote_address,
            at: now,
            device_id: remote,
            sequence: frame.sequence,
            message_type: frame.message_type,
        });
        if frame.message_type.definition().sequence == SequencePolicy::FreeRunning {
            self.tx_sequence = frame.sequence;
        }
        self.transaction
            .apply(frame.message_type, remote, self.remote_address, now);
        trace!(message_type = %frame.message_type, seq = frame.sequence, "Frame sent");
    }

    /// Opens a pairing handshake (client only).
    ///
    /// # Errors
    /// `Pairing` on a server, or any `prepare` error.
    pub fn begin_pairing(&mut self) -> Result<PreparedFrame> {
        self.transaction.reset();
        self.status_check.clear();
        let public = self.pairing.begin()?;
        self.prepare(MessageType::PairingKey, &public, None)
    }

    /// Issues a status-check challenge.
    ///
    /// The challenge is armed only once the frame is built, so a refused
    /// send leaves any earlier challenge pending.
    ///
    /// # Errors
    /// `StatusCheck` if the feature is disabled, or any `prepare` error.
    pub fn begin_status_check(&mut self, now: Instant) -> Result<PreparedFrame> {
        let challenge = StatusCheckState::challenge();
        let prepared = self.prepare(MessageType::StatusCheck, &challenge, None)?;
        self.status_check.arm(challenge, now);
        Ok(prepared)
    }

    /// Builds an Error frame reporting `kind` to the peer.
    ///
    /// # Errors
    /// Any `prepare` error.
    pub fn prepare_error(&self, kind: FailureKind) -> Result<PreparedFrame> {
        self.prepare(MessageType::Error, &[kind.code()], None)
    }

    /// Expires transaction and status-check deadlines.
    pub fn poll_timeouts(&mut self, now: Instant) -> Vec<CoreError> {
        let mut expired = Vec::new();
        expired.extend(self.transaction.poll_timeout(now));
        expired.extend(self.status_check.poll_timeout(now));
        expired
    }

    /// Drops keys, challenges, ticket and history.
    pub fn teardown(&mut self) {
        self.pairing.revert();
        self.status_check.clear();
        self.transaction.reset();
        self.history.clear();
        if let Some(ticket) = self.ticket.as_mut() {
            ticket.zeroize();
        }
        self.ticket = None;
        debug!(device_id = %self.config.device_id, "Link state torn down");
    }

    fn max_message_size(&self) -> usize {
        self.config.max_message_size.min(MAX_FRAME_SIZE)
    }
}

impl std::fmt::Debug for LinkController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkController")
            .field("device_id", &self.config.device_id)
            .field("remote_device", &self.remote_device)
            .field("pairing", &self.pairing)
            .field("transaction", &self.transaction.status())
            .field("rx_floor", &self.rx_floor)
            .field("tx_sequence", &self.tx_sequence)
            .finish_non_exhaustive()
    }
}

fn public_key(payload: &[u8]) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    payload
        .try_into()
        .map_err(|_| CoreError::length(payload.len(), PUBLIC_KEY_SIZE, "public key"))
}

// ============================================
// Tests
// ============================================
