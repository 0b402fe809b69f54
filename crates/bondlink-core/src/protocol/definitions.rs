// ============================================
// File: crates/bondlink-core/src/protocol/definitions.rs
// ============================================
//! # Message Definitions
//!
//! ## Creation Reason
//! Static, read-only table describing every message type: how long it is,
//! how its sequence number behaves, whether it needs pairing or
//! encryption, which transaction state it belongs to and which types may
//! legally precede it.
//!
//! ## Message Table
//! | Byte | Type | Slot | Seq | Enc | Txn |
//! |------|------|------|-----|-----|-----|
//! | 0x01 | PairingKey | 0 | 1 | - | - |
//! | 0x02 | PairingKeyResponse | 1 | 2 | - | - |
//! | 0x03 | DigestMatch | 2 | 3 | - | - |
//! | 0x04 | DigestMatchResponse | 3 | 4 | - | - |
//! | 0x05 | PairingConfirm | 4 | 5 | - | - |
//! | 0x08 | StatusCheck | 5 | free | - | - |
//! | 0x09 | StatusCheckResponse | 6 | free | - | - |
//! | 0x10 | Data | 7 | free | yes | - |
//! | 0x11 | Ticket | 8 | free | yes | - |
//! | 0x20 | TransactionStart | 9 | free | yes | stopped |
//! | 0x21 | TransactionData | 10 | free | yes | active |
//! | 0x22 | TransactionStop | 11 | free | yes | active |
//! | 0x23 | TransactionStopAck | 12 | free | yes | - |
//! | 0x7F | Error | 14 | 0 | - | - |
//!
//! ## Adjacency Bitmaps
//! Bit `n` of a predecessor bitmap allows the type in slot `n` to be the
//! previous frame in the same direction; bit 15 allows "no previous frame".
//! Error frames are excluded from every set except the pairing and error
//! entries, so a link that reported an error must re-pair.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Type bytes and slots are wire-visible, append only
//! - The table is consulted, never mutated
//!
//! ## Last Modified
//! v0.1.0 - Initial message definitions

use std::fmt;

use crate::crypto::ENVELOPE_OVERHEAD;
use crate::error::{CoreError, Result};

use super::{
    CHALLENGE_SIZE, DIGEST_MATCH_SIZE, FOOTER_SIZE, HEADER_SIZE, PADDING_SIZE, STATUS_HASH_SIZE,
};
use crate::crypto::PUBLIC_KEY_SIZE;

// ============================================
// MessageType
// ============================================

/// Protocol message type identifier (byte 8 of the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessageType {
    /// Client's ephemeral public key.
    PairingKey = 0x01,
    /// Server's ephemeral public key.
    PairingKeyResponse = 0x02,
    /// Client's Digest-Match payload.
    DigestMatch = 0x03,
    /// Server's Digest-Match payload.
    DigestMatchResponse = 0x04,
    /// Client's acknowledgement of the server digest.
    PairingConfirm = 0x05,
    /// Status-check challenge.
    StatusCheck = 0x08,
    /// Status-check answer.
    StatusCheckResponse = 0x09,
    /// Encrypted application payload.
    Data = 0x10,
    /// Encrypted authentication ticket.
    Ticket = 0x11,
    /// Opens a transaction.
    TransactionStart = 0x20,
    /// Transaction payload chunk.
    TransactionData = 0x21,
    /// Requests the end of the transaction.
    TransactionStop = 0x22,
    /// Acknowledges the end of the transaction.
    TransactionStopAck = 0x23,
    /// Failure report.
    Error = 0x7F,
}

/// Slot bit meaning "no previous frame in this direction".
pub const NO_PREDECESSOR: u16 = 1 << 15;

impl MessageType {
    /// Every type, in table order.
    pub const ALL: [Self; 14] = [
        Self::PairingKey,
        Self::PairingKeyResponse,
        Self::DigestMatch,
        Self::DigestMatchResponse,
        Self::PairingConfirm,
        Self::StatusCheck,
        Self::StatusCheckResponse,
        Self::Data,
        Self::Ticket,
        Self::TransactionStart,
        Self::TransactionData,
        Self::TransactionStop,
        Self::TransactionStopAck,
        Self::Error,
    ];

    /// Converts a byte to a `MessageType`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::PairingKey),
            0x02 => Some(Self::PairingKeyResponse),
            0x03 => Some(Self::DigestMatch),
            0x04 => Some(Self::DigestMatchResponse),
            0x05 => Some(Self::PairingConfirm),
            0x08 => Some(Self::StatusCheck),
            0x09 => Some(Self::StatusCheckResponse),
            0x10 => Some(Self::Data),
            0x11 => Some(Self::Ticket),
            0x20 => Some(Self::TransactionStart),
            0x21 => Some(Self::TransactionData),
            0x22 => Some(Self::TransactionStop),
            0x23 => Some(Self::TransactionStopAck),
            0x7F => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns the type byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Position of the type in the table.
    const fn index(self) -> usize {
        match self {
            Self::PairingKey => 0,
            Self::PairingKeyResponse => 1,
            Self::DigestMatch => 2,
            Self::DigestMatchResponse => 3,
            Self::PairingConfirm => 4,
            Self::StatusCheck => 5,
            Self::StatusCheckResponse => 6,
            Self::Data => 7,
            Self::Ticket => 8,
            Self::TransactionStart => 9,
            Self::TransactionData => 10,
            Self::TransactionStop => 11,
            Self::TransactionStopAck => 12,
            Self::Error => 13,
        }
    }

    /// Adjacency slot (bit index in predecessor bitmaps).
    #[must_use]
    pub const fn slot(self) -> u8 {
        match self {
            Self::Error => 14,
            other => other.index() as u8,
        }
    }

    /// Bit for this type in a predecessor bitmap.
    #[must_use]
    pub const fn bit(self) -> u16 {
        1 << self.slot()
    }

    /// Bit for an optional previous type.
    #[must_use]
    pub const fn predecessor_bit(previous: Option<Self>) -> u16 {
        match previous {
            Some(t) => t.bit(),
            None => NO_PREDECESSOR,
        }
    }

    /// Returns the static definition for this type.
    #[must_use]
    pub fn definition(self) -> &'static MessageDefinition {
        &DEFINITIONS[self.index()]
    }

    /// Returns `true` for types that answer an earlier request.
    #[must_use]
    pub const fn is_response(self) -> bool {
        matches!(
            self,
            Self::PairingKeyResponse
                | Self::DigestMatchResponse
                | Self::StatusCheckResponse
                | Self::TransactionStopAck
        )
    }

    /// Returns `true` for the status-check types.
    #[must_use]
    pub const fn is_status_check(self) -> bool {
        matches!(self, Self::StatusCheck | Self::StatusCheckResponse)
    }

    /// Returns the type name used in logs and configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PairingKey => "pairing_key",
            Self::PairingKeyResponse => "pairing_key_response",
            Self::DigestMatch => "digest_match",
            Self::DigestMatchResponse => "digest_match_response",
            Self::PairingConfirm => "pairing_confirm",
            Self::StatusCheck => "status_check",
            Self::StatusCheckResponse => "status_check_response",
            Self::Data => "data",
            Self::Ticket => "ticket",
            Self::TransactionStart => "transaction_start",
            Self::TransactionData => "transaction_data",
            Self::TransactionStop => "transaction_stop",
            Self::TransactionStopAck => "transaction_stop_ack",
            Self::Error => "error",
        }
    }

    /// Looks a type up by its configuration name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_byte(value).ok_or(CoreError::Type(value))
    }
}

impl From<MessageType> for u8 {
    fn from(t: MessageType) -> Self {
        t.as_byte()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02x})", self.name(), self.as_byte())
    }
}

// ============================================
// Definition Policies
// ============================================

/// Fixed or variable length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthPolicy {
    /// Exactly this many bytes.
    Fixed(usize),
    /// At least this many bytes.
    Variable {
        /// Lower bound
        min: usize,
    },
}

impl LengthPolicy {
    /// Returns `true` if `len` satisfies the policy.
    #[must_use]
    pub const fn accepts(&self, len: usize) -> bool {
        match *self {
            Self::Fixed(n) => len == n,
            Self::Variable { min } => len >= min,
        }
    }

    const fn offset(self, by: usize) -> Self {
        match self {
            Self::Fixed(n) => Self::Fixed(n + by),
            Self::Variable { min } => Self::Variable { min: min + by },
        }
    }
}

/// How the sequence number of a type is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePolicy {
    /// Must equal this value (handshake role).
    Fixed(u32),
    /// Must exceed the highest accepted sequence.
    FreeRunning,
}

/// Transaction state a type requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCheck {
    /// No requirement.
    None,
    /// Only while a transaction is active.
    ActiveOnly,
    /// Only while no transaction is running.
    StoppedOnly,
}

/// How the header tag of a type is keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Plain SHA-256; carries no proof of origin.
    Plain,
    /// HMAC under the frame MAC key; refused while no key is held.
    Keyed,
    /// HMAC once a frame MAC key is held, plain SHA-256 before that.
    KeyedWhenAvailable,
}

/// Which history an adjacency check consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Inbound frame, checked against the last received type.
    Receive,
    /// Outbound frame, checked against the last sent type.
    Transmit,
}

// ============================================
// MessageDefinition
// ============================================

/// Static description of one message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageDefinition {
    /// The type described.
    pub message_type: MessageType,
    /// Application payload length (before padding and sealing).
    pub body: LengthPolicy,
    /// Sequence validation rule.
    pub sequence: SequencePolicy,
    /// Requires a mutually confirmed pairing.
    pub pairing_required: bool,
    /// Body travels inside the AEAD envelope.
    pub encryption_required: bool,
    /// 13 random bytes are appended to the plaintext before sealing.
    pub padded: bool,
    /// A 15-byte footer follows the body.
    pub footer: bool,
    /// Transaction state requirement.
    pub transaction: TransactionCheck,
    /// Legal previous received types.
    pub rx_predecessors: u16,
    /// Legal previous sent types.
    pub tx_predecessors: u16,
    /// The peer answers this type automatically.
    pub response_expected: bool,
    /// Header tag keying.
    pub auth: AuthPolicy,
    /// Dispatch also raises a ticket event.
    pub ticket_relevant: bool,
}

impl MessageDefinition {
    /// Bytes a frame of this type carries beyond its payload.
    #[must_use]
    pub const fn overhead(&self) -> usize {
        let mut n = HEADER_SIZE;
        if self.encryption_required {
            n += ENVELOPE_OVERHEAD;
        }
        if self.padded {
            n += PADDING_SIZE;
        }
        if self.footer {
            n += FOOTER_SIZE;
        }
        n
    }

    /// Total frame length policy.
    #[must_use]
    pub const fn total_length(&self) -> LengthPolicy {
        self.body.offset(self.overhead())
    }

    /// Validates a whole-frame length against the policy and the limit.
    ///
    /// # Errors
    /// `Length` if the frame is too long or does not fit the policy.
    pub fn check_total(&self, len: usize, max: usize) -> Result<()> {
        if len > max {
            return Err(CoreError::length(len, max, "exceeds maximum message size"));
        }
        match self.total_length() {
            LengthPolicy::Fixed(n) if len != n => {
                Err(CoreError::length(len, n, "fixed length mismatch"))
            }
            LengthPolicy::Variable { min } if len < min => {
                Err(CoreError::length(len, min, "below minimum length"))
            }
            _ => Ok(()),
        }
    }

    /// Validates an application payload length.
    ///
    /// # Errors
    /// `Length` if the payload does not fit the body policy.
    pub fn check_payload(&self, len: usize) -> Result<()> {
        match self.body {
            LengthPolicy::Fixed(n) if len != n => {
                Err(CoreError::length(len, n, "payload length mismatch"))
            }
            LengthPolicy::Variable { min } if len < min => {
                Err(CoreError::length(len, min, "payload below minimum length"))
            }
            _ => Ok(()),
        }
    }

    /// Returns `true` if this type may follow `previous` in `direction`.
    #[must_use]
    pub const fn allows_after(&self, previous: Option<MessageType>, direction: Direction) -> bool {
        let bitmap = match direction {
            Direction::Receive => self.rx_predecessors,
            Direction::Transmit => self.tx_predecessors,
        };
        bitmap & MessageType::predecessor_bit(previous) != 0
    }
}

// ============================================
// Definition Table
// ============================================

const fn bits(types: &[MessageType]) -> u16 {
    let mut out = 0;
    let mut i = 0;
    while i < types.len() {
        out |= types[i].bit();
        i += 1;
    }
    out
}

const ANY: u16 = u16::MAX;

const ANY_BUT_ERROR: u16 = !MessageType::Error.bit();

/// Types that can be the last frame in either direction once paired.
const PAIRED: u16 = bits(&[
    MessageType::DigestMatchResponse,
    MessageType::PairingConfirm,
    MessageType::StatusCheck,
    MessageType::StatusCheckResponse,
    MessageType::Data,
    MessageType::Ticket,
    MessageType::TransactionStart,
    MessageType::TransactionData,
    MessageType::TransactionStop,
    MessageType::TransactionStopAck,
]);

/// Types that can precede a transaction chunk or stop.
const IN_TRANSACTION: u16 = bits(&[
    MessageType::TransactionStart,
    MessageType::TransactionData,
    MessageType::StatusCheck,
    MessageType::StatusCheckResponse,
    MessageType::Data,
    MessageType::Ticket,
]);

const fn handshake(
    message_type: MessageType,
    body: usize,
    seq: u32,
    predecessors: u16,
    auth: AuthPolicy,
) -> MessageDefinition {
    MessageDefinition {
        message_type,
        body: LengthPolicy::Fixed(body),
        sequence: SequencePolicy::Fixed(seq),
        pairing_required: false,
        encryption_required: false,
        padded: false,
        footer: false,
        transaction: TransactionCheck::None,
        rx_predecessors: predecessors,
        tx_predecessors: predecessors,
        response_expected: false,
        auth,
        ticket_relevant: false,
    }
}

const fn sealed(
    message_type: MessageType,
    body: LengthPolicy,
    transaction: TransactionCheck,
    predecessors: u16,
) -> MessageDefinition {
    MessageDefinition {
        message_type,
        body,
        sequence: SequencePolicy::FreeRunning,
        pairing_required: true,
        encryption_required: true,
        padded: false,
        footer: false,
        transaction,
        rx_predecessors: predecessors,
        tx_predecessors: predecessors,
        response_expected: false,
        auth: AuthPolicy::Keyed,
        ticket_relevant: false,
    }
}

const fn status(message_type: MessageType, body: usize) -> MessageDefinition {
    MessageDefinition {
        message_type,
        body: LengthPolicy::Fixed(body),
        sequence: SequencePolicy::FreeRunning,
        pairing_required: false,
        encryption_required: false,
        padded: false,
        footer: false,
        transaction: TransactionCheck::None,
        rx_predecessors: ANY_BUT_ERROR,
        tx_predecessors: ANY_BUT_ERROR,
        response_expected: false,
        auth: AuthPolicy::KeyedWhenAvailable,
        ticket_relevant: false,
    }
}

static DEFINITIONS: [MessageDefinition; 14] = [
    MessageDefinition {
        response_expected: true,
        ..handshake(MessageType::PairingKey, PUBLIC_KEY_SIZE, 1, ANY, AuthPolicy::Plain)
    },
    handshake(MessageType::PairingKeyResponse, PUBLIC_KEY_SIZE, 2, ANY, AuthPolicy::Plain),
    MessageDefinition {
        response_expected: true,
        ..handshake(
            MessageType::DigestMatch,
            DIGEST_MATCH_SIZE,
            3,
            MessageType::PairingKey.bit(),
            AuthPolicy::Keyed,
        )
    },
    handshake(
        MessageType::DigestMatchResponse,
        DIGEST_MATCH_SIZE,
        4,
        MessageType::PairingKeyResponse.bit(),
        AuthPolicy::Keyed,
    ),
    handshake(
        MessageType::PairingConfirm,
        STATUS_HASH_SIZE,
        5,
        MessageType::DigestMatch.bit(),
        AuthPolicy::Keyed,
    ),
    MessageDefinition {
        response_expected: true,
        ..status(MessageType::StatusCheck, CHALLENGE_SIZE)
    },
    status(MessageType::StatusCheckResponse, CHALLENGE_SIZE * 2),
    MessageDefinition {
        padded: true,
        ..sealed(
            MessageType::Data,
            LengthPolicy::Variable { min: 0 },
            TransactionCheck::None,
            PAIRED,
        )
    },
    MessageDefinition {
        ticket_relevant: true,
        ..sealed(
            MessageType::Ticket,
            LengthPolicy::Variable { min: 1 },
            TransactionCheck::None,
            PAIRED,
        )
    },
    sealed(
        MessageType::TransactionStart,
        LengthPolicy::Variable { min: 0 },
        TransactionCheck::StoppedOnly,
        PAIRED,
    ),
    MessageDefinition {
        padded: true,
        footer: true,
        ..sealed(
            MessageType::TransactionData,
            LengthPolicy::Variable { min: 0 },
            TransactionCheck::ActiveOnly,
            IN_TRANSACTION,
        )
    },
    MessageDefinition {
        response_expected: true,
        ..sealed(
            MessageType::TransactionStop,
            LengthPolicy::Fixed(0),
            TransactionCheck::ActiveOnly,
            IN_TRANSACTION,
        )
    },
    sealed(
        MessageType::TransactionStopAck,
        LengthPolicy::Fixed(0),
        TransactionCheck::None,
        PAIRED,
    ),
    handshake(MessageType::Error, 1, 0, ANY, AuthPolicy::KeyedWhenAvailable),
];

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_exactly_one_definition() {
        for t in MessageType::ALL {
            assert_eq!(t.definition().message_type, t);
            assert_eq!(MessageType::from_byte(t.as_byte()), Some(t));
            assert_eq!(MessageType::from_name(t.name()), Some(t));
        }
        assert_eq!(MessageType::ALL.len(), DEFINITIONS.len());
    }

    #[test]
    fn test_slots_are_unique() {
        let mut seen = 0u16;
        for t in MessageType::ALL {
            assert_eq!(seen & t.bit(), 0, "slot reused by {t}");
            assert_ne!(t.bit(), NO_PREDECESSOR);
            seen |= t.bit();
        }
    }

    #[test]
    fn test_unknown_type_byte() {
        assert_eq!(MessageType::try_from(0x42), Err(CoreError::Type(0x42)));
        assert!(MessageType::from_byte(0x00).is_none());
    }

    #[test]
    fn test_error_is_illegal_predecessor_for_traffic() {
        for t in [
            MessageType::Data,
            MessageType::Ticket,
            MessageType::TransactionStart,
            MessageType::TransactionData,
            MessageType::StatusCheck,
        ] {
            let def = t.definition();
            assert!(!def.allows_after(Some(MessageType::Error), Direction::Receive));
            assert!(!def.allows_after(Some(MessageType::Error), Direction::Transmit));
        }
        let key = MessageType::PairingKey.definition();
        assert!(key.allows_after(Some(MessageType::Error), Direction::Receive));
    }

    #[test]
    fn test_handshake_adjacency() {
        let dm = MessageType::DigestMatch.definition();
        assert!(dm.allows_after(Some(MessageType::PairingKey), Direction::Receive));
        assert!(!dm.allows_after(None, Direction::Receive));
        assert!(!dm.allows_after(Some(MessageType::Data), Direction::Receive));

        let stop = MessageType::TransactionStop.definition();
        assert!(stop.allows_after(Some(MessageType::TransactionData), Direction::Transmit));
        assert!(!stop.allows_after(Some(MessageType::PairingConfirm), Direction::Receive));
    }

    #[test]
    fn test_total_length_policy() {
        let key = MessageType::PairingKey.definition();
        assert_eq!(key.total_length(), LengthPolicy::Fixed(HEADER_SIZE + PUBLIC_KEY_SIZE));
        assert!(key.check_total(HEADER_SIZE + PUBLIC_KEY_SIZE, 512).is_ok());
        assert!(matches!(
            key.check_total(HEADER_SIZE + 31, 512),
            Err(CoreError::Length { .. })
        ));

        let data = MessageType::Data.definition();
        assert_eq!(
            data.total_length(),
            LengthPolicy::Variable {
                min: HEADER_SIZE + ENVELOPE_OVERHEAD + PADDING_SIZE
            }
        );
        assert!(matches!(
            data.check_total(600, 512),
            Err(CoreError::Length { .. })
        ));

        let chunk = MessageType::TransactionData.definition();
        assert_eq!(
            chunk.overhead(),
            HEADER_SIZE + ENVELOPE_OVERHEAD + PADDING_SIZE + FOOTER_SIZE
        );
    }

    #[test]
    fn test_only_tickets_are_ticket_relevant() {
        let relevant: Vec<_> = MessageType::ALL
            .into_iter()
            .filter(|t| t.definition().ticket_relevant)
            .collect();
        assert_eq!(relevant, vec![MessageType::Ticket]);
    }

    #[test]
    fn test_auth_policy() {
        for t in [MessageType::PairingKey, MessageType::PairingKeyResponse] {
            assert_eq!(t.definition().auth, AuthPolicy::Plain);
        }
        for t in [
            MessageType::StatusCheck,
            MessageType::StatusCheckResponse,
            MessageType::Error,
        ] {
            assert_eq!(t.definition().auth, AuthPolicy::KeyedWhenAvailable);
        }
        for t in MessageType::ALL {
            let def = t.definition();
            if def.pairing_required || def.encryption_required {
                assert_eq!(def.auth, AuthPolicy::Keyed, "{t}");
            }
        }
    }

    #[test]
    fn test_fixed_sequences() {
        assert_eq!(
            MessageType::PairingKey.definition().sequence,
            SequencePolicy::Fixed(1)
        );
        assert_eq!(
            MessageType::PairingConfirm.definition().sequence,
            SequencePolicy::Fixed(5)
        );
        assert_eq!(MessageType::Error.definition().sequence, SequencePolicy::Fixed(0));
        assert_eq!(
            MessageType::Data.definition().sequence,
            SequencePolicy::FreeRunning
        );
    }
}
