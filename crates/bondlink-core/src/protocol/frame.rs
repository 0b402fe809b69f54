// ============================================
// File: crates/bondlink-core/src/protocol/frame.rs
// ============================================
//! # Frame Codec
//!
//! ## Creation Reason
//! Turns raw link bytes into a validated view of the fixed header and
//! assembles outbound frames, including the header authentication tag.
//!
//! ## Main Functionality
//! - `FrameView`: borrowed, length-checked view over an inbound frame
//! - `FrameHeader`: owned copy of the decoded header fields
//! - `FrameCodec`: frame assembly and tag verification
//!
//! ## Parsing Strategy
//! 1. Check the buffer covers the length field
//! 2. Compare the declared length with the limit and the buffer
//! 3. Only then expose the header fields
//! 4. Split body and footer once the message definition is known
//!
//! ## ⚠️ Important Note for Next Developer
//! - `FrameView::parse` is the only entry point for untrusted bytes;
//!   accessors assume its checks already ran
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use bytes::{Buf, BufMut};

use bondlink_common::DeviceId;

use super::definitions::{MessageDefinition, MessageType};
use super::footer::Footer;
use super::{
    AUTH_TAG_OFFSET, AUTH_TAG_SIZE, BODY_OFFSET, DEVICE_ID_OFFSET, FOOTER_SIZE,
    HEADER_PREFIX_SIZE, HEADER_SIZE, LENGTH_OFFSET, MAX_FRAME_SIZE, SEQUENCE_OFFSET, TYPE_OFFSET,
};
use crate::crypto::digest;
use crate::crypto::SecretKey;
use crate::error::{CoreError, Result};

// ============================================
// FrameHeader
// ============================================

/// Decoded header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Sender device id.
    pub device_id: DeviceId,
    /// Message type.
    pub message_type: MessageType,
    /// Whole-frame length.
    pub length: u16,
    /// Sequence number.
    pub sequence: u32,
    /// Header authentication tag.
    pub auth_tag: [u8; AUTH_TAG_SIZE],
}

// ============================================
// FrameView
// ============================================

/// Length-checked view over an inbound frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    bytes: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Validates the frame length and wraps the buffer.
    ///
    /// # Errors
    /// - `Length`: shorter than the header, longer than declared or than
    ///   `max_message_size`
    /// - `Truncated`: shorter than the declared length
    pub fn parse(bytes: &'a [u8], max_message_size: usize) -> Result<Self> {
        if bytes.len() < LENGTH_OFFSET + 2 {
            return Err(CoreError::length(bytes.len(), HEADER_SIZE, "shorter than header"));
        }
        let declared = usize::from((&bytes[LENGTH_OFFSET..]).get_u16_le());

        if declared > max_message_size {
            return Err(CoreError::length(
                declared,
                max_message_size,
                "exceeds maximum message size",
            ));
        }
        if declared < HEADER_SIZE {
            return Err(CoreError::length(declared, HEADER_SIZE, "declared length below header size"));
        }
        if declared > bytes.len() {
            return Err(CoreError::Truncated {
                declared,
                received: bytes.len(),
            });
        }
        if declared < bytes.len() {
            return Err(CoreError::length(
                bytes.len(),
                declared,
                "trailing bytes after declared length",
            ));
        }
        Ok(Self { bytes })
    }

    /// Sender device id.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.bytes[DEVICE_ID_OFFSET..TYPE_OFFSET]);
        DeviceId::new(id)
    }

    /// Raw type byte.
    #[must_use]
    pub fn type_byte(&self) -> u8 {
        self.bytes[TYPE_OFFSET]
    }

    /// Decoded message type.
    ///
    /// # Errors
    /// `Type` for an unknown byte.
    pub fn message_type(&self) -> Result<MessageType> {
        MessageType::try_from(self.type_byte())
    }

    /// Whole-frame length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; a parsed frame holds at least a header.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Sequence number.
    #[must_use]
    pub fn sequence(&self) -> u32 {
        (&self.bytes[SEQUENCE_OFFSET..]).get_u32_le()
    }

    /// Header authentication tag.
    #[must_use]
    pub fn auth_tag(&self) -> &'a [u8] {
        &self.bytes[AUTH_TAG_OFFSET..BODY_OFFSET]
    }

    /// Authenticated header prefix (bytes 0..15), also the AEAD AAD.
    #[must_use]
    pub fn prefix(&self) -> &'a [u8] {
        &self.bytes[..HEADER_PREFIX_SIZE]
    }

    /// Everything after the tag: body and footer.
    #[must_use]
    pub fn tail(&self) -> &'a [u8] {
        &self.bytes[BODY_OFFSET..]
    }

    /// Full frame bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Decoded header.
    ///
    /// # Errors
    /// `Type` for an unknown type byte.
    pub fn header(&self) -> Result<FrameHeader> {
        let mut auth_tag = [0u8; AUTH_TAG_SIZE];
        auth_tag.copy_from_slice(self.auth_tag());
        Ok(FrameHeader {
            device_id: self.device_id(),
            message_type: self.message_type()?,
            length: u16::try_from(self.len()).unwrap_or(u16::MAX),
            sequence: self.sequence(),
            auth_tag,
        })
    }

    /// Splits the tail into body and footer according to `definition`.
    ///
    /// # Errors
    /// `Length` if a footer is expected but missing or malformed.
    pub fn split_body(&self, definition: &MessageDefinition) -> Result<(&'a [u8], Option<Footer>)> {
        let tail = self.tail();
        if !definition.footer {
            return Ok((tail, None));
        }
        if tail.len() < FOOTER_SIZE {
            return Err(CoreError::length(tail.len(), FOOTER_SIZE, "missing footer"));
        }
        let (body, footer) = tail.split_at(tail.len() - FOOTER_SIZE);
        Ok((body, Some(Footer::decode(footer)?)))
    }
}

// ============================================
// FrameCodec
// ============================================

/// Frame assembly and tag verification.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    /// Identifies the message type of a buffer without validating it.
    ///
    /// # Errors
    /// `Length` if the buffer does not reach the type byte, `Type` if the
    /// byte is unknown.
    pub fn peek_message_type(bytes: &[u8]) -> Result<MessageType> {
        let byte = bytes
            .get(TYPE_OFFSET)
            .copied()
            .ok_or(CoreError::length(bytes.len(), TYPE_OFFSET + 1, "shorter than header"))?;
        MessageType::try_from(byte)
    }

    /// Builds the authenticated header prefix for a frame of `total_length`
    /// bytes. Sealing uses it as associated data before the frame exists.
    ///
    /// # Errors
    /// `Length` if `total_length` does not fit the 16-bit length field.
    pub fn header_prefix(
        device_id: DeviceId,
        message_type: MessageType,
        total_length: usize,
        sequence: u32,
    ) -> Result<[u8; HEADER_PREFIX_SIZE]> {
        let length = u16::try_from(total_length).map_err(|_| {
            CoreError::length(total_length, MAX_FRAME_SIZE, "exceeds 16-bit length field")
        })?;
        let mut prefix = [0u8; HEADER_PREFIX_SIZE];
        let mut cursor = &mut prefix[..];
        cursor.put_slice(device_id.as_bytes());
        cursor.put_u8(message_type.as_byte());
        cursor.put_u16_le(length);
        cursor.put_u32_le(sequence);
        Ok(prefix)
    }

    /// Assembles a frame and fills in its header tag.
    ///
    /// `body` is written as-is (already sealed for encrypted types).
    ///
    /// # Errors
    /// `Length` if the frame would not fit the 16-bit length field.
    pub fn encode(
        device_id: DeviceId,
        message_type: MessageType,
        sequence: u32,
        body: &[u8],
        footer: Option<&Footer>,
        mac_key: Option<&SecretKey>,
    ) -> Result<Vec<u8>> {
        let total = HEADER_SIZE + body.len() + footer.map_or(0, |_| FOOTER_SIZE);
        let prefix = Self::header_prefix(device_id, message_type, total, sequence)?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(total)
            .map_err(|_| CoreError::AllocationFailure {
                context: "frame buffer".into(),
            })?;
        buf.put_slice(&prefix);
        buf.put_bytes(0, AUTH_TAG_SIZE);
        buf.put_slice(body);
        if let Some(footer) = footer {
            footer.encode(&mut buf);
        }

        let tag = digest::header_tag(mac_key, &buf[..HEADER_PREFIX_SIZE], &buf[BODY_OFFSET..])?;
        buf[AUTH_TAG_OFFSET..BODY_OFFSET].copy_from_slice(&tag);
        Ok(buf)
    }

    /// Verifies the header tag of a parsed frame.
    ///
    /// # Errors
    /// `Authentication` on mismatch.
    pub fn verify_tag(view: &FrameView<'_>, mac_key: Option<&SecretKey>) -> Result<()> {
        digest::verify_header_tag(mac_key, view.prefix(), view.tail(), view.auth_tag())
    }
}

// ============================================
// Tests
// ============================================
