// ============================================
// File: crates/bondlink-core/src/protocol/footer.rs
// ============================================
//! # Frame Footer
//!
//! 15-byte trailer carried after the body of chunked messages. It tells the
//! receiver whether more chunks follow and where this one sits.
//!
//! ```text
//! ┌───────┬─────────────┬──────────────┬──────────────┐
//! │ token │ chunk index │ total length │ reserved     │
//! │ 1     │ 2 (LE)      │ 4 (LE)       │ 8 (zero)     │
//! └───────┴─────────────┴──────────────┴──────────────┘
//! ```

use bytes::{Buf, BufMut};

use crate::error::{CoreError, Result};

use super::FOOTER_SIZE;

const RESERVED_SIZE: usize = 8;

/// Stop/continuation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FooterToken {
    /// Last chunk of the transfer.
    Stop = 0x00,
    /// More chunks follow.
    Continue = 0x01,
}

/// Decoded footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Stop or continue.
    pub token: FooterToken,
    /// Zero-based chunk position.
    pub chunk_index: u16,
    /// Length of the whole transfer in bytes.
    pub total_length: u32,
}

impl Footer {
    /// Footer for a chunk that is followed by more.
    #[must_use]
    pub const fn continuing(chunk_index: u16, total_length: u32) -> Self {
        Self {
            token: FooterToken::Continue,
            chunk_index,
            total_length,
        }
    }

    /// Footer for the final chunk.
    #[must_use]
    pub const fn last(chunk_index: u16, total_length: u32) -> Self {
        Self {
            token: FooterToken::Stop,
            chunk_index,
            total_length,
        }
    }

    /// Returns `true` if this is the final chunk.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        matches!(self.token, FooterToken::Stop)
    }

    /// Appends the encoded footer to `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.token as u8);
        buf.put_u16_le(self.chunk_index);
        buf.put_u32_le(self.total_length);
        buf.put_bytes(0, RESERVED_SIZE);
    }

    /// Decodes a footer from exactly 15 bytes.
    ///
    /// # Errors
    /// `Length` for a wrong size or an unknown token byte.
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() != FOOTER_SIZE {
            return Err(CoreError::length(bytes.len(), FOOTER_SIZE, "footer size"));
        }
        let token = match bytes.get_u8() {
            0x00 => FooterToken::Stop,
            0x01 => FooterToken::Continue,
            _ => return Err(CoreError::length(FOOTER_SIZE, FOOTER_SIZE, "malformed footer token")),
        };
        let chunk_index = bytes.get_u16_le();
        let total_length = bytes.get_u32_le();
        Ok(Self {
            token,
            chunk_index,
            total_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footer_layout() {
        let mut buf = Vec::new();
        Footer::continuing(3, 0x0102_0304).encode(&mut buf);
        assert_eq!(buf.len(), FOOTER_SIZE);
        assert_eq!(&buf[..7], &[0x01, 0x03, 0x00, 0x04, 0x03, 0x02, 0x01]);
        assert!(buf[7..].iter().all(|b| *b == 0));

        let decoded = Footer::decode(&buf).unwrap();
        assert!(!decoded.is_last());
        assert_eq!(decoded.chunk_index, 3);
    }

    #[test]
    fn test_footer_rejects_bad_token_and_size() {
        let mut buf = vec![0u8; FOOTER_SIZE];
        buf[0] = 0x07;
        assert!(matches!(Footer::decode(&buf), Err(CoreError::Length { .. })));
        assert!(Footer::decode(&buf[..10]).is_err());
    }
}
