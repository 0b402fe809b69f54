// ============================================
// File: crates/bondlink-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Strongly typed identifiers shared by the frame codec, the transport
//! layer and the node runtime.
//!
//! ## Main Functionality
//! - `DeviceId`: 8-byte device identifier carried at offset 0 of every frame
//! - `LinkAddress`: 6-byte link-layer address of the remote end
//! - `SequenceNumber`: 32-bit frame sequence with checked advance
//!
//! ## ⚠️ Important Note for Next Developer
//! - `DeviceId` converts to and from `u64` little-endian; config files use
//!   the integer form
//! - `SequenceNumber::next` refuses to wrap; a link that exhausts the
//!   32-bit space must re-pair
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Size of a device identifier on the wire.
pub const DEVICE_ID_SIZE: usize = 8;

/// Size of a link-layer address.
pub const LINK_ADDRESS_SIZE: usize = 6;

// ============================================
// DeviceId
// ============================================

/// 8-byte device identifier.
///
/// # Example
/// ```
/// use bondlink_common::types::DeviceId;
///
/// let id = DeviceId::from(0x1u64);
/// assert_eq!(id.as_bytes()[0], 1);
/// assert_eq!(id.as_u64(), 1);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DeviceId([u8; DEVICE_ID_SIZE]);

impl DeviceId {
    /// Creates an identifier from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; DEVICE_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DEVICE_ID_SIZE] {
        &self.0
    }

    /// Returns the identifier as an integer (little-endian).
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    /// The all-zero identifier, never valid for a configured device.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        self.as_u64() == 0
    }
}

impl From<u64> for DeviceId {
    fn from(value: u64) -> Self {
        Self(value.to_le_bytes())
    }
}

impl From<DeviceId> for u64 {
    fn from(id: DeviceId) -> Self {
        id.as_u64()
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({:#x})", self.as_u64())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.as_u64())
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.as_u64())
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Self::from)
    }
}

// ============================================
// LinkAddress
// ============================================

/// Link-layer address of a peer (colon-separated hex in text form).
///
/// # Example
/// ```
/// use bondlink_common::types::LinkAddress;
///
/// let addr: LinkAddress = "c0:ff:ee:00:00:01".parse().unwrap();
/// assert_eq!(addr.to_string(), "c0:ff:ee:00:00:01");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LinkAddress([u8; LINK_ADDRESS_SIZE]);

impl LinkAddress {
    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; LINK_ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn octets(&self) -> [u8; LINK_ADDRESS_SIZE] {
        self.0
    }
}

impl fmt::Debug for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkAddress({self})")
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|b| hex::encode([*b])).collect();
        f.write_str(&parts.join(":"))
    }
}

impl FromStr for LinkAddress {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; LINK_ADDRESS_SIZE];
        let mut count = 0;
        for part in s.split(':') {
            if count == LINK_ADDRESS_SIZE || part.len() != 2 {
                return Err(CommonError::parse("LinkAddress", s));
            }
            bytes[count] =
                u8::from_str_radix(part, 16).map_err(|_| CommonError::parse("LinkAddress", s))?;
            count += 1;
        }
        if count != LINK_ADDRESS_SIZE {
            return Err(CommonError::parse("LinkAddress", s));
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; LINK_ADDRESS_SIZE]> for LinkAddress {
    fn from(bytes: [u8; LINK_ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }
}

impl Serialize for LinkAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LinkAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// SequenceNumber
// ============================================

/// 32-bit frame sequence number.
///
/// Sequence numbers form a plain total order; `next` stops at `u32::MAX`
/// instead of wrapping back below the replay floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceNumber(u32);

impl SequenceNumber {
    /// Wraps a raw value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns the following sequence number, or `None` when exhausted.
    #[must_use]
    pub const fn next(&self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checks if this sequence is strictly newer than `other`.
    #[must_use]
    pub const fn is_newer_than(&self, other: &Self) -> bool {
        self.0 > other.0
    }
}

impl From<u32> for SequenceNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<SequenceNumber> for u32 {
    fn from(seq: SequenceNumber) -> Self {
        seq.0
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================
// Tests
// ============================================
