//! # Overlay Identifiers
//!
//! Peers and resources share one identifier space: an unsigned, fixed-width,
//! big-endian integer. `Identifier<N>` carries the arithmetic the overlay
//! needs (ordering, wrapping addition, shifts) and `NodeId` / `ResourceId`
//! are distinct newtypes over the overlay-wide width so the two can never be
//! swapped by accident.

use crate::errors::IdentifierError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::{Shl, Shr};

/// Width in bytes of node and resource identifiers in this overlay (128 bits).
pub const ID_LEN: usize = 16;

/// Unsigned big-endian integer of `N` bytes.
///
/// Byte-wise lexicographic ordering of a big-endian array is numeric
/// ordering, so the derived `Ord` is the arithmetic one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier<const N: usize>([u8; N]);

impl<const N: usize> Identifier<N> {
    /// Number of bits in this identifier.
    pub const BITS: u32 = (N * 8) as u32;

    /// The all-zero identifier.
    pub const MIN: Self = Self([0u8; N]);

    /// The all-ones identifier.
    pub const MAX: Self = Self([0xffu8; N]);

    /// Wrap raw big-endian bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, failing if the length is not exactly `N`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentifierError> {
        let array: [u8; N] = bytes
            .try_into()
            .map_err(|_| IdentifierError::InvalidLength {
                expected: N,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Right-aligned conversion from a `u64`.
    ///
    /// Bytes that do not fit in `N` are dropped from the top.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        let mut out = [0u8; N];
        let src = value.to_be_bytes();
        let count = N.min(8);
        out[N - count..].copy_from_slice(&src[8 - count..]);
        Self(out)
    }

    /// Parse from a hexadecimal string of exactly `2 * N` digits.
    pub fn from_hex(s: &str) -> Result<Self, IdentifierError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| IdentifierError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Lowercase hexadecimal rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Borrow the big-endian bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// The least significant 64 bits.
    #[must_use]
    pub fn low_u64(&self) -> u64 {
        let mut buf = [0u8; 8];
        let count = N.min(8);
        buf[8 - count..].copy_from_slice(&self.0[N - count..]);
        u64::from_be_bytes(buf)
    }

    /// Addition modulo `2^BITS`.
    #[must_use]
    pub fn wrapping_add(&self, other: &Self) -> Self {
        self.add_with_carry(other).0
    }

    /// Addition that fails on overflow.
    #[must_use]
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        match self.add_with_carry(other) {
            (sum, false) => Some(sum),
            (_, true) => None,
        }
    }

    fn add_with_carry(&self, other: &Self) -> (Self, bool) {
        let mut out = [0u8; N];
        let mut carry = 0u16;
        for i in (0..N).rev() {
            let sum = u16::from(self.0[i]) + u16::from(other.0[i]) + carry;
            out[i] = (sum & 0xff) as u8;
            carry = sum >> 8;
        }
        (Self(out), carry != 0)
    }
}

impl<const N: usize> Shr<u32> for Identifier<N> {
    type Output = Self;

    fn shr(self, shift: u32) -> Self {
        if shift >= Self::BITS {
            return Self::MIN;
        }
        let byte_shift = (shift / 8) as usize;
        let bit_shift = shift % 8;
        let mut out = [0u8; N];
        for i in byte_shift..N {
            let src = i - byte_shift;
            let mut v = self.0[src] >> bit_shift;
            if bit_shift > 0 && src > 0 {
                v |= self.0[src - 1] << (8 - bit_shift);
            }
            out[i] = v;
        }
        Self(out)
    }
}

impl<const N: usize> Shl<u32> for Identifier<N> {
    type Output = Self;

    fn shl(self, shift: u32) -> Self {
        if shift >= Self::BITS {
            return Self::MIN;
        }
        let byte_shift = (shift / 8) as usize;
        let bit_shift = shift % 8;
        let mut out = [0u8; N];
        for i in 0..N - byte_shift {
            let src = i + byte_shift;
            let mut v = self.0[src] << bit_shift;
            if bit_shift > 0 && src + 1 < N {
                v |= self.0[src + 1] >> (8 - bit_shift);
            }
            out[i] = v;
        }
        Self(out)
    }
}

impl<const N: usize> fmt::Debug for Identifier<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl<const N: usize> fmt::Display for Identifier<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// =============================================================================
// NEWTYPES
// =============================================================================

/// Overlay-wide identifier width.
pub type OverlayIdentifier = Identifier<ID_LEN>;

/// Identity of a peer on the ring.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub OverlayIdentifier);

/// Identity of a stored resource, in the same space as `NodeId`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub OverlayIdentifier);

impl NodeId {
    /// Wrap raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Self(Identifier::from_bytes(bytes))
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self, IdentifierError> {
        Identifier::from_hex(s).map(Self)
    }

    /// Build from a slice of exactly `ID_LEN` bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentifierError> {
        Identifier::from_slice(bytes).map(Self)
    }

    /// The underlying integer.
    #[must_use]
    pub fn as_identifier(&self) -> &OverlayIdentifier {
        &self.0
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        self.0.as_bytes()
    }
}

impl ResourceId {
    /// Wrap raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Self(Identifier::from_bytes(bytes))
    }

    /// Derive the resource id for a resource name: SHA-256 truncated to the
    /// overlay id width.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut bytes = [0u8; ID_LEN];
        bytes.copy_from_slice(&digest[..ID_LEN]);
        Self::new(bytes)
    }

    /// Build from a slice of exactly `ID_LEN` bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentifierError> {
        Identifier::from_slice(bytes).map(Self)
    }

    /// The underlying integer.
    #[must_use]
    pub fn as_identifier(&self) -> &OverlayIdentifier {
        &self.0
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Id2 = Identifier<2>;

    #[test]
    fn test_ordering_is_numeric() {
        let a = Id2::from_u64(0x00ff);
        let b = Id2::from_u64(0x0100);
        assert!(a < b);
        assert!(Id2::MIN < a);
        assert!(b < Id2::MAX);
    }

    #[test]
    fn test_shifts_cross_byte_boundaries() {
        let id = Id2::from_u64(0b1011_0000_0000_0001);
        assert_eq!((id >> 3).low_u64(), 0b0001_0110_0000_0000);
        assert_eq!((id << 4).low_u64(), 0b0000_0000_0001_0000);
        assert_eq!(Id2::MAX >> 16, Id2::MIN);
        assert_eq!((Id2::MAX >> 1).low_u64(), 0x7fff);
    }

    #[test]
    fn test_addition_carries_and_wraps() {
        let a = Id2::from_u64(0x00ff);
        assert_eq!(a.wrapping_add(&Id2::from_u64(1)).low_u64(), 0x0100);
        assert_eq!(Id2::MAX.wrapping_add(&Id2::from_u64(1)), Id2::MIN);
        assert!(Id2::MAX.checked_add(&Id2::from_u64(1)).is_none());
    }

    #[test]
    fn test_hex_requires_exact_width() {
        let id = NodeId::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(id.as_bytes()[15], 0x0f);
        assert!(matches!(
            NodeId::from_hex("0001"),
            Err(IdentifierError::InvalidLength { expected: 16, actual: 2 })
        ));
        assert!(matches!(
            NodeId::from_hex("zz"),
            Err(IdentifierError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_resource_name_hash_is_stable() {
        let a = ResourceId::from_name("alice@example.com");
        let b = ResourceId::from_name("alice@example.com");
        let c = ResourceId::from_name("bob@example.com");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
