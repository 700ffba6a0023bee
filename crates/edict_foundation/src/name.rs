//! Byte-string names with a cached comparison prefix.
//!
//! Names key the entries of map-mode nodes. Comparison checks the first two
//! bytes (packed big-endian, zero padded) before falling back to a full
//! length-aware comparison; the combined order is plain lexicographic byte
//! order.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

/// A name: raw bytes plus a cached 2-byte prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Name {
    bytes: SmallVec<[u8; 24]>,
    prefix: u16,
}

/// Packs the first two bytes of `bytes` big-endian, zero padded.
#[must_use]
pub fn prefix_of(bytes: &[u8]) -> u16 {
    let hi = bytes.first().copied().unwrap_or(0);
    let lo = bytes.get(1).copied().unwrap_or(0);
    u16::from_be_bytes([hi, lo])
}

/// Compares raw names using the prefix precheck.
#[must_use]
pub fn compare(a_prefix: u16, a: &[u8], b_prefix: u16, b: &[u8]) -> Ordering {
    a_prefix.cmp(&b_prefix).then_with(|| a.cmp(b))
}

impl Name {
    /// Creates a name from raw bytes.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: SmallVec::from_slice(bytes),
            prefix: prefix_of(bytes),
        }
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the cached prefix.
    #[must_use]
    pub const fn prefix(&self) -> u16 {
        self.prefix
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for the empty name.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Compares this name against raw bytes.
    #[must_use]
    pub fn compare_bytes(&self, other: &[u8]) -> Ordering {
        compare(self.prefix, &self.bytes, prefix_of(other), other)
    }

    /// Returns the name as text, replacing invalid UTF-8.
    #[must_use]
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self.prefix, &self.bytes, other.prefix, &other.bytes)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<&[u8]> for Name {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.to_text())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
