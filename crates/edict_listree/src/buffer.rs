//! Leaf buffers and kind markers.
//!
//! A buffer's ownership is fixed when it is constructed: an owned (or
//! duplicated) copy, a borrowed view into a shared allocation such as a code
//! buffer, or a static slice that is never freed.

use std::fmt;
use std::ops::{BitOr, BitOrAssign, Range};
use std::sync::Arc;

/// Bytes held by a leaf node.
#[derive(Clone)]
pub enum Buffer {
    /// Bytes owned by the node, either handed over or duplicated.
    Owned(Vec<u8>),
    /// A borrowed window into a shared allocation.
    View {
        /// The shared allocation.
        data: Arc<[u8]>,
        /// The window.
        range: Range<usize>,
    },
    /// Static bytes; never released.
    Static(&'static [u8]),
}

impl Buffer {
    /// Duplicates `bytes` into an owned buffer.
    #[must_use]
    pub fn duplicate(bytes: &[u8]) -> Self {
        Self::Owned(bytes.to_vec())
    }

    /// Creates a view, clamping the range to the allocation.
    #[must_use]
    pub fn view(data: Arc<[u8]>, range: Range<usize>) -> Self {
        let end = range.end.min(data.len());
        let start = range.start.min(end);
        Self::View {
            data,
            range: start..end,
        }
    }

    /// Returns the bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Owned(v) => v,
            Self::View { data, range } => &data[range.clone()],
            Self::Static(s) => s,
        }
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true for a zero-length buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the bytes are borrowed rather than owned.
    #[must_use]
    pub const fn is_borrowed(&self) -> bool {
        !matches!(self, Self::Owned(_))
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::Static(b"")
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Kind markers carried by a node.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Kind(u8);

impl Kind {
    /// No markers: plain text leaf or container.
    pub const NONE: Kind = Kind(0);
    /// Arbitrary binary payload.
    pub const BINARY: Kind = Kind(0x01);
    /// Compiled bytecode.
    pub const CODE: Kind = Kind(0x02);
    /// Wraps a native variable.
    pub const NATIVE: Kind = Kind(0x04);
    /// A list of path references.
    pub const REFS: Kind = Kind(0x08);
    /// The null value; placeholders carry this marker.
    pub const NULL: Kind = Kind(0x10);
    /// Evaluated as soon as it is dereferenced.
    pub const IMMEDIATE: Kind = Kind(0x20);

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Builds a kind from raw bits, dropping unknown ones.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x3f)
    }

    /// Returns true if every marker in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Kind) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns a copy with the markers in `other` cleared.
    #[must_use]
    pub const fn without(self, other: Kind) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for Kind {
    type Output = Kind;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Kind {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Kind, &str); 6] = [
            (Kind::BINARY, "binary"),
            (Kind::CODE, "code"),
            (Kind::NATIVE, "native"),
            (Kind::REFS, "refs"),
            (Kind::NULL, "null"),
            (Kind::IMMEDIATE, "immediate"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(k, _)| self.contains(*k))
            .map(|(_, n)| *n)
            .collect();
        write!(f, "Kind({})", set.join("|"))
    }
}
