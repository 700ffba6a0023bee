//! Dispatch state flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// The VM state bitmask.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct VmState(u8);

impl VmState {
    /// Nothing set.
    pub const NONE: VmState = VmState(0);
    /// A code frame finished.
    pub const YIELD: VmState = VmState(0x01);
    /// Skipping a region that was not entered.
    pub const BYPASS: VmState = VmState(0x02);
    /// An exception is in flight.
    pub const THROWING: VmState = VmState(0x04);
    /// The code stack is empty.
    pub const COMPLETE: VmState = VmState(0x08);
    /// Execution stopped on a fatal error.
    pub const ERROR: VmState = VmState(0x10);

    /// Returns true if every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: VmState) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if any flag in `other` is set.
    #[must_use]
    pub const fn intersects(self, other: VmState) -> bool {
        self.0 & other.0 != 0
    }

    /// Sets the flags in `other`.
    pub fn insert(&mut self, other: VmState) {
        self.0 |= other.0;
    }

    /// Clears the flags in `other`.
    pub fn remove(&mut self, other: VmState) {
        self.0 &= !other.0;
    }

    /// Returns true while opcodes are being skipped.
    #[must_use]
    pub const fn is_skipping(self) -> bool {
        self.intersects(VmState(Self::BYPASS.0 | Self::THROWING.0))
    }
}

impl BitOr for VmState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for VmState {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::YIELD, "YIELD"),
            (Self::BYPASS, "BYPASS"),
            (Self::THROWING, "THROWING"),
            (Self::COMPLETE, "COMPLETE"),
            (Self::ERROR, "ERROR"),
        ];
        let set: Vec<_> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            f.write_str("VmState(NONE)")
        } else {
            write!(f, "VmState({})", set.join(" | "))
        }
    }
}
