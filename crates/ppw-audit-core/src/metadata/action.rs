//! Audit action masks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitmask of write operations that produce audit rows.
///
/// On an entity it states which operations are audited. On a property it
/// states the operations for which that property is excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AuditLogAction(u8);

impl AuditLogAction {
    /// No operation.
    pub const NONE: Self = Self(0);
    /// Entity creation.
    pub const CREATE: Self = Self(0b001);
    /// Entity modification.
    pub const UPDATE: Self = Self(0b010);
    /// Entity removal.
    pub const DELETE: Self = Self(0b100);
    /// Every operation.
    pub const ALL: Self = Self(0b111);

    /// Raw bits of the mask.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build a mask from raw bits, dropping unknown bits.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Check that every bit of `other` is set. `NONE` is never contained.
    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Check whether the mask is empty.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for AuditLogAction {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AuditLogAction {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for AuditLogAction {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for AuditLogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "NONE");
        }
        let names = [
            (Self::CREATE, "CREATE"),
            (Self::UPDATE, "UPDATE"),
            (Self::DELETE, "DELETE"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}
