//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a registered entity type (camera, body, font, ...).
///
/// Type IDs are chosen by client modules and bound to a storage at
/// registration time. The ID space is 16 bits wide so that an ID fits in
/// the low half of a [`TypeTag`](crate::TypeTag).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityTypeId(pub u16);

impl EntityTypeId {
    /// Position of this ID in a dense per-type table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for EntityTypeId {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

/// Monotonically increasing tick counter.
///
/// Incremented by the owning clock each time the simulation advances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
