//! Generational slot handles.
//!
//! A [`SlotHandle`] names one slot of one pool at one point in time. The
//! `generation` is bumped each time the slot is freed, so a handle that
//! outlives its allocation no longer matches and is rejected in O(1).

use std::fmt;

/// Index + generation reference to a pool slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct SlotHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl SlotHandle {
    /// Create a handle from its parts.
    ///
    /// Handles built this way are validated by the pool like any other.
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index within the pool.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack into a single `u64` (generation high, index low).
    pub fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Unpack a value produced by [`to_bits`](Self::to_bits).
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot(idx={}, gen={})", self.index, self.generation)
    }
}
