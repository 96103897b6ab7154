//! Pool-specific error types.

use thiserror::Error;

/// Errors that can occur during pool operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every slot is live and the pool may not grow.
    #[error("pool exhausted: all {capacity} slots are live")]
    Exhausted {
        /// Number of slots in the pool.
        capacity: usize,
    },
    /// A handle whose slot has been freed (and possibly reused) since it was issued.
    #[error("stale handle: slot {index} generation {handle_generation}, current {slot_generation}")]
    StaleHandle {
        /// Slot index encoded in the handle.
        index: u32,
        /// Generation encoded in the handle.
        handle_generation: u32,
        /// Current generation of the slot.
        slot_generation: u32,
    },
    /// A handle pointing past the end of the pool.
    #[error("slot {index} out of bounds (capacity {capacity})")]
    OutOfBounds {
        /// Slot index encoded in the handle.
        index: u32,
        /// Number of slots in the pool.
        capacity: usize,
    },
    /// The pool configuration failed validation.
    #[error("invalid pool config: {reason}")]
    InvalidConfig {
        /// Which invariant was violated.
        reason: String,
    },
}
