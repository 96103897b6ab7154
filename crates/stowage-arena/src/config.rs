//! Pool configuration parameters.

use stowage_core::MemoryClass;

use crate::error::PoolError;

/// What a pool does when every slot is live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Growth {
    /// Refuse the allocation with [`PoolError::Exhausted`].
    #[default]
    Fixed,
    /// Append this many fresh slots and retry.
    Chunked(u32),
}

/// Configuration for a [`Pool`](crate::Pool) or [`RecordPool`](crate::RecordPool).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of slots allocated up front.
    ///
    /// Default: 32. Must be at least 1.
    pub capacity: u32,

    /// Behaviour once all slots are live. Default: [`Growth::Fixed`].
    pub growth: Growth,

    /// Memory class the pool is accounted against.
    pub memory_class: MemoryClass,
}

impl PoolConfig {
    /// Default number of slots per pool.
    pub const DEFAULT_CAPACITY: u32 = 32;

    /// Upper bound on the number of slots a pool may ever hold.
    ///
    /// Leaves headroom in the `u32` slot index space.
    pub const MAX_SLOTS: u32 = 1 << 30;

    /// Fixed-capacity config with the given slot count.
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            growth: Growth::Fixed,
            memory_class: MemoryClass::Main,
        }
    }

    /// Growable config: `capacity` slots up front, `chunk` more on each exhaustion.
    pub fn growable(capacity: u32, chunk: u32) -> Self {
        Self {
            growth: Growth::Chunked(chunk),
            ..Self::new(capacity)
        }
    }

    /// Same config, accounted against another memory class.
    pub fn with_memory_class(mut self, memory_class: MemoryClass) -> Self {
        self.memory_class = memory_class;
        self
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.capacity == 0 {
            return Err(PoolError::InvalidConfig {
                reason: "capacity must be at least 1".into(),
            });
        }
        if self.capacity > Self::MAX_SLOTS {
            return Err(PoolError::InvalidConfig {
                reason: format!(
                    "capacity {} exceeds maximum of {}",
                    self.capacity,
                    Self::MAX_SLOTS
                ),
            });
        }
        if self.growth == Growth::Chunked(0) {
            return Err(PoolError::InvalidConfig {
                reason: "growth chunk must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
