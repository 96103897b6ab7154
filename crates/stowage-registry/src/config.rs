//! Registry configuration, type registrations, and their validation.

use std::fmt;

use stowage_arena::{Growth, PoolConfig, PoolError};
use stowage_core::{EntityTypeId, MemoryClass, TopologyKind};
use thiserror::Error;

use crate::update::{UpdateArgs, UpdateError, UpdateFn};

// ── RegistryConfig ─────────────────────────────────────────────────

/// Registry-wide limits and per-type defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Type ids must be below this bound. Default: 256.
    pub max_types: usize,
    /// Pool capacity for types that do not set their own. Default: 32.
    pub default_capacity: u32,
    /// Growth policy for types that do not set their own. Default: fixed.
    pub default_growth: Growth,
}

impl RegistryConfig {
    /// Default bound on type ids.
    pub const DEFAULT_MAX_TYPES: usize = 256;

    /// Largest accepted `max_types`: one past the highest 16-bit type id.
    pub const MAX_TYPES_LIMIT: usize = u16::MAX as usize + 1;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_types == 0 || self.max_types > Self::MAX_TYPES_LIMIT {
            return Err(ConfigError::InvalidMaxTypes {
                max_types: self.max_types,
            });
        }
        PoolConfig {
            capacity: self.default_capacity,
            growth: self.default_growth,
            memory_class: MemoryClass::Main,
        }
        .validate()?;
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_types: Self::DEFAULT_MAX_TYPES,
            default_capacity: PoolConfig::DEFAULT_CAPACITY,
            default_growth: Growth::Fixed,
        }
    }
}

// ── TypeRegistration ───────────────────────────────────────────────

/// Everything needed to bind a type id to a storage.
///
/// ```
/// use stowage_core::{EntityTypeId, TopologyKind};
/// use stowage_registry::TypeRegistration;
///
/// let widget = TypeRegistration::new(EntityTypeId(1), TopologyKind::List, 64)
///     .with_name("widget")
///     .with_capacity(4);
/// assert_eq!(widget.record_size(), 64);
/// ```
pub struct TypeRegistration {
    pub(crate) type_id: EntityTypeId,
    pub(crate) name: Option<String>,
    pub(crate) kind: TopologyKind,
    pub(crate) memory_class: MemoryClass,
    pub(crate) record_size: usize,
    pub(crate) capacity: Option<u32>,
    pub(crate) growth: Option<Growth>,
    pub(crate) update: Option<UpdateFn>,
}

impl TypeRegistration {
    /// Registration with the registry's default capacity and growth, in
    /// [`MemoryClass::Main`], without an update callback.
    pub fn new(type_id: EntityTypeId, kind: TopologyKind, record_size: usize) -> Self {
        Self {
            type_id,
            name: None,
            kind,
            memory_class: MemoryClass::Main,
            record_size,
            capacity: None,
            growth: None,
            update: None,
        }
    }

    /// Human-readable name used in log events.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Account the type's pools against `memory_class`.
    pub fn with_memory_class(mut self, memory_class: MemoryClass) -> Self {
        self.memory_class = memory_class;
        self
    }

    /// Override the registry's default capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Override the registry's default growth policy.
    pub fn with_growth(mut self, growth: Growth) -> Self {
        self.growth = Some(growth);
        self
    }

    /// Install the per-entity update callback.
    pub fn with_update<F>(mut self, update: F) -> Self
    where
        F: FnMut(UpdateArgs<'_>) -> Result<(), UpdateError> + 'static,
    {
        self.update = Some(Box::new(update));
        self
    }

    /// The type id being registered.
    pub fn type_id(&self) -> EntityTypeId {
        self.type_id
    }

    /// The topology entities of this type are linked into.
    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    /// Payload size of every entity, in bytes.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Pool configuration after applying the registry's defaults.
    pub fn pool_config(&self, defaults: &RegistryConfig) -> PoolConfig {
        PoolConfig {
            capacity: self.capacity.unwrap_or(defaults.default_capacity),
            growth: self.growth.unwrap_or(defaults.default_growth),
            memory_class: self.memory_class,
        }
    }

    /// Check this registration against the registry's limits.
    pub fn validate(&self, defaults: &RegistryConfig) -> Result<(), ConfigError> {
        if self.type_id.index() >= defaults.max_types {
            return Err(ConfigError::TypeIdOutOfRange {
                type_id: self.type_id,
                max_types: defaults.max_types,
            });
        }
        if self.record_size == 0 {
            return Err(ConfigError::ZeroRecordSize {
                type_id: self.type_id,
            });
        }
        self.pool_config(defaults).validate()?;
        Ok(())
    }
}

impl fmt::Debug for TypeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistration")
            .field("type_id", &self.type_id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("memory_class", &self.memory_class)
            .field("record_size", &self.record_size)
            .field("capacity", &self.capacity)
            .field("growth", &self.growth)
            .field("has_update", &self.update.is_some())
            .finish()
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a [`RegistryConfig`] or
/// [`TypeRegistration`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `max_types` is zero or exceeds the 16-bit type id space.
    #[error("max_types must be in 1..={}, got {max_types}", RegistryConfig::MAX_TYPES_LIMIT)]
    InvalidMaxTypes {
        /// The configured value.
        max_types: usize,
    },
    /// The type id is not below the registry's `max_types`.
    #[error("type id {type_id} out of range (max_types {max_types})")]
    TypeIdOutOfRange {
        /// The rejected type id.
        type_id: EntityTypeId,
        /// The registry's bound.
        max_types: usize,
    },
    /// Records must hold at least one byte.
    #[error("type {type_id}: record size must be at least 1 byte")]
    ZeroRecordSize {
        /// The rejected type id.
        type_id: EntityTypeId,
    },
    /// The resulting pool configuration is invalid.
    #[error(transparent)]
    Pool(#[from] PoolError),
}
