//! Benchmark profiles for the Stowage entity storage layer.
//!
//! - [`list_profile`]: one list-backed type sized for `capacity` entities.
//! - [`tree_profile`]: one tree-backed type sized for `capacity` entities.
//! - [`populate`]: fill a type with entities, returning their handles.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use stowage_arena::Growth;
use stowage_core::{EntityTypeId, TopologyKind};
use stowage_registry::{Handle, Registry, RegistryError, TypeRegistration};

/// Type id used by [`list_profile`].
pub const LIST_TYPE: EntityTypeId = EntityTypeId(1);

/// Type id used by [`tree_profile`].
pub const TREE_TYPE: EntityTypeId = EntityTypeId(2);

/// Payload size of the benchmark types, in bytes.
pub const RECORD_SIZE: usize = 64;

/// Registry with [`LIST_TYPE`] registered, fixed at `capacity` entities.
pub fn list_profile(capacity: u32) -> Result<Registry, RegistryError> {
    let mut registry = Registry::default();
    registry.register(
        TypeRegistration::new(LIST_TYPE, TopologyKind::List, RECORD_SIZE)
            .with_name("bench-list")
            .with_capacity(capacity)
            .with_growth(Growth::Fixed),
    )?;
    Ok(registry)
}

/// Registry with [`TREE_TYPE`] registered, fixed at `capacity` entities.
pub fn tree_profile(capacity: u32) -> Result<Registry, RegistryError> {
    let mut registry = Registry::default();
    registry.register(
        TypeRegistration::new(TREE_TYPE, TopologyKind::Tree, RECORD_SIZE)
            .with_name("bench-tree")
            .with_capacity(capacity)
            .with_growth(Growth::Fixed),
    )?;
    Ok(registry)
}

/// Create `count` entities of `type_id`.
pub fn populate(
    registry: &mut Registry,
    type_id: EntityTypeId,
    count: usize,
) -> Result<Vec<Handle>, RegistryError> {
    (0..count).map(|_| registry.create(type_id)).collect()
}
