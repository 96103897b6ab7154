//! Stowage: typed entity storage over arena pools.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Stowage sub-crates. For most users, adding `stowage` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use stowage::prelude::*;
//!
//! let mut registry = Registry::default();
//! registry
//!     .register(
//!         TypeRegistration::new(EntityTypeId(7), TopologyKind::Tree, 16)
//!             .with_name("scene-node")
//!             .with_update(|args: UpdateArgs<'_>| {
//!                 args.payload[0] = args.payload[0].wrapping_add(1);
//!                 Ok(())
//!             }),
//!     )
//!     .unwrap();
//!
//! // The first entity becomes the root; later ones attach under it.
//! let root = registry.create(EntityTypeId(7)).unwrap();
//! let a = registry.create(EntityTypeId(7)).unwrap();
//! let b = registry.create(EntityTypeId(7)).unwrap();
//! registry.set_parent(b, a).unwrap();
//! assert_eq!(registry.parent(b).unwrap(), Some(a));
//!
//! // Reparenting a node under its own descendant is rejected.
//! assert!(registry.set_parent(root, b).is_err());
//! assert_eq!(registry.parent(root).unwrap(), None);
//!
//! registry.update(b, Some(a), &ClockInfo::default()).unwrap();
//! assert_eq!(registry.payload(b).unwrap()[0], 1);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `stowage-core` | Type IDs, tags, topology kinds, clock info |
//! | [`arena`] | `stowage-arena` | Generational slot pools and record pools |
//! | [`topology`] | `stowage-topology` | Intrusive doubly linked list and n-ary tree |
//! | [`registry`] | `stowage-registry` | Type registration, entity handles, lifecycle |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core identifiers and value types (`stowage-core`).
pub use stowage_core as types;

/// Generational pools (`stowage-arena`).
///
/// [`arena::Pool`] stores typed values; [`arena::RecordPool`] stores a
/// header plus a fixed-size byte payload per slot.
pub use stowage_arena as arena;

/// List and tree topologies (`stowage-topology`).
///
/// Both own their node pool and reject nodes from other instances.
/// [`topology::Tree::move_as_child`] refuses moves that would form a cycle.
pub use stowage_topology as topology;

/// The entity storage registry (`stowage-registry`).
pub use stowage_registry as registry;

/// Common imports for typical Stowage usage.
///
/// ```rust
/// use stowage::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use stowage_core::{ClockInfo, EntityTypeId, MemoryClass, TopologyKind};

    // Pools
    pub use stowage_arena::{Growth, PoolError};

    // Topology
    pub use stowage_topology::TopologyError;

    // Registry
    pub use stowage_registry::{
        Handle, Registry, RegistryConfig, RegistryError, StorageMetrics, TypeRegistration,
        UpdateArgs, UpdateError,
    };
}
