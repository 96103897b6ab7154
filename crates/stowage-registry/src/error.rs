//! Registry error types.

use stowage_arena::PoolError;
use stowage_core::{EntityTypeId, TopologyKind, TypeTag};
use stowage_topology::TopologyError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::entity::Handle;
use crate::update::UpdateError;

/// Errors returned by [`Registry`](crate::Registry) operations.
///
/// A failed call leaves the structure of the registry unchanged: no entity
/// is created, deleted or relinked. Statistics counters still record the
/// attempt, and payload writes made by a failing update callback are kept.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No storage is registered under the type id.
    #[error("type {type_id} is not registered")]
    InvalidType {
        /// The unknown type id.
        type_id: EntityTypeId,
    },
    /// The handle's tag does not carry the magic validator.
    #[error("handle carries a malformed {tag}")]
    InvalidTag {
        /// The malformed tag.
        tag: TypeTag,
    },
    /// The handle's record has been deleted.
    #[error("{handle} is stale: {source}")]
    StaleHandle {
        /// The offending handle.
        handle: Handle,
        /// Why the record lookup failed.
        #[source]
        source: PoolError,
    },
    /// The handle predates the current registration of its type.
    #[error("{handle} was issued before type {type_id} was re-registered")]
    ExpiredHandle {
        /// The offending handle.
        handle: Handle,
        /// The handle's type.
        type_id: EntityTypeId,
    },
    /// The record's stored tag disagrees with the handle's tag.
    #[error("{handle} names a record tagged {found}")]
    TagMismatch {
        /// The offending handle.
        handle: Handle,
        /// The tag found in the record header.
        found: TypeTag,
    },
    /// The type id already has a storage.
    #[error("type {type_id} is already registered")]
    AlreadyRegistered {
        /// The duplicate type id.
        type_id: EntityTypeId,
    },
    /// The entity has no storage node.
    #[error("{handle} is not linked into its storage")]
    Unlinked {
        /// The offending handle.
        handle: Handle,
    },
    /// A list accessor was used on a tree-backed type or vice versa.
    #[error("type {type_id} is {actual}-backed; operation needs a {expected}")]
    TopologyMismatch {
        /// The type the call was made against.
        type_id: EntityTypeId,
        /// Topology the operation works on.
        expected: TopologyKind,
        /// Topology the type is registered with.
        actual: TopologyKind,
    },
    /// Two handles that must share a type do not.
    #[error("{handle} and {other} are of different types")]
    CrossType {
        /// The entity being operated on.
        handle: Handle,
        /// The entity it was related to.
        other: Handle,
    },
    /// The type has no update callback.
    #[error("type {type_id} has no update function")]
    NoUpdateFunction {
        /// The type without a callback.
        type_id: EntityTypeId,
    },
    /// The entity still has outstanding references.
    #[error("{handle} still has {count} references")]
    StillReferenced {
        /// The referenced entity.
        handle: Handle,
        /// Outstanding reference count.
        count: u32,
    },
    /// Reference count would drop below zero.
    #[error("{handle} has no references to release")]
    RefCountUnderflow {
        /// The offending handle.
        handle: Handle,
    },
    /// Record pool failure.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// Topology failure.
    #[error(transparent)]
    Topology(#[from] TopologyError),
    /// Invalid configuration or registration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The update callback reported failure.
    #[error(transparent)]
    Update(#[from] UpdateError),
}
