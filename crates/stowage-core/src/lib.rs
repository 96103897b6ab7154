//! Core types for the Stowage entity storage layer.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! identifiers and small value types shared by the pool, topology, and
//! registry crates: entity type IDs, type tags, topology kinds, memory
//! classes, and the clock information handed to update callbacks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod id;
pub mod kind;
pub mod tag;

pub use clock::ClockInfo;
pub use id::{EntityTypeId, TickId};
pub use kind::{MemoryClass, TopologyKind};
pub use tag::TypeTag;
