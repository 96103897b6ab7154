//! Type-erased entity storage for Stowage.
//!
//! Client modules register an entity type once, binding its type id to a
//! topology (list or tree), a record size, and optionally an update
//! callback. The [`Registry`] then creates, deletes, updates, and navigates
//! entities of that type through opaque [`Handle`]s.
//!
//! # Architecture
//!
//! ```text
//! Registry
//! └── TypeStorage (one per registered type id)
//!     ├── RecordPool<EntityHeader>   (tag, node, ref count, flags + payload)
//!     ├── List<SlotHandle> | Tree<SlotHandle>   (nodes point at records)
//!     └── Option<UpdateFn>
//! ```
//!
//! # Handle validation
//!
//! Every call that takes a [`Handle`] decodes its type tag, looks up the
//! storage, checks the registration epoch and the record's generation, and
//! compares the record's stored tag with the handle's. Any mismatch is
//! reported as a [`RegistryError`] and logged; no storage is touched.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod entity;
pub mod error;
pub mod metrics;
pub mod registry;
mod storage;
pub mod update;

// Public re-exports for the primary API surface.
pub use config::{ConfigError, RegistryConfig, TypeRegistration};
pub use entity::Handle;
pub use error::RegistryError;
pub use metrics::StorageMetrics;
pub use registry::Registry;
pub use update::{UpdateArgs, UpdateError, UpdateFn};
