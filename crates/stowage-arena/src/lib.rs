//! Fixed-capacity generational pools for Stowage.
//!
//! Provides O(1) allocate/free of same-sized records with generation
//! tracking, so that handles to freed slots are detected instead of
//! silently aliasing a reused slot.
//!
//! # Architecture
//!
//! ```text
//! RecordPool<H> (entity records: header + fixed-size byte payload)
//! ├── Pool<H>   (generational slots + LIFO free list)
//! └── Vec<u8>   (payload bytes, `record_size` stride, zero-filled on alloc)
//! ```
//!
//! # Growth policy
//!
//! - **Fixed:** allocation fails with [`PoolError::Exhausted`] once every
//!   slot is live.
//! - **Chunked(n):** the pool appends `n` fresh slots when exhausted.
//!
//! Freed slots are reused before fresh ones, most recently freed first.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handle;
pub mod pool;
pub mod record;

// Public re-exports for the primary API surface.
pub use config::{Growth, PoolConfig};
pub use error::PoolError;
pub use handle::SlotHandle;
pub use pool::Pool;
pub use record::RecordPool;
