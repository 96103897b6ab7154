//! Test utilities for Stowage development.
//!
//! Provides pre-registered fixture registries, a counting update callback,
//! a tree invariant checker, and a tracing subscriber that writes through
//! the test harness.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod invariants;

use tracing_subscriber::EnvFilter;

pub use fixtures::{chain, node_registry, widget_registry, CountingUpdate, NODE, WIDGET};
pub use invariants::check_tree;

/// Install a subscriber that routes `tracing` output to the test harness.
///
/// Honors `RUST_LOG`; defaults to `warn`. Safe to call from every test:
/// only the first call installs anything.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
