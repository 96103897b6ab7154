//! Reusable registry fixtures.
//!
//! - [`widget_registry`]: list-backed `WIDGET` type with a fixed capacity.
//! - [`node_registry`]: tree-backed `NODE` type.
//! - [`CountingUpdate`]: update callback that counts invocations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stowage_core::{EntityTypeId, TopologyKind};
use stowage_registry::{Handle, Registry, TypeRegistration, UpdateArgs, UpdateError};

/// Type id of the list-backed fixture type.
pub const WIDGET: EntityTypeId = EntityTypeId(1);

/// Type id of the tree-backed fixture type.
pub const NODE: EntityTypeId = EntityTypeId(2);

/// Registry with `WIDGET` registered as a list of `capacity` 16-byte records.
pub fn widget_registry(capacity: u32) -> Registry {
    let mut registry = Registry::default();
    registry
        .register(
            TypeRegistration::new(WIDGET, TopologyKind::List, 16)
                .with_name("widget")
                .with_capacity(capacity),
        )
        .expect("fixture registration is valid");
    registry
}

/// Registry with `NODE` registered as a tree of `capacity` 8-byte records.
pub fn node_registry(capacity: u32) -> Registry {
    let mut registry = Registry::default();
    registry
        .register(
            TypeRegistration::new(NODE, TopologyKind::Tree, 8)
                .with_name("node")
                .with_capacity(capacity),
        )
        .expect("fixture registration is valid");
    registry
}

/// Create `len` entities of a tree type, each the child of the previous.
///
/// Returns the handles from the top of the chain down.
pub fn chain(registry: &mut Registry, type_id: EntityTypeId, len: usize) -> Vec<Handle> {
    let mut handles: Vec<Handle> = Vec::with_capacity(len);
    for _ in 0..len {
        let h = registry.create(type_id).expect("chain create");
        if let Some(parent) = handles.last() {
            if registry.parent(h).expect("chain parent") != Some(*parent) {
                registry.set_parent(h, *parent).expect("chain reparent");
            }
        }
        handles.push(h);
    }
    handles
}

/// Update callback that counts calls and optionally fails after N of them.
#[derive(Clone, Debug, Default)]
pub struct CountingUpdate {
    calls: Arc<AtomicUsize>,
    fail_after: Option<usize>,
}

impl CountingUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed for the first `n` calls, then fail every call.
    pub fn failing_after(n: usize) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_after: Some(n),
        }
    }

    /// How many times the callback has run.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Registration with this callback installed. Each call also bumps the
    /// first payload byte.
    pub fn register(&self, registration: TypeRegistration) -> TypeRegistration {
        let calls = Arc::clone(&self.calls);
        let fail_after = self.fail_after;
        registration.with_update(move |args: UpdateArgs<'_>| {
            let n = calls.fetch_add(1, Ordering::Relaxed);
            if fail_after.is_some_and(|limit| n >= limit) {
                return Err(UpdateError::failed(format!("call {n} past limit")));
            }
            if let Some(first) = args.payload.first_mut() {
                *first = first.wrapping_add(1);
            }
            Ok(())
        })
    }
}
