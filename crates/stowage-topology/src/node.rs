//! Node identifiers shared by every topology.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use stowage_arena::{Pool, SlotHandle};

use crate::error::TopologyError;

/// Counter for topology instance IDs. Starts at 1 so that 0 is never issued.
static INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one topology instance within the process.
///
/// Each [`List`](crate::List) or [`Tree`](crate::Tree) draws a fresh ID at
/// construction. Node IDs embed it so that nodes cannot be used against
/// another instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Allocate a fresh, unique instance ID. Thread-safe.
    pub fn next() -> Self {
        Self(INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node slot in one topology instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) owner: InstanceId,
    pub(crate) slot: SlotHandle,
}

impl NodeId {
    /// The topology instance that issued this node.
    pub fn owner(&self) -> InstanceId {
        self.owner
    }

    /// The underlying pool slot.
    pub fn slot(&self) -> SlotHandle {
        self.slot
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node({}:{}/{})",
            self.owner,
            self.slot.index(),
            self.slot.generation()
        )
    }
}

/// Check that `node` was issued by `instance` and that its slot is live.
pub(crate) fn resolve<N>(
    instance: InstanceId,
    nodes: &Pool<N>,
    node: NodeId,
) -> Result<SlotHandle, TopologyError> {
    if node.owner != instance {
        return Err(TopologyError::ForeignNode { node, instance });
    }
    nodes
        .validate(node.slot)
        .map_err(|source| TopologyError::StaleNode { node, source })?;
    Ok(node.slot)
}
