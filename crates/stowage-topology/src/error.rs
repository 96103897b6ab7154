//! Topology error types.

use stowage_arena::PoolError;
use thiserror::Error;

use crate::node::{InstanceId, NodeId};

/// Errors returned by [`List`](crate::List) and [`Tree`](crate::Tree).
///
/// Every structural check runs before the first link is rewritten, so an
/// `Err` always leaves the topology exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The node was issued by a different topology instance.
    #[error("{node} belongs to topology {}, not {instance}", .node.owner())]
    ForeignNode {
        /// The offending node.
        node: NodeId,
        /// The topology the call was made against.
        instance: InstanceId,
    },
    /// The node's slot has been released or never existed.
    #[error("{node} is not a live node: {source}")]
    StaleNode {
        /// The offending node.
        node: NodeId,
        /// Why the slot lookup failed.
        #[source]
        source: PoolError,
    },
    /// The node is already part of the structure.
    #[error("{node} is already linked")]
    AlreadyLinked {
        /// The offending node.
        node: NodeId,
    },
    /// The node is not part of the structure.
    #[error("{node} is not linked")]
    NotLinked {
        /// The offending node.
        node: NodeId,
    },
    /// The node heads a detached subtree and cannot take a new child.
    #[error("{node} already has children")]
    HasChildren {
        /// The offending node.
        node: NodeId,
    },
    /// A node cannot be released while it is still linked.
    #[error("{node} is still linked and cannot be released")]
    StillLinked {
        /// The offending node.
        node: NodeId,
    },
    /// Moving `node` under `reference` would make `node` its own ancestor.
    #[error("moving {node} under {reference} would create a cycle")]
    WouldCycle {
        /// The node being moved.
        node: NodeId,
        /// The intended new parent.
        reference: NodeId,
    },
    /// The root cannot be removed while keeping its children linked.
    #[error("{node} is the root; its children have no parent to move to")]
    RootRemoval {
        /// The root node.
        node: NodeId,
    },
    /// The root cannot be removed while other nodes remain in the tree.
    #[error("{node} is the root and {remaining} other nodes are still linked")]
    RootHasDescendants {
        /// The root node.
        node: NodeId,
        /// Linked nodes other than the root.
        remaining: usize,
    },
    /// Node pool failure (exhaustion or invalid config).
    #[error(transparent)]
    Pool(#[from] PoolError),
}
