//! Topologies for Stowage entity storage.
//!
//! A topology is an ordering structure over nodes that each carry one item.
//! Nodes are allocated from a per-instance generational [`Pool`], then
//! linked and unlinked explicitly. A node may exist without being linked.
//!
//! # Topologies
//!
//! - [`List`]: doubly-linked, ordered sequence with O(1) insertion at
//!   either end or next to any linked node.
//! - [`Tree`]: single-rooted tree of first-child / next-sibling nodes
//!   with cycle-safe reparenting.
//!
//! # Node identity
//!
//! Every [`NodeId`] carries the [`InstanceId`] of the topology that issued
//! it. Passing a node to a different topology instance is rejected with
//! [`TopologyError::ForeignNode`] rather than corrupting either structure.
//!
//! [`Pool`]: stowage_arena::Pool

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod list;
pub mod node;
pub mod tree;

pub use error::TopologyError;
pub use list::List;
pub use node::{InstanceId, NodeId};
pub use tree::{NodeState, RemoveMode, Removed, Tree};
