//! Single-rooted n-ary tree topology.
//!
//! Nodes use first-child / next-sibling links plus a parent link, all stored
//! as generational slot handles into the tree's own node pool.
//!
//! # Node states
//!
//! ```text
//!            add_root / add_child / add_parent
//! Unlinked ─────────────────────────────────────> Root | Attached
//!    ^                                                   │
//!    └─────────────────── remove ────────────────────────┘
//! ```
//!
//! A linked tree always has exactly one parentless node, the root. Adding a
//! root to a non-empty tree demotes the previous root to the new root's
//! first child.
//!
//! # Detached subtrees
//!
//! [`RemoveMode::KeepReferences`] takes a node out of its parent's child
//! chain but leaves its own child links alone, so the whole subtree leaves
//! with it. Every node of that subtree reads as [`NodeState::Unlinked`]
//! until the head is attached again with [`Tree::add_root`] or
//! [`Tree::add_child`], which bring the subtree back in one piece.
//!
//! # Reparenting
//!
//! [`Tree::move_as_child`] walks from the new parent up to the root before
//! touching any link. If the moved node is on that path the move would
//! create a cycle, and it fails with the tree unchanged.

use smallvec::SmallVec;
use stowage_arena::{Pool, PoolConfig, SlotHandle};

use crate::error::TopologyError;
use crate::node::{resolve, InstanceId, NodeId};

/// Nodes unlinked by one [`Tree::remove`] call, in pre-order.
pub type Removed = SmallVec<[NodeId; 8]>;

/// Where a node currently sits in its tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Allocated but not part of the hierarchy.
    Unlinked,
    /// The single parentless linked node.
    Root,
    /// Linked under a parent.
    Attached,
}

/// How [`Tree::remove`] treats the removed node's descendants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoveMode {
    /// Cut the node out of its parent's child chain. The node keeps its
    /// children, so the subtree stays intact outside the tree. Fails on the
    /// root.
    KeepReferences,
    /// Unlink the node together with its whole subtree. On the root this
    /// requires the root to be the only linked node.
    Full,
}

#[derive(Debug)]
struct TreeNode<T> {
    item: T,
    linked: bool,
    parent: Option<SlotHandle>,
    child: Option<SlotHandle>,
    sibling: Option<SlotHandle>,
}

/// Single-rooted hierarchy of nodes.
#[derive(Debug)]
pub struct Tree<T> {
    id: InstanceId,
    nodes: Pool<TreeNode<T>>,
    root: Option<SlotHandle>,
    counter: usize,
}

impl<T> Tree<T> {
    /// Create an empty tree whose nodes come from a pool built with `config`.
    pub fn new(config: PoolConfig) -> Result<Self, TopologyError> {
        Ok(Self {
            id: InstanceId::next(),
            nodes: Pool::new(config)?,
            root: None,
            counter: 0,
        })
    }

    /// This tree's instance ID.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    fn node_id(&self, slot: SlotHandle) -> NodeId {
        NodeId {
            owner: self.id,
            slot,
        }
    }

    // ── Node allocation ─────────────────────────────────────────

    /// Allocate an unlinked node carrying `item`.
    pub fn insert(&mut self, item: T) -> Result<NodeId, TopologyError> {
        let slot = self.nodes.allocate(TreeNode {
            item,
            linked: false,
            parent: None,
            child: None,
            sibling: None,
        })?;
        Ok(self.node_id(slot))
    }

    /// Free an unlinked node and return its item.
    ///
    /// A node that heads or belongs to a detached subtree still has links
    /// and cannot be released.
    pub fn release(&mut self, node: NodeId) -> Result<T, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        let n = &self.nodes[slot];
        if n.linked || n.parent.is_some() || n.child.is_some() {
            return Err(TopologyError::StillLinked { node });
        }
        Ok(self.nodes.free(slot)?.item)
    }

    /// The item carried by `node`, if the node is live in this tree.
    pub fn item(&self, node: NodeId) -> Option<&T> {
        let slot = resolve(self.id, &self.nodes, node).ok()?;
        Some(&self.nodes[slot].item)
    }

    /// Mutable access to the item carried by `node`.
    pub fn item_mut(&mut self, node: NodeId) -> Option<&mut T> {
        let slot = resolve(self.id, &self.nodes, node).ok()?;
        Some(&mut self.nodes[slot].item)
    }

    /// Current state of `node`.
    pub fn state(&self, node: NodeId) -> Result<NodeState, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        Ok(self.state_of(slot))
    }

    fn state_of(&self, slot: SlotHandle) -> NodeState {
        if !self.nodes[slot].linked {
            NodeState::Unlinked
        } else if self.root == Some(slot) {
            NodeState::Root
        } else {
            NodeState::Attached
        }
    }

    /// A node that is out of the tree and has no parent: a lone node or the
    /// head of a detached subtree.
    fn unlinked(&self, node: NodeId) -> Result<SlotHandle, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        let n = &self.nodes[slot];
        if n.linked || n.parent.is_some() {
            return Err(TopologyError::AlreadyLinked { node });
        }
        Ok(slot)
    }

    fn linked(&self, node: NodeId) -> Result<SlotHandle, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        if !self.nodes[slot].linked {
            return Err(TopologyError::NotLinked { node });
        }
        Ok(slot)
    }

    // ── Structure ───────────────────────────────────────────────

    /// Make `node` the root. An existing root becomes its first child.
    ///
    /// On an empty tree `node` may head a detached subtree, which becomes
    /// the whole tree.
    pub fn add_root(&mut self, node: NodeId) -> Result<(), TopologyError> {
        match self.root {
            Some(old) => self.add_parent(self.node_id(old), node),
            None => {
                let slot = self.unlinked(node)?;
                debug_assert_eq!(self.counter, 0, "rootless tree with linked nodes");
                self.root = Some(slot);
                self.counter = self.mark_subtree(slot, true).len();
                Ok(())
            }
        }
    }

    /// Link `node` as the first child of `reference`.
    ///
    /// The previous first child becomes `node`'s next sibling. If `node`
    /// heads a detached subtree, the subtree comes along.
    pub fn add_child(&mut self, reference: NodeId, node: NodeId) -> Result<(), TopologyError> {
        let parent = self.linked(reference)?;
        let slot = self.unlinked(node)?;
        self.attach_first_child(parent, slot);
        self.counter += self.mark_subtree(slot, true).len();
        Ok(())
    }

    /// Insert `node` between `reference` and its parent.
    ///
    /// `node` takes over `reference`'s parent and sibling position, and
    /// `reference` becomes `node`'s only child. If `reference` is the root,
    /// `node` becomes the new root. `node` must have no children.
    pub fn add_parent(&mut self, reference: NodeId, node: NodeId) -> Result<(), TopologyError> {
        let ref_slot = self.linked(reference)?;
        let slot = self.unlinked(node)?;
        if self.nodes[slot].child.is_some() {
            tracing::warn!(%node, %reference, tree = %self.id, "add_parent with a subtree head");
            return Err(TopologyError::HasChildren { node });
        }

        let (parent, sibling) = {
            let r = &self.nodes[ref_slot];
            (r.parent, r.sibling)
        };
        match parent {
            Some(p) => self.replace_in_chain(p, ref_slot, Some(slot)),
            None => {
                debug_assert_eq!(self.root, Some(ref_slot), "parentless non-root node");
                self.root = Some(slot);
            }
        }
        {
            let n = &mut self.nodes[slot];
            n.linked = true;
            n.parent = parent;
            n.sibling = sibling;
            n.child = Some(ref_slot);
        }
        {
            let r = &mut self.nodes[ref_slot];
            r.parent = Some(slot);
            r.sibling = None;
        }
        self.counter += 1;
        Ok(())
    }

    /// Move `node` (and its subtree) to be the first child of `reference`.
    ///
    /// Both nodes must be linked into this tree. Fails with
    /// [`TopologyError::WouldCycle`] if `node` is `reference` or one of its
    /// ancestors; no link is modified in that case.
    pub fn move_as_child(&mut self, reference: NodeId, node: NodeId) -> Result<(), TopologyError> {
        let ref_slot = self.linked(reference)?;
        let slot = self.linked(node)?;

        let mut cursor = Some(ref_slot);
        while let Some(current) = cursor {
            if current == slot {
                tracing::warn!(%node, %reference, tree = %self.id, "reparent rejected: would create a cycle");
                return Err(TopologyError::WouldCycle { node, reference });
            }
            cursor = self.nodes[current].parent;
        }

        // The root is an ancestor of every linked node, so `node` is not the
        // root here and has a parent.
        self.detach(slot);
        self.attach_first_child(ref_slot, slot);
        Ok(())
    }

    /// Unlink `node` from the tree.
    ///
    /// Returns the nodes that left the tree, `node` first, in pre-order. The
    /// nodes stay allocated.
    ///
    /// - [`RemoveMode::KeepReferences`]: `node` is cut out of its parent's
    ///   child chain and keeps its subtree. Fails with
    ///   [`TopologyError::RootRemoval`] on the root.
    /// - [`RemoveMode::Full`]: `node` and all its descendants are unlinked.
    ///   On the root, fails with [`TopologyError::RootHasDescendants`] unless
    ///   the root is the only linked node.
    pub fn remove(&mut self, node: NodeId, mode: RemoveMode) -> Result<Removed, TopologyError> {
        let slot = self.linked(node)?;
        let is_root = self.root == Some(slot);

        match mode {
            RemoveMode::KeepReferences if is_root => {
                tracing::error!(%node, tree = %self.id, "cannot remove the root while keeping references");
                Err(TopologyError::RootRemoval { node })
            }
            RemoveMode::KeepReferences => {
                let has_parent = self.nodes[slot].parent.is_some();
                debug_assert!(has_parent, "attached node {node} without a parent");
                if !has_parent {
                    return Err(TopologyError::NotLinked { node });
                }
                self.detach(slot);
                let removed = self.mark_subtree(slot, false);
                self.counter -= removed.len();
                Ok(removed)
            }
            RemoveMode::Full if is_root => {
                if self.counter != 1 {
                    tracing::error!(%node, tree = %self.id, linked = self.counter, "cannot remove a root with descendants");
                    return Err(TopologyError::RootHasDescendants {
                        node,
                        remaining: self.counter - 1,
                    });
                }
                self.reset_links(slot);
                self.root = None;
                self.counter = 0;
                Ok(smallvec::smallvec![node])
            }
            RemoveMode::Full => {
                let removed: Removed = self.descendants_of(slot).collect();
                self.detach(slot);
                for id in &removed {
                    self.reset_links(id.slot);
                }
                self.counter -= removed.len();
                Ok(removed)
            }
        }
    }

    // ── Link helpers ────────────────────────────────────────────

    fn attach_first_child(&mut self, parent: SlotHandle, slot: SlotHandle) {
        let old_first = self.nodes[parent].child;
        {
            let n = &mut self.nodes[slot];
            n.linked = true;
            n.parent = Some(parent);
            n.sibling = old_first;
        }
        self.nodes[parent].child = Some(slot);
    }

    /// Cut `slot` (with its subtree) out of its parent's child chain.
    fn detach(&mut self, slot: SlotHandle) {
        let (parent, sibling) = {
            let n = &self.nodes[slot];
            (n.parent, n.sibling)
        };
        if let Some(p) = parent {
            self.replace_in_chain(p, slot, sibling);
        }
        let n = &mut self.nodes[slot];
        n.parent = None;
        n.sibling = None;
    }

    /// In `parent`'s child chain, make whatever pointed at `old` point at
    /// `new` instead.
    fn replace_in_chain(
        &mut self,
        parent: SlotHandle,
        old: SlotHandle,
        new: Option<SlotHandle>,
    ) {
        if self.nodes[parent].child == Some(old) {
            self.nodes[parent].child = new;
            return;
        }
        let mut cursor = self.nodes[parent].child;
        let mut found = false;
        while let Some(c) = cursor {
            if self.nodes[c].sibling == Some(old) {
                self.nodes[c].sibling = new;
                found = true;
                break;
            }
            cursor = self.nodes[c].sibling;
        }
        debug_assert!(found, "slot {old} missing from its parent's child chain");
    }

    /// Set the linked flag on `slot` and every node below it. Returns the
    /// subtree in pre-order.
    fn mark_subtree(&mut self, slot: SlotHandle, linked: bool) -> Removed {
        let subtree: Removed = self.descendants_of(slot).collect();
        for id in &subtree {
            self.nodes[id.slot].linked = linked;
        }
        subtree
    }

    fn reset_links(&mut self, slot: SlotHandle) {
        let n = &mut self.nodes[slot];
        n.linked = false;
        n.parent = None;
        n.child = None;
        n.sibling = None;
    }

    // ── Navigation ──────────────────────────────────────────────

    /// The root, if any node is linked.
    pub fn root(&self) -> Option<NodeId> {
        self.root.map(|s| self.node_id(s))
    }

    /// Parent of `node`. `Ok(None)` for the root, for lone nodes, and for the
    /// head of a detached subtree.
    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        Ok(self.nodes[slot].parent.map(|s| self.node_id(s)))
    }

    /// First child of `node`.
    pub fn child(&self, node: NodeId) -> Result<Option<NodeId>, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        Ok(self.nodes[slot].child.map(|s| self.node_id(s)))
    }

    /// Next sibling of `node`.
    pub fn sibling(&self, node: NodeId) -> Result<Option<NodeId>, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        Ok(self.nodes[slot].sibling.map(|s| self.node_id(s)))
    }

    /// Direct children of `node`, first child first.
    pub fn children(&self, node: NodeId) -> Result<Children<'_, T>, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        Ok(Children {
            tree: self,
            cursor: self.nodes[slot].child,
        })
    }

    /// `node` and all its descendants in pre-order.
    pub fn descendants(&self, node: NodeId) -> Result<Descendants<'_, T>, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        Ok(self.descendants_of(slot))
    }

    fn descendants_of(&self, slot: SlotHandle) -> Descendants<'_, T> {
        Descendants {
            tree: self,
            start: slot,
            next: Some(slot),
        }
    }

    /// Number of edges between `node` and the top of its structure: the root,
    /// or the head of the detached subtree it belongs to.
    pub fn depth(&self, node: NodeId) -> Result<usize, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        let mut depth = 0;
        let mut cursor = self.nodes[slot].parent;
        while let Some(p) = cursor {
            depth += 1;
            cursor = self.nodes[p].parent;
        }
        Ok(depth)
    }

    /// Whether `ancestor` is a proper ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> Result<bool, TopologyError> {
        let target = resolve(self.id, &self.nodes, ancestor)?;
        let slot = resolve(self.id, &self.nodes, node)?;
        let mut cursor = self.nodes[slot].parent;
        while let Some(p) = cursor {
            if p == target {
                return Ok(true);
            }
            cursor = self.nodes[p].parent;
        }
        Ok(false)
    }

    /// Number of linked nodes.
    pub fn len(&self) -> usize {
        self.counter
    }

    /// Whether no node is linked.
    pub fn is_empty(&self) -> bool {
        self.counter == 0
    }

    /// Number of allocated nodes, linked or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Release every node, linked or not. Returns how many were freed.
    pub fn clear(&mut self) -> usize {
        self.root = None;
        self.counter = 0;
        self.nodes.clear()
    }

    /// Memory held by the node pool, in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.nodes.memory_bytes()
    }
}

/// Iterator over the direct children of a node.
#[derive(Debug)]
pub struct Children<'a, T> {
    tree: &'a Tree<T>,
    cursor: Option<SlotHandle>,
}

impl<T> Iterator for Children<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let slot = self.cursor?;
        self.cursor = self.tree.nodes[slot].sibling;
        Some(self.tree.node_id(slot))
    }
}

/// Pre-order iterator over a node and its descendants.
///
/// Walks the links directly, so it needs no stack.
#[derive(Debug)]
pub struct Descendants<'a, T> {
    tree: &'a Tree<T>,
    start: SlotHandle,
    next: Option<SlotHandle>,
}

impl<T> Iterator for Descendants<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        let nodes = &self.tree.nodes;
        self.next = match nodes[current].child {
            Some(child) => Some(child),
            None => {
                let mut cursor = current;
                let mut successor = None;
                while cursor != self.start {
                    let n = &nodes[cursor];
                    if n.sibling.is_some() {
                        successor = n.sibling;
                        break;
                    }
                    match n.parent {
                        Some(p) => cursor = p,
                        None => break,
                    }
                }
                successor
            }
        };
        Some(self.tree.node_id(current))
    }
}
