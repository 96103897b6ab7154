//! Doubly-linked list topology.
//!
//! Nodes are allocated with [`List::insert`] and start unlinked. Linking and
//! unlinking are O(1) and never touch nodes other than the immediate
//! neighbours. The linked-node counter is maintained incrementally.

use stowage_arena::{Pool, PoolConfig, SlotHandle};

use crate::error::TopologyError;
use crate::node::{resolve, InstanceId, NodeId};

#[derive(Debug)]
struct ListNode<T> {
    item: T,
    linked: bool,
    prev: Option<SlotHandle>,
    next: Option<SlotHandle>,
}

/// Ordered, doubly-linked collection of nodes.
#[derive(Debug)]
pub struct List<T> {
    id: InstanceId,
    nodes: Pool<ListNode<T>>,
    first: Option<SlotHandle>,
    last: Option<SlotHandle>,
    counter: usize,
}

impl<T> List<T> {
    /// Create an empty list whose nodes come from a pool built with `config`.
    pub fn new(config: PoolConfig) -> Result<Self, TopologyError> {
        Ok(Self {
            id: InstanceId::next(),
            nodes: Pool::new(config)?,
            first: None,
            last: None,
            counter: 0,
        })
    }

    /// This list's instance ID.
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
        let slot = self.nodes.allocate(ListNode {
            item,
            linked: false,
            prev: None,
            next: None,
        })?;
        Ok(self.node_id(slot))
    }

    /// Free an unlinked node and return its item.
    pub fn release(&mut self, node: NodeId) -> Result<T, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        if self.nodes[slot].linked {
            return Err(TopologyError::StillLinked { node });
        }
        Ok(self.nodes.free(slot)?.item)
    }

    /// The item carried by `node`, if the node is live in this list.
    pub fn item(&self, node: NodeId) -> Option<&T> {
        let slot = resolve(self.id, &self.nodes, node).ok()?;
        Some(&self.nodes[slot].item)
    }

    /// Mutable access to the item carried by `node`.
    pub fn item_mut(&mut self, node: NodeId) -> Option<&mut T> {
        let slot = resolve(self.id, &self.nodes, node).ok()?;
        Some(&mut self.nodes[slot].item)
    }

    /// Whether `node` is currently linked.
    pub fn is_linked(&self, node: NodeId) -> Result<bool, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        Ok(self.nodes[slot].linked)
    }

    fn unlinked(&self, node: NodeId) -> Result<SlotHandle, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        if self.nodes[slot].linked {
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

    // ── Linking ─────────────────────────────────────────────────

    /// Link `node` at the front of the list.
    pub fn add_start(&mut self, node: NodeId) -> Result<(), TopologyError> {
        let slot = self.unlinked(node)?;
        let old_first = self.first;
        self.link(slot, None, old_first);
        Ok(())
    }

    /// Link `node` at the back of the list.
    pub fn add_end(&mut self, node: NodeId) -> Result<(), TopologyError> {
        let slot = self.unlinked(node)?;
        let old_last = self.last;
        self.link(slot, old_last, None);
        Ok(())
    }

    /// Link `node` immediately before the linked node `reference`.
    pub fn add_before(&mut self, reference: NodeId, node: NodeId) -> Result<(), TopologyError> {
        let ref_slot = self.linked(reference)?;
        let slot = self.unlinked(node)?;
        let prev = self.nodes[ref_slot].prev;
        self.link(slot, prev, Some(ref_slot));
        Ok(())
    }

    /// Link `node` immediately after the linked node `reference`.
    pub fn add_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), TopologyError> {
        let ref_slot = self.linked(reference)?;
        let slot = self.unlinked(node)?;
        let next = self.nodes[ref_slot].next;
        self.link(slot, Some(ref_slot), next);
        Ok(())
    }

    /// Splice `slot` between `prev` and `next`, which must be adjacent.
    fn link(&mut self, slot: SlotHandle, prev: Option<SlotHandle>, next: Option<SlotHandle>) {
        {
            let n = &mut self.nodes[slot];
            n.linked = true;
            n.prev = prev;
            n.next = next;
        }
        match prev {
            Some(p) => self.nodes[p].next = Some(slot),
            None => self.first = Some(slot),
        }
        match next {
            Some(n) => self.nodes[n].prev = Some(slot),
            None => self.last = Some(slot),
        }
        self.counter += 1;
    }

    /// Unlink `node`. The node stays allocated and can be linked again.
    ///
    /// Removing a node that is not linked into this list is a contract
    /// violation: it panics in debug builds and returns an error otherwise.
    pub fn remove(&mut self, node: NodeId) -> Result<(), TopologyError> {
        let resolved = self.linked(node);
        if let Err(err) = &resolved {
            tracing::error!(%node, list = %self.id, %err, "list remove of a node not linked here");
        }
        debug_assert!(resolved.is_ok(), "list remove of {node}: not linked into this list");
        let slot = resolved?;

        let (prev, next) = {
            let n = &mut self.nodes[slot];
            let links = (n.prev, n.next);
            n.linked = false;
            n.prev = None;
            n.next = None;
            links
        };
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.first = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.last = prev,
        }
        self.counter -= 1;
        Ok(())
    }

    // ── Navigation ──────────────────────────────────────────────

    /// Head of the list.
    pub fn first(&self) -> Option<NodeId> {
        self.first.map(|s| self.node_id(s))
    }

    /// Tail of the list.
    pub fn last(&self) -> Option<NodeId> {
        self.last.map(|s| self.node_id(s))
    }

    /// Successor of `node`. `Ok(None)` at the tail or for an unlinked node.
    pub fn next(&self, node: NodeId) -> Result<Option<NodeId>, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        Ok(self.nodes[slot].next.map(|s| self.node_id(s)))
    }

    /// Predecessor of `node`. `Ok(None)` at the head or for an unlinked node.
    pub fn previous(&self, node: NodeId) -> Result<Option<NodeId>, TopologyError> {
        let slot = resolve(self.id, &self.nodes, node)?;
        Ok(self.nodes[slot].prev.map(|s| self.node_id(s)))
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

    /// Linked nodes front to back, with their items.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.first,
            remaining: self.counter,
        }
    }

    /// Release every node, linked or not. Returns how many were freed.
    pub fn clear(&mut self) -> usize {
        self.first = None;
        self.last = None;
        self.counter = 0;
        self.nodes.clear()
    }

    /// Memory held by the node pool, in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.nodes.memory_bytes()
    }
}

/// Front-to-back iterator over a [`List`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    list: &'a List<T>,
    cursor: Option<SlotHandle>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = &self.list.nodes[slot];
        self.cursor = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((self.list.node_id(slot), &node.item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(capacity: u32) -> List<u32> {
        List::new(PoolConfig::new(capacity)).unwrap()
    }

    fn items(list: &List<u32>) -> Vec<u32> {
        list.iter().map(|(_, v)| *v).collect()
    }

    fn linked(list: &mut List<u32>, item: u32) -> NodeId {
        let n = list.insert(item).unwrap();
        list.add_end(n).unwrap();
        n
    }

    #[test]
    fn insert_starts_unlinked() {
        let mut l = list(4);
        let n = l.insert(1).unwrap();
        assert!(!l.is_linked(n).unwrap());
        assert_eq!(l.len(), 0);
        assert_eq!(l.node_count(), 1);
        assert_eq!(l.first(), None);
    }

    #[test]
    fn add_start_prepends() {
        let mut l = list(4);
        for v in 0..3 {
            let n = l.insert(v).unwrap();
            l.add_start(n).unwrap();
        }
        assert_eq!(items(&l), vec![2, 1, 0]);
        assert_eq!(l.len(), 3);
    }

    #[test]
    fn add_end_appends() {
        let mut l = list(4);
        for v in 0..3 {
            linked(&mut l, v);
        }
        assert_eq!(items(&l), vec![0, 1, 2]);
        assert_eq!(l.item(l.last().unwrap()), Some(&2));
    }

    #[test]
    fn add_before_and_after_middle() {
        let mut l = list(8);
        let a = linked(&mut l, 1);
        let c = linked(&mut l, 3);
        let b = l.insert(2).unwrap();
        l.add_before(c, b).unwrap();
        let d = l.insert(4).unwrap();
        l.add_after(c, d).unwrap();
        let z = l.insert(0).unwrap();
        l.add_before(a, z).unwrap();
        assert_eq!(items(&l), vec![0, 1, 2, 3, 4]);
        assert_eq!(l.first(), Some(z));
        assert_eq!(l.last(), Some(d));
    }

    #[test]
    fn next_and_previous_walk_both_ways() {
        let mut l = list(4);
        let a = linked(&mut l, 0);
        let b = linked(&mut l, 1);
        let c = linked(&mut l, 2);
        assert_eq!(l.next(a).unwrap(), Some(b));
        assert_eq!(l.next(c).unwrap(), None);
        assert_eq!(l.previous(c).unwrap(), Some(b));
        assert_eq!(l.previous(a).unwrap(), None);
    }

    #[test]
    fn remove_middle_relinks_neighbours() {
        let mut l = list(4);
        let a = linked(&mut l, 0);
        let b = linked(&mut l, 1);
        let c = linked(&mut l, 2);
        l.remove(b).unwrap();
        assert_eq!(items(&l), vec![0, 2]);
        assert_eq!(l.next(a).unwrap(), Some(c));
        assert_eq!(l.previous(c).unwrap(), Some(a));
        assert_eq!(l.next(b).unwrap(), None);
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn remove_ends_updates_first_and_last() {
        let mut l = list(4);
        let a = linked(&mut l, 0);
        let b = linked(&mut l, 1);
        let c = linked(&mut l, 2);
        l.remove(a).unwrap();
        assert_eq!(l.first(), Some(b));
        l.remove(c).unwrap();
        assert_eq!(l.last(), Some(b));
        l.remove(b).unwrap();
        assert!(l.is_empty());
        assert_eq!(l.first(), None);
        assert_eq!(l.last(), None);
    }

    #[test]
    fn removed_node_can_be_relinked() {
        let mut l = list(4);
        let a = linked(&mut l, 0);
        linked(&mut l, 1);
        l.remove(a).unwrap();
        l.add_end(a).unwrap();
        assert_eq!(items(&l), vec![1, 0]);
    }

    #[test]
    fn double_link_rejected() {
        let mut l = list(4);
        let a = linked(&mut l, 0);
        assert_eq!(l.add_start(a), Err(TopologyError::AlreadyLinked { node: a }));
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn add_next_to_unlinked_reference_rejected() {
        let mut l = list(4);
        let r = l.insert(0).unwrap();
        let n = l.insert(1).unwrap();
        assert_eq!(
            l.add_after(r, n),
            Err(TopologyError::NotLinked { node: r })
        );
        assert!(!l.is_linked(n).unwrap());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not linked into this list")]
    fn double_remove_asserts_in_debug() {
        let mut l = list(4);
        let a = linked(&mut l, 0);
        l.remove(a).unwrap();
        let _ = l.remove(a);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn double_remove_errors_in_release() {
        let mut l = list(4);
        let a = linked(&mut l, 0);
        l.remove(a).unwrap();
        assert_eq!(l.remove(a), Err(TopologyError::NotLinked { node: a }));
    }

    #[test]
    fn foreign_node_rejected() {
        let mut l1 = list(2);
        let mut l2 = list(2);
        let n = l1.insert(0).unwrap();
        assert!(matches!(
            l2.add_start(n),
            Err(TopologyError::ForeignNode { .. })
        ));
        assert!(l2.item(n).is_none());
    }

    #[test]
    fn release_requires_unlinked() {
        let mut l = list(2);
        let a = linked(&mut l, 7);
        assert_eq!(l.release(a), Err(TopologyError::StillLinked { node: a }));
        l.remove(a).unwrap();
        assert_eq!(l.release(a), Ok(7));
        assert!(matches!(
            l.is_linked(a),
            Err(TopologyError::StaleNode { .. })
        ));
    }

    #[test]
    fn exhausted_node_pool_surfaces_pool_error() {
        let mut l = list(1);
        l.insert(0).unwrap();
        assert!(matches!(l.insert(1), Err(TopologyError::Pool(_))));
    }

    #[test]
    fn clear_frees_everything() {
        let mut l = list(4);
        let a = linked(&mut l, 0);
        linked(&mut l, 1);
        l.insert(2).unwrap();
        assert_eq!(l.clear(), 3);
        assert!(l.is_empty());
        assert_eq!(l.node_count(), 0);
        assert!(l.item(a).is_none());
    }

    #[test]
    fn iter_reports_exact_len() {
        let mut l = list(4);
        linked(&mut l, 0);
        linked(&mut l, 1);
        assert_eq!(l.iter().len(), 2);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Start(u32),
            End(u32),
            Remove(usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                any::<u32>().prop_map(Op::Start),
                any::<u32>().prop_map(Op::End),
                any::<usize>().prop_map(Op::Remove),
            ]
        }

        proptest! {
            #[test]
            fn matches_vecdeque_model(ops in prop::collection::vec(op(), 0..64)) {
                let mut l: List<u32> = List::new(PoolConfig::growable(4, 4)).unwrap();
                let mut model: std::collections::VecDeque<(NodeId, u32)> = Default::default();

                for op in ops {
                    match op {
                        Op::Start(v) => {
                            let n = l.insert(v).unwrap();
                            l.add_start(n).unwrap();
                            model.push_front((n, v));
                        }
                        Op::End(v) => {
                            let n = l.insert(v).unwrap();
                            l.add_end(n).unwrap();
                            model.push_back((n, v));
                        }
                        Op::Remove(i) => {
                            if !model.is_empty() {
                                let (n, _) = model.remove(i % model.len()).unwrap();
                                l.remove(n).unwrap();
                                l.release(n).unwrap();
                            }
                        }
                    }
                    prop_assert_eq!(l.len(), model.len());
                }

                let forward: Vec<_> = l.iter().map(|(n, v)| (n, *v)).collect();
                let expected: Vec<_> = model.iter().copied().collect();
                prop_assert_eq!(forward, expected);

                let mut backward = Vec::new();
                let mut cursor = l.last();
                while let Some(n) = cursor {
                    backward.push(n);
                    cursor = l.previous(n).unwrap();
                }
                backward.reverse();
                let ids: Vec<_> = model.iter().map(|(n, _)| *n).collect();
                prop_assert_eq!(backward, ids);
            }
        }
    }
}
