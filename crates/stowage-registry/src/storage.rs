//! Storage bound to one registered type.
//!
//! A [`TypeStorage`] owns the type's record pool and its topology instance.
//! Records hold an [`EntityHeader`] plus a zeroed payload; the topology's
//! nodes carry the record slot they serve.

use smallvec::SmallVec;
use stowage_arena::{RecordPool, SlotHandle};
use stowage_core::{EntityTypeId, TopologyKind, TypeTag};
use stowage_topology::{List, NodeId, RemoveMode, TopologyError, Tree};
use tracing::{error, trace, warn};

use crate::config::{RegistryConfig, TypeRegistration};
use crate::entity::{EntityHeader, Handle, StorageNode};
use crate::error::RegistryError;
use crate::metrics::StorageMetrics;
use crate::update::UpdateFn;

/// The topology instance behind a storage.
#[derive(Debug)]
pub(crate) enum Topology {
    List(List<SlotHandle>),
    Tree(Tree<SlotHandle>),
}

impl Topology {
    pub(crate) fn kind(&self) -> TopologyKind {
        match self {
            Topology::List(_) => TopologyKind::List,
            Topology::Tree(_) => TopologyKind::Tree,
        }
    }

    fn len(&self) -> usize {
        match self {
            Topology::List(list) => list.len(),
            Topology::Tree(tree) => tree.len(),
        }
    }

    fn memory_bytes(&self) -> usize {
        match self {
            Topology::List(list) => list.memory_bytes(),
            Topology::Tree(tree) => tree.memory_bytes(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    high_water: usize,
    creates: u64,
    deletes: u64,
    failed_creates: u64,
    rejected_reparents: u64,
    update_calls: u64,
}

pub(crate) struct TypeStorage {
    pub(crate) type_id: EntityTypeId,
    pub(crate) name: Option<String>,
    tag: TypeTag,
    epoch: u32,
    pub(crate) records: RecordPool<EntityHeader>,
    pub(crate) topology: Topology,
    pub(crate) update: Option<UpdateFn>,
    counters: Counters,
}

impl TypeStorage {
    pub(crate) fn new(
        registration: TypeRegistration,
        defaults: &RegistryConfig,
        epoch: u32,
    ) -> Result<Self, RegistryError> {
        registration.validate(defaults)?;
        let pool = registration.pool_config(defaults);
        let records = RecordPool::new(pool, registration.record_size)?;
        let topology = match registration.kind {
            TopologyKind::List => Topology::List(List::new(pool)?),
            TopologyKind::Tree => Topology::Tree(Tree::new(pool)?),
        };
        Ok(Self {
            type_id: registration.type_id,
            name: registration.name,
            tag: TypeTag::new(registration.type_id),
            epoch,
            records,
            topology,
            update: registration.update,
            counters: Counters::default(),
        })
    }

    pub(crate) fn kind(&self) -> TopologyKind {
        self.topology.kind()
    }

    pub(crate) fn len(&self) -> usize {
        self.topology.len()
    }

    pub(crate) fn handle(&self, slot: SlotHandle) -> Handle {
        Handle {
            tag: self.tag,
            epoch: self.epoch,
            slot,
        }
    }

    /// Name for log events: the registered name, else the type id.
    pub(crate) fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.type_id.to_string(),
        }
    }

    fn mismatch(type_id: EntityTypeId, expected: TopologyKind, actual: TopologyKind) -> RegistryError {
        error!(%type_id, %expected, %actual, "accessor used on the wrong topology");
        RegistryError::TopologyMismatch {
            type_id,
            expected,
            actual,
        }
    }

    fn check_epoch(&self, handle: Handle) -> Result<(), RegistryError> {
        if handle.epoch != self.epoch {
            return Err(RegistryError::ExpiredHandle {
                handle,
                type_id: self.type_id,
            });
        }
        Ok(())
    }

    fn check_tag(handle: Handle, header: &EntityHeader) -> Result<(), RegistryError> {
        if header.tag != handle.tag {
            error!(%handle, found = %header.tag, "record tag does not match handle");
            return Err(RegistryError::TagMismatch {
                handle,
                found: header.tag,
            });
        }
        Ok(())
    }

    /// Header of the live entity `handle` names.
    pub(crate) fn header(&self, handle: Handle) -> Result<&EntityHeader, RegistryError> {
        self.check_epoch(handle)?;
        let header = self
            .records
            .try_header(handle.slot)
            .map_err(|source| RegistryError::StaleHandle { handle, source })?;
        Self::check_tag(handle, header)?;
        Ok(header)
    }

    pub(crate) fn header_mut(&mut self, handle: Handle) -> Result<&mut EntityHeader, RegistryError> {
        self.check_epoch(handle)?;
        let header = self
            .records
            .try_header_mut(handle.slot)
            .map_err(|source| RegistryError::StaleHandle { handle, source })?;
        Self::check_tag(handle, header)?;
        Ok(header)
    }

    /// The topology node of a validated entity.
    pub(crate) fn node(&self, handle: Handle) -> Result<NodeId, RegistryError> {
        match self.header(handle)?.node {
            Some(StorageNode::List(node)) | Some(StorageNode::Tree(node)) => Ok(node),
            None => Err(RegistryError::Unlinked { handle }),
        }
    }

    pub(crate) fn list(&self) -> Result<&List<SlotHandle>, RegistryError> {
        match &self.topology {
            Topology::List(list) => Ok(list),
            Topology::Tree(_) => Err(Self::mismatch(self.type_id, TopologyKind::List, TopologyKind::Tree)),
        }
    }

    pub(crate) fn tree(&self) -> Result<&Tree<SlotHandle>, RegistryError> {
        match &self.topology {
            Topology::Tree(tree) => Ok(tree),
            Topology::List(_) => Err(Self::mismatch(self.type_id, TopologyKind::Tree, TopologyKind::List)),
        }
    }

    pub(crate) fn tree_mut(&mut self) -> Result<&mut Tree<SlotHandle>, RegistryError> {
        match &mut self.topology {
            Topology::Tree(tree) => Ok(tree),
            Topology::List(_) => Err(Self::mismatch(self.type_id, TopologyKind::Tree, TopologyKind::List)),
        }
    }

    /// Handle for the entity a node serves.
    pub(crate) fn entity_of(&self, node: Option<NodeId>) -> Option<Handle> {
        let node = node?;
        let slot = match &self.topology {
            Topology::List(list) => list.item(node),
            Topology::Tree(tree) => tree.item(node),
        }?;
        Some(self.handle(*slot))
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Allocate a record and a node, then link the node.
    ///
    /// List: the new entity goes to the front. Tree: it becomes the root of
    /// an empty tree, otherwise the first child of the root.
    pub(crate) fn create(&mut self) -> Result<Handle, RegistryError> {
        let slot = match self.records.allocate(EntityHeader::new(self.tag)) {
            Ok(slot) => slot,
            Err(err) => {
                self.counters.failed_creates += 1;
                warn!(type_id = %self.type_id, %err, "entity record allocation failed");
                return Err(err.into());
            }
        };

        let linked = match &mut self.topology {
            Topology::List(list) => Self::link_list(list, slot),
            Topology::Tree(tree) => Self::link_tree(tree, slot),
        };
        let node = match linked {
            Ok(node) => node,
            Err(err) => {
                self.counters.failed_creates += 1;
                warn!(type_id = %self.type_id, %err, "storage node allocation failed; rolling back");
                if let Err(free_err) = self.records.free(slot) {
                    error!(type_id = %self.type_id, %free_err, "rollback could not free record");
                }
                return Err(err);
            }
        };

        let handle = self.handle(slot);
        self.header_mut(handle)?.node = Some(node);
        self.counters.creates += 1;
        self.counters.high_water = self.counters.high_water.max(self.len());
        trace!(%handle, "entity created");
        Ok(handle)
    }

    fn link_list(list: &mut List<SlotHandle>, slot: SlotHandle) -> Result<StorageNode, RegistryError> {
        let node = list.insert(slot)?;
        if let Err(err) = list.add_start(node) {
            if let Err(release_err) = list.release(node) {
                error!(%node, %release_err, "create rollback could not release list node");
            }
            return Err(err.into());
        }
        Ok(StorageNode::List(node))
    }

    fn link_tree(tree: &mut Tree<SlotHandle>, slot: SlotHandle) -> Result<StorageNode, RegistryError> {
        let node = tree.insert(slot)?;
        let linked = match tree.root() {
            Some(root) => tree.add_child(root, node),
            None => tree.add_root(node),
        };
        if let Err(err) = linked {
            if let Err(release_err) = tree.release(node) {
                error!(%node, %release_err, "create rollback could not release tree node");
            }
            return Err(err.into());
        }
        Ok(StorageNode::Tree(node))
    }

    /// Unlink and free one entity.
    ///
    /// A tree entity's children are hoisted to its parent first (see
    /// `hoist_children`). Deleting a tree root that still has children
    /// fails.
    pub(crate) fn delete(&mut self, handle: Handle) -> Result<(), RegistryError> {
        let header = self.header(handle)?;
        let count = header.ref_count;
        debug_assert!(count == 0, "delete of {handle} with {count} outstanding references");
        if count != 0 {
            error!(%handle, count, "delete of a referenced entity");
            return Err(RegistryError::StillReferenced { handle, count });
        }
        let Some(node) = header.node else {
            return Err(RegistryError::Unlinked { handle });
        };

        match (node, &mut self.topology) {
            (StorageNode::List(node), Topology::List(list)) => {
                list.remove(node)?;
                list.release(node)?;
            }
            (StorageNode::Tree(node), Topology::Tree(tree)) => {
                if tree.root() == Some(node) {
                    tree.remove(node, RemoveMode::Full)?;
                } else {
                    hoist_children(tree, node)?;
                    tree.remove(node, RemoveMode::KeepReferences)?;
                }
                tree.release(node)?;
            }
            (recorded, topology) => {
                error!(%handle, ?recorded, topology = %topology.kind(), "entity node does not match its storage");
                return Err(RegistryError::TopologyMismatch {
                    type_id: self.type_id,
                    expected: topology.kind(),
                    actual: recorded.kind(),
                });
            }
        }

        self.records.free(handle.slot)?;
        self.counters.deletes += 1;
        trace!(%handle, "entity deleted");
        Ok(())
    }

    /// Delete a tree entity and all its descendants, leaves first.
    ///
    /// Every entity in the subtree must be unreferenced; nothing is deleted
    /// otherwise.
    pub(crate) fn delete_subtree(&mut self, handle: Handle) -> Result<usize, RegistryError> {
        let top = self.node(handle)?;
        let tree = self.tree()?;

        let mut doomed: SmallVec<[(NodeId, SlotHandle); 8]> = SmallVec::new();
        for node in tree.descendants(top)? {
            let slot = *tree.item(node).ok_or(RegistryError::Unlinked { handle })?;
            let entity = self.handle(slot);
            let count = self.header(entity)?.ref_count;
            debug_assert!(count == 0, "delete of {entity} with {count} outstanding references");
            if count != 0 {
                error!(handle = %entity, count, "subtree delete reached a referenced entity");
                return Err(RegistryError::StillReferenced {
                    handle: entity,
                    count,
                });
            }
            doomed.push((node, slot));
        }

        let tree = self.tree_mut()?;
        for (node, _) in doomed.iter().rev() {
            tree.remove(*node, RemoveMode::Full)?;
            tree.release(*node)?;
        }
        for (_, slot) in &doomed {
            self.records.free(*slot)?;
        }
        self.counters.deletes += doomed.len() as u64;
        trace!(%handle, deleted = doomed.len(), "subtree deleted");
        Ok(doomed.len())
    }

    /// Free every entity and node. Returns the number of entities freed.
    pub(crate) fn clear(&mut self) -> usize {
        match &mut self.topology {
            Topology::List(list) => list.clear(),
            Topology::Tree(tree) => tree.clear(),
        };
        let freed = self.records.clear();
        self.counters.deletes += freed as u64;
        freed
    }

    pub(crate) fn record_rejected_reparent(&mut self) {
        self.counters.rejected_reparents += 1;
    }

    pub(crate) fn record_update_call(&mut self) {
        self.counters.update_calls += 1;
    }

    pub(crate) fn metrics(&self) -> StorageMetrics {
        StorageMetrics {
            live: self.records.len(),
            capacity: self.records.capacity(),
            high_water: self.counters.high_water,
            creates: self.counters.creates,
            deletes: self.counters.deletes,
            failed_creates: self.counters.failed_creates,
            rejected_reparents: self.counters.rejected_reparents,
            update_calls: self.counters.update_calls,
            memory_bytes: self.records.memory_bytes() + self.topology.memory_bytes(),
        }
    }
}

impl std::fmt::Debug for TypeStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeStorage")
            .field("type_id", &self.type_id)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("epoch", &self.epoch)
            .field("live", &self.records.len())
            .field("has_update", &self.update.is_some())
            .finish()
    }
}

/// Move every child of `node` up to `node`'s parent, in order, ahead of the
/// parent's existing children. A no-op on the root and on leaves.
fn hoist_children(tree: &mut Tree<SlotHandle>, node: NodeId) -> Result<(), TopologyError> {
    let Some(parent) = tree.parent(node)? else {
        return Ok(());
    };
    let children: SmallVec<[NodeId; 8]> = tree.children(node)?.collect();
    for child in children.into_iter().rev() {
        tree.move_as_child(parent, child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_arena::PoolConfig;

    fn slots(n: u32) -> Vec<SlotHandle> {
        let mut records: RecordPool<()> = RecordPool::new(PoolConfig::new(n), 1).unwrap();
        (0..n).map(|_| records.allocate(()).unwrap()).collect()
    }

    #[test]
    fn link_on_full_node_pool_leaves_list_intact() {
        let s = slots(2);
        let mut list: List<SlotHandle> = List::new(PoolConfig::new(1)).unwrap();
        TypeStorage::link_list(&mut list, s[0]).unwrap();
        assert!(TypeStorage::link_list(&mut list, s[1]).is_err());
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().count(), 1);
    }

    #[test]
    fn link_on_full_node_pool_leaves_tree_intact() {
        let s = slots(2);
        let mut tree: Tree<SlotHandle> = Tree::new(PoolConfig::new(1)).unwrap();
        let StorageNode::Tree(root) = TypeStorage::link_tree(&mut tree, s[0]).unwrap() else {
            panic!("tree link returned a list node");
        };
        assert!(TypeStorage::link_tree(&mut tree, s[1]).is_err());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), Some(root));
    }

    #[test]
    fn hoisting_from_a_leaf_or_the_root_is_a_no_op() {
        let s = slots(3);
        let mut tree: Tree<SlotHandle> = Tree::new(PoolConfig::new(3)).unwrap();
        let nodes: Vec<NodeId> = s.iter().map(|slot| tree.insert(*slot).unwrap()).collect();
        tree.add_root(nodes[0]).unwrap();
        tree.add_child(nodes[0], nodes[1]).unwrap();
        tree.add_child(nodes[1], nodes[2]).unwrap();

        hoist_children(&mut tree, nodes[2]).unwrap();
        hoist_children(&mut tree, nodes[0]).unwrap();
        assert_eq!(tree.parent(nodes[2]).unwrap(), Some(nodes[1]));

        hoist_children(&mut tree, nodes[1]).unwrap();
        assert_eq!(tree.parent(nodes[2]).unwrap(), Some(nodes[0]));
        assert_eq!(tree.child(nodes[1]).unwrap(), None);
        assert_eq!(tree.len(), 3);
    }
}
