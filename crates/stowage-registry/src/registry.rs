//! The storage registry: one storage per registered type.

use indexmap::IndexMap;
use stowage_core::{ClockInfo, EntityTypeId, TopologyKind};
use stowage_topology::TopologyError;
use tracing::{debug, error, warn};

use crate::config::{RegistryConfig, TypeRegistration};
use crate::entity::Handle;
use crate::error::RegistryError;
use crate::metrics::StorageMetrics;
use crate::storage::{Topology, TypeStorage};
use crate::update::UpdateArgs;

/// Owns every type's storage and dispatches entity operations to it.
///
/// All operations take `&self` or `&mut self`; the registry is the only
/// writer of the storages it owns.
#[derive(Debug)]
pub struct Registry {
    config: RegistryConfig,
    storages: IndexMap<EntityTypeId, TypeStorage>,
    next_epoch: u32,
}

impl Registry {
    /// Create an empty registry.
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        config.validate()?;
        Ok(Self {
            config,
            storages: IndexMap::new(),
            next_epoch: 1,
        })
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn storage(&self, type_id: EntityTypeId) -> Result<&TypeStorage, RegistryError> {
        self.storages.get(&type_id).ok_or_else(|| {
            error!(%type_id, "type is not registered");
            RegistryError::InvalidType { type_id }
        })
    }

    fn storage_mut(&mut self, type_id: EntityTypeId) -> Result<&mut TypeStorage, RegistryError> {
        self.storages.get_mut(&type_id).ok_or_else(|| {
            error!(%type_id, "type is not registered");
            RegistryError::InvalidType { type_id }
        })
    }

    fn type_of(handle: Handle) -> Result<EntityTypeId, RegistryError> {
        handle.type_id().ok_or_else(|| {
            error!(tag = %handle.tag(), "handle with malformed type tag");
            RegistryError::InvalidTag { tag: handle.tag() }
        })
    }

    /// The storage of a live entity.
    fn resolve(&self, handle: Handle) -> Result<&TypeStorage, RegistryError> {
        let storage = self.storage(Self::type_of(handle)?)?;
        if let Err(err) = storage.header(handle) {
            error!(%handle, %err, "invalid entity handle");
            return Err(err);
        }
        Ok(storage)
    }

    fn resolve_mut(&mut self, handle: Handle) -> Result<&mut TypeStorage, RegistryError> {
        let storage = self.storage_mut(Self::type_of(handle)?)?;
        if let Err(err) = storage.header(handle) {
            error!(%handle, %err, "invalid entity handle");
            return Err(err);
        }
        Ok(storage)
    }

    // ── Registration ────────────────────────────────────────────

    /// Bind a type id to a new storage.
    pub fn register(&mut self, registration: TypeRegistration) -> Result<(), RegistryError> {
        let type_id = registration.type_id();
        if self.storages.contains_key(&type_id) {
            warn!(%type_id, "type registered twice");
            return Err(RegistryError::AlreadyRegistered { type_id });
        }
        let storage = TypeStorage::new(registration, &self.config, self.next_epoch)?;
        self.next_epoch = self.next_epoch.wrapping_add(1);
        debug!(
            %type_id,
            name = %storage.label(),
            kind = %storage.kind(),
            record_size = storage.records.record_size(),
            capacity = storage.records.capacity(),
            "type registered"
        );
        self.storages.insert(type_id, storage);
        Ok(())
    }

    /// Drop a type's storage.
    ///
    /// Live entities are dropped with it; their handles then fail with
    /// [`RegistryError::InvalidType`].
    pub fn unregister(&mut self, type_id: EntityTypeId) -> Result<(), RegistryError> {
        let storage = self
            .storages
            .shift_remove(&type_id)
            .ok_or(RegistryError::InvalidType { type_id })?;
        let live = storage.len();
        if live > 0 {
            warn!(%type_id, name = %storage.label(), live, "unregistering type with live entities");
        }
        debug!(%type_id, name = %storage.label(), "type unregistered");
        Ok(())
    }

    /// Whether `type_id` has a storage.
    pub fn is_registered(&self, type_id: EntityTypeId) -> bool {
        self.storages.contains_key(&type_id)
    }

    /// Number of live entities of a type.
    pub fn number(&self, type_id: EntityTypeId) -> Result<usize, RegistryError> {
        Ok(self.storage(type_id)?.len())
    }

    /// The topology a type was registered with.
    pub fn storage_type(&self, type_id: EntityTypeId) -> Result<TopologyKind, RegistryError> {
        Ok(self.storage(type_id)?.kind())
    }

    /// Registered types and their topologies, in registration order.
    pub fn registered_types(&self) -> impl Iterator<Item = (EntityTypeId, TopologyKind)> + '_ {
        self.storages.values().map(|s| (s.type_id, s.kind()))
    }

    /// Counters for one type.
    pub fn metrics(&self, type_id: EntityTypeId) -> Result<StorageMetrics, RegistryError> {
        Ok(self.storage(type_id)?.metrics())
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Create an entity with a zeroed payload.
    ///
    /// List types link the entity at the front. Tree types make it the root
    /// of an empty tree, otherwise the first child of the root. On failure
    /// nothing is left allocated.
    pub fn create(&mut self, type_id: EntityTypeId) -> Result<Handle, RegistryError> {
        self.storage_mut(type_id)?.create()
    }

    /// Delete an entity.
    ///
    /// The entity must have no outstanding references: deleting a referenced
    /// entity panics in debug builds and fails otherwise. A tree entity's
    /// children are hoisted to its parent, in order, ahead of the parent's
    /// other children. A tree root with children cannot be deleted (see
    /// [`delete_subtree`](Self::delete_subtree)).
    pub fn delete(&mut self, handle: Handle) -> Result<(), RegistryError> {
        self.resolve_mut(handle)?.delete(handle)
    }

    /// Delete a tree entity together with all its descendants.
    ///
    /// Returns the number of entities deleted.
    pub fn delete_subtree(&mut self, handle: Handle) -> Result<usize, RegistryError> {
        self.resolve_mut(handle)?.delete_subtree(handle)
    }

    /// Delete every entity of a type, regardless of references.
    ///
    /// Returns the number of entities deleted.
    pub fn clear(&mut self, type_id: EntityTypeId) -> Result<usize, RegistryError> {
        let storage = self.storage_mut(type_id)?;
        let freed = storage.clear();
        debug!(%type_id, name = %storage.label(), freed, "type cleared");
        Ok(freed)
    }

    // ── Update ──────────────────────────────────────────────────

    /// Run the type's update callback on one entity.
    pub fn update(
        &mut self,
        handle: Handle,
        caller: Option<Handle>,
        clock: &ClockInfo,
    ) -> Result<(), RegistryError> {
        if let Some(caller) = caller {
            self.resolve(caller)?;
        }
        let storage = self.resolve_mut(handle)?;
        let type_id = storage.type_id;
        let TypeStorage {
            records, update, ..
        } = &mut *storage;
        let Some(update) = update.as_mut() else {
            warn!(%type_id, "update requested for a type without an update function");
            return Err(RegistryError::NoUpdateFunction { type_id });
        };
        let payload = records.payload_mut(handle.slot)?;
        let result = update(UpdateArgs {
            entity: handle,
            caller,
            payload,
            clock,
        });
        storage.record_update_call();
        result.map_err(|err| {
            warn!(%handle, %err, "update callback failed");
            err.into()
        })
    }

    // ── Navigation ──────────────────────────────────────────────

    /// Head of a list type, or root of a tree type.
    pub fn first(&self, type_id: EntityTypeId) -> Result<Option<Handle>, RegistryError> {
        let storage = self.storage(type_id)?;
        let node = match &storage.topology {
            Topology::List(list) => list.first(),
            Topology::Tree(tree) => tree.root(),
        };
        Ok(storage.entity_of(node))
    }

    /// Tail of a list type.
    pub fn last(&self, type_id: EntityTypeId) -> Result<Option<Handle>, RegistryError> {
        let storage = self.storage(type_id)?;
        Ok(storage.entity_of(storage.list()?.last()))
    }

    /// Next entity in a list type.
    pub fn next(&self, handle: Handle) -> Result<Option<Handle>, RegistryError> {
        let storage = self.resolve(handle)?;
        let list = storage.list()?;
        Ok(storage.entity_of(list.next(storage.node(handle)?)?))
    }

    /// Previous entity in a list type.
    pub fn previous(&self, handle: Handle) -> Result<Option<Handle>, RegistryError> {
        let storage = self.resolve(handle)?;
        let list = storage.list()?;
        Ok(storage.entity_of(list.previous(storage.node(handle)?)?))
    }

    /// Parent of a tree entity.
    pub fn parent(&self, handle: Handle) -> Result<Option<Handle>, RegistryError> {
        let storage = self.resolve(handle)?;
        let tree = storage.tree()?;
        Ok(storage.entity_of(tree.parent(storage.node(handle)?)?))
    }

    /// First child of a tree entity.
    pub fn child(&self, handle: Handle) -> Result<Option<Handle>, RegistryError> {
        let storage = self.resolve(handle)?;
        let tree = storage.tree()?;
        Ok(storage.entity_of(tree.child(storage.node(handle)?)?))
    }

    /// Next sibling of a tree entity.
    pub fn sibling(&self, handle: Handle) -> Result<Option<Handle>, RegistryError> {
        let storage = self.resolve(handle)?;
        let tree = storage.tree()?;
        Ok(storage.entity_of(tree.sibling(storage.node(handle)?)?))
    }

    /// Move a tree entity (with its subtree) under `parent` as its first
    /// child.
    ///
    /// Both entities must be of the same type. Fails without changes if
    /// `parent` is `handle` itself or one of its descendants.
    pub fn set_parent(&mut self, handle: Handle, parent: Handle) -> Result<(), RegistryError> {
        if handle.tag() != parent.tag() {
            error!(%handle, %parent, "reparent across types");
            return Err(RegistryError::CrossType {
                handle,
                other: parent,
            });
        }
        let storage = self.resolve_mut(handle)?;
        storage.tree()?;
        let node = storage.node(handle)?;
        let parent_node = storage.node(parent)?;
        let result = storage.tree_mut()?.move_as_child(parent_node, node);
        if let Err(TopologyError::WouldCycle { .. }) = result {
            storage.record_rejected_reparent();
        }
        Ok(result?)
    }

    // ── Entity state ────────────────────────────────────────────

    /// Payload bytes of an entity.
    pub fn payload(&self, handle: Handle) -> Result<&[u8], RegistryError> {
        Ok(self.resolve(handle)?.records.payload(handle.slot)?)
    }

    /// Mutable payload bytes of an entity.
    pub fn payload_mut(&mut self, handle: Handle) -> Result<&mut [u8], RegistryError> {
        Ok(self.resolve_mut(handle)?.records.payload_mut(handle.slot)?)
    }

    /// Add a reference. Returns the new count.
    pub fn increase_ref(&mut self, handle: Handle) -> Result<u32, RegistryError> {
        let header = self.resolve_mut(handle)?.header_mut(handle)?;
        header.ref_count = header.ref_count.saturating_add(1);
        Ok(header.ref_count)
    }

    /// Release a reference. Returns the new count.
    pub fn decrease_ref(&mut self, handle: Handle) -> Result<u32, RegistryError> {
        let header = self.resolve_mut(handle)?.header_mut(handle)?;
        if header.ref_count == 0 {
            error!(%handle, "reference count underflow");
            return Err(RegistryError::RefCountUnderflow { handle });
        }
        header.ref_count -= 1;
        Ok(header.ref_count)
    }

    /// Outstanding references to an entity.
    pub fn ref_count(&self, handle: Handle) -> Result<u32, RegistryError> {
        Ok(self.resolve(handle)?.header(handle)?.ref_count)
    }

    /// Set the bits in `add`, then clear the bits in `remove`. Returns the
    /// new flag word.
    pub fn set_flags(&mut self, handle: Handle, add: u32, remove: u32) -> Result<u32, RegistryError> {
        let header = self.resolve_mut(handle)?.header_mut(handle)?;
        header.flags = (header.flags | add) & !remove;
        Ok(header.flags)
    }

    /// Whether every bit of `mask` is set.
    pub fn test_flags(&self, handle: Handle, mask: u32) -> Result<bool, RegistryError> {
        let flags = self.resolve(handle)?.header(handle)?.flags;
        Ok(flags & mask == mask)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            config: RegistryConfig::default(),
            storages: IndexMap::new(),
            next_epoch: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::UpdateError;
    use std::cell::Cell;
    use std::rc::Rc;
    use stowage_arena::{Growth, PoolError};

    const WIDGET: EntityTypeId = EntityTypeId(1);
    const NODE: EntityTypeId = EntityTypeId(2);

    fn registry() -> Registry {
        let mut reg = Registry::default();
        reg.register(
            TypeRegistration::new(WIDGET, TopologyKind::List, 16)
                .with_name("widget")
                .with_capacity(4),
        )
        .unwrap();
        reg.register(TypeRegistration::new(NODE, TopologyKind::Tree, 8).with_name("node"))
            .unwrap();
        reg
    }

    fn list_order(reg: &Registry) -> Vec<Handle> {
        let mut out = Vec::new();
        let mut cursor = reg.first(WIDGET).unwrap();
        while let Some(h) = cursor {
            out.push(h);
            cursor = reg.next(h).unwrap();
        }
        out
    }

    #[test]
    fn list_capacity_and_slot_reuse() {
        let mut reg = registry();
        let handles: Vec<_> = (0..4).map(|_| reg.create(WIDGET).unwrap()).collect();
        assert_eq!(reg.number(WIDGET).unwrap(), 4);

        assert!(matches!(
            reg.create(WIDGET),
            Err(RegistryError::Pool(PoolError::Exhausted { capacity: 4 }))
        ));
        assert_eq!(reg.number(WIDGET).unwrap(), 4);

        reg.delete(handles[1]).unwrap();
        assert_eq!(reg.number(WIDGET).unwrap(), 3);

        let again = reg.create(WIDGET).unwrap();
        assert_eq!(again.slot().index(), handles[1].slot().index());
        assert_ne!(again, handles[1]);
        assert_eq!(reg.number(WIDGET).unwrap(), 4);
    }

    #[test]
    fn list_create_prepends() {
        let mut reg = registry();
        let a = reg.create(WIDGET).unwrap();
        let b = reg.create(WIDGET).unwrap();
        let c = reg.create(WIDGET).unwrap();
        assert_eq!(list_order(&reg), vec![c, b, a]);
        assert_eq!(reg.last(WIDGET).unwrap(), Some(a));
        assert_eq!(reg.previous(a).unwrap(), Some(b));
        assert_eq!(reg.previous(c).unwrap(), None);
    }

    #[test]
    fn tree_create_roots_then_children() {
        let mut reg = registry();
        let root = reg.create(NODE).unwrap();
        let a = reg.create(NODE).unwrap();
        let b = reg.create(NODE).unwrap();
        assert_eq!(reg.first(NODE).unwrap(), Some(root));
        assert_eq!(reg.parent(a).unwrap(), Some(root));
        assert_eq!(reg.child(root).unwrap(), Some(b));
        assert_eq!(reg.sibling(b).unwrap(), Some(a));
        assert_eq!(reg.number(NODE).unwrap(), 3);
    }

    #[test]
    fn reparent_onto_descendant_rejected() {
        let mut reg = registry();
        let r = reg.create(NODE).unwrap();
        let a = reg.create(NODE).unwrap();
        let b = reg.create(NODE).unwrap();
        reg.set_parent(b, a).unwrap();

        let err = reg.set_parent(r, b).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Topology(TopologyError::WouldCycle { .. })
        ));
        assert_eq!(reg.parent(r).unwrap(), None);
        assert_eq!(reg.child(a).unwrap(), Some(b));
        assert_eq!(reg.metrics(NODE).unwrap().rejected_reparents, 1);
    }

    #[test]
    fn wrong_topology_accessors_rejected() {
        let mut reg = registry();
        let w = reg.create(WIDGET).unwrap();
        let n = reg.create(NODE).unwrap();
        assert!(matches!(
            reg.parent(w),
            Err(RegistryError::TopologyMismatch {
                expected: TopologyKind::Tree,
                actual: TopologyKind::List,
                ..
            })
        ));
        assert!(matches!(
            reg.next(n),
            Err(RegistryError::TopologyMismatch { .. })
        ));
        assert!(matches!(
            reg.last(NODE),
            Err(RegistryError::TopologyMismatch { .. })
        ));
    }

    #[test]
    fn unregistered_type_rejected() {
        let mut reg = registry();
        let ghost = EntityTypeId(9);
        assert_eq!(
            reg.create(ghost),
            Err(RegistryError::InvalidType { type_id: ghost })
        );
        assert!(reg.number(ghost).is_err());
        assert!(reg.storage_type(ghost).is_err());
    }

    #[test]
    fn double_registration_rejected() {
        let mut reg = registry();
        assert_eq!(
            reg.register(TypeRegistration::new(WIDGET, TopologyKind::Tree, 4)),
            Err(RegistryError::AlreadyRegistered { type_id: WIDGET })
        );
        assert_eq!(reg.storage_type(WIDGET).unwrap(), TopologyKind::List);
    }

    #[test]
    fn invalid_registration_rejected() {
        let mut reg = registry();
        assert!(matches!(
            reg.register(TypeRegistration::new(EntityTypeId(5), TopologyKind::List, 0)),
            Err(RegistryError::Config(_))
        ));
        assert!(!reg.is_registered(EntityTypeId(5)));
    }

    #[test]
    fn double_delete_is_stale() {
        let mut reg = registry();
        let h = reg.create(WIDGET).unwrap();
        reg.delete(h).unwrap();
        assert!(matches!(
            reg.delete(h),
            Err(RegistryError::StaleHandle { .. })
        ));
        assert_eq!(reg.number(WIDGET).unwrap(), 0);
    }

    #[test]
    fn forged_handle_rejected() {
        let mut reg = registry();
        let h = reg.create(WIDGET).unwrap();
        let forged = Handle::from_bits(h.to_bits() & !(0xFFFF_u128 << 112));
        assert!(matches!(
            reg.payload(forged),
            Err(RegistryError::InvalidTag { .. })
        ));
    }

    #[test]
    fn handle_of_other_type_rejected() {
        let mut reg = registry();
        let w = reg.create(WIDGET).unwrap();
        let n = reg.create(NODE).unwrap();
        assert!(matches!(
            reg.set_parent(n, w),
            Err(RegistryError::CrossType { .. })
        ));
    }

    #[test]
    fn unregister_expires_handles() {
        let mut reg = registry();
        let h = reg.create(WIDGET).unwrap();
        reg.unregister(WIDGET).unwrap();
        assert_eq!(
            reg.payload(h),
            Err(RegistryError::InvalidType { type_id: WIDGET })
        );

        reg.register(TypeRegistration::new(WIDGET, TopologyKind::List, 16))
            .unwrap();
        let fresh = reg.create(WIDGET).unwrap();
        assert_eq!(fresh.slot(), h.slot());
        assert!(matches!(
            reg.payload(h),
            Err(RegistryError::ExpiredHandle { .. })
        ));
        assert!(reg.payload(fresh).is_ok());
    }

    #[test]
    fn unregister_unknown_type_fails() {
        let mut reg = Registry::default();
        assert!(reg.unregister(WIDGET).is_err());
    }

    #[test]
    fn registered_types_keep_order() {
        let mut reg = registry();
        reg.unregister(WIDGET).unwrap();
        reg.register(TypeRegistration::new(WIDGET, TopologyKind::List, 4))
            .unwrap();
        let types: Vec<_> = reg.registered_types().collect();
        assert_eq!(
            types,
            vec![(NODE, TopologyKind::Tree), (WIDGET, TopologyKind::List)]
        );
    }

    #[test]
    fn payload_is_zeroed_and_writable() {
        let mut reg = registry();
        let h = reg.create(WIDGET).unwrap();
        assert_eq!(reg.payload(h).unwrap(), &[0u8; 16]);
        reg.payload_mut(h).unwrap()[3] = 7;
        assert_eq!(reg.payload(h).unwrap()[3], 7);

        reg.delete(h).unwrap();
        let h2 = reg.create(WIDGET).unwrap();
        assert_eq!(reg.payload(h2).unwrap(), &[0u8; 16]);
    }

    #[test]
    fn reference_counting() {
        let mut reg = registry();
        let h = reg.create(WIDGET).unwrap();
        assert_eq!(reg.increase_ref(h).unwrap(), 1);
        assert_eq!(reg.increase_ref(h).unwrap(), 2);
        assert_eq!(reg.decrease_ref(h).unwrap(), 1);
        assert_eq!(reg.ref_count(h).unwrap(), 1);
        assert_eq!(reg.decrease_ref(h).unwrap(), 0);
        assert_eq!(
            reg.decrease_ref(h),
            Err(RegistryError::RefCountUnderflow { handle: h })
        );
        reg.delete(h).unwrap();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outstanding references")]
    fn delete_referenced_asserts_in_debug() {
        let mut reg = registry();
        let h = reg.create(WIDGET).unwrap();
        reg.increase_ref(h).unwrap();
        let _ = reg.delete(h);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn delete_referenced_errors_in_release() {
        let mut reg = registry();
        let h = reg.create(WIDGET).unwrap();
        reg.increase_ref(h).unwrap();
        assert_eq!(
            reg.delete(h),
            Err(RegistryError::StillReferenced { handle: h, count: 1 })
        );
        assert_eq!(reg.number(WIDGET).unwrap(), 1);
    }

    #[test]
    fn flags_set_clear_and_test() {
        let mut reg = registry();
        let h = reg.create(WIDGET).unwrap();
        assert_eq!(reg.set_flags(h, 0b1011, 0).unwrap(), 0b1011);
        assert_eq!(reg.set_flags(h, 0b0100, 0b0001).unwrap(), 0b1110);
        assert!(reg.test_flags(h, 0b0110).unwrap());
        assert!(!reg.test_flags(h, 0b0001).unwrap());
    }

    #[test]
    fn tree_delete_hoists_children_in_order() {
        let mut reg = registry();
        let r = reg.create(NODE).unwrap();
        let a = reg.create(NODE).unwrap();
        let x = reg.create(NODE).unwrap();
        let b = reg.create(NODE).unwrap();
        let c = reg.create(NODE).unwrap();
        reg.set_parent(b, a).unwrap();
        reg.set_parent(c, a).unwrap();
        assert_eq!(reg.child(a).unwrap(), Some(c));

        reg.delete(a).unwrap();
        assert_eq!(reg.number(NODE).unwrap(), 4);
        assert_eq!(reg.child(r).unwrap(), Some(c));
        assert_eq!(reg.sibling(c).unwrap(), Some(b));
        assert_eq!(reg.sibling(b).unwrap(), Some(x));
        assert_eq!(reg.sibling(x).unwrap(), None);
        assert_eq!(reg.parent(b).unwrap(), Some(r));
        assert_eq!(reg.parent(c).unwrap(), Some(r));
    }

    #[test]
    fn tree_delete_of_leaf_keeps_siblings() {
        let mut reg = registry();
        let r = reg.create(NODE).unwrap();
        let a = reg.create(NODE).unwrap();
        let b = reg.create(NODE).unwrap();
        reg.delete(b).unwrap();
        assert_eq!(reg.child(r).unwrap(), Some(a));
        assert_eq!(reg.sibling(a).unwrap(), None);
        assert!(reg.payload(b).is_err());
    }

    #[test]
    fn tree_root_with_children_needs_subtree_delete() {
        let mut reg = registry();
        let r = reg.create(NODE).unwrap();
        let a = reg.create(NODE).unwrap();
        let b = reg.create(NODE).unwrap();
        reg.set_parent(b, a).unwrap();

        assert!(matches!(
            reg.delete(r),
            Err(RegistryError::Topology(TopologyError::RootHasDescendants { .. }))
        ));
        assert_eq!(reg.number(NODE).unwrap(), 3);

        assert_eq!(reg.delete_subtree(r).unwrap(), 3);
        assert_eq!(reg.number(NODE).unwrap(), 0);
        assert_eq!(reg.first(NODE).unwrap(), None);
        assert!(reg.payload(b).is_err());

        let fresh = reg.create(NODE).unwrap();
        assert_eq!(reg.first(NODE).unwrap(), Some(fresh));
    }

    #[test]
    fn delete_subtree_of_inner_node() {
        let mut reg = registry();
        let r = reg.create(NODE).unwrap();
        let a = reg.create(NODE).unwrap();
        let b = reg.create(NODE).unwrap();
        let c = reg.create(NODE).unwrap();
        reg.set_parent(b, a).unwrap();
        reg.set_parent(c, b).unwrap();

        assert_eq!(reg.delete_subtree(a).unwrap(), 3);
        assert_eq!(reg.child(r).unwrap(), None);
        assert_eq!(reg.number(NODE).unwrap(), 1);
        assert_eq!(reg.metrics(NODE).unwrap().deletes, 3);
    }

    #[test]
    fn delete_subtree_on_list_rejected() {
        let mut reg = registry();
        let w = reg.create(WIDGET).unwrap();
        assert!(matches!(
            reg.delete_subtree(w),
            Err(RegistryError::TopologyMismatch { .. })
        ));
        assert_eq!(reg.number(WIDGET).unwrap(), 1);
    }

    #[test]
    fn clear_deletes_everything() {
        let mut reg = registry();
        let old = reg.create(NODE).unwrap();
        reg.create(NODE).unwrap();
        reg.increase_ref(old).unwrap();
        assert_eq!(reg.clear(NODE).unwrap(), 2);
        assert_eq!(reg.number(NODE).unwrap(), 0);
        assert!(reg.payload(old).is_err());
        assert_eq!(reg.first(NODE).unwrap(), None);
    }

    #[test]
    fn update_passes_payload_and_clock() {
        let seen = Rc::new(Cell::new(0.0));
        let seen_in = Rc::clone(&seen);
        let mut reg = Registry::default();
        reg.register(
            TypeRegistration::new(WIDGET, TopologyKind::List, 4).with_update(move |args| {
                args.payload[0] += 1;
                seen_in.set(args.clock.dt);
                Ok(())
            }),
        )
        .unwrap();

        let h = reg.create(WIDGET).unwrap();
        let clock = ClockInfo::default().advance(0.5);
        reg.update(h, None, &clock).unwrap();
        reg.update(h, Some(h), &clock).unwrap();
        assert_eq!(reg.payload(h).unwrap()[0], 2);
        assert_eq!(seen.get(), 0.5);
        assert_eq!(reg.metrics(WIDGET).unwrap().update_calls, 2);
    }

    #[test]
    fn update_without_callback_fails() {
        let mut reg = registry();
        let h = reg.create(WIDGET).unwrap();
        assert_eq!(
            reg.update(h, None, &ClockInfo::default()),
            Err(RegistryError::NoUpdateFunction { type_id: WIDGET })
        );
    }

    #[test]
    fn update_error_propagates() {
        let mut reg = Registry::default();
        reg.register(
            TypeRegistration::new(WIDGET, TopologyKind::List, 4)
                .with_update(|_| Err(UpdateError::failed("boom"))),
        )
        .unwrap();
        let h = reg.create(WIDGET).unwrap();
        assert_eq!(
            reg.update(h, None, &ClockInfo::default()),
            Err(RegistryError::Update(UpdateError::failed("boom")))
        );
    }

    #[test]
    fn update_with_stale_caller_fails() {
        let mut reg = Registry::default();
        reg.register(TypeRegistration::new(WIDGET, TopologyKind::List, 4).with_update(|_| Ok(())))
            .unwrap();
        let h = reg.create(WIDGET).unwrap();
        let gone = reg.create(WIDGET).unwrap();
        reg.delete(gone).unwrap();
        assert!(matches!(
            reg.update(h, Some(gone), &ClockInfo::default()),
            Err(RegistryError::StaleHandle { .. })
        ));
        assert_eq!(reg.metrics(WIDGET).unwrap().update_calls, 0);
    }

    #[test]
    fn growable_type_grows() {
        let mut reg = Registry::default();
        reg.register(
            TypeRegistration::new(WIDGET, TopologyKind::List, 4)
                .with_capacity(1)
                .with_growth(Growth::Chunked(2)),
        )
        .unwrap();
        for _ in 0..5 {
            reg.create(WIDGET).unwrap();
        }
        let m = reg.metrics(WIDGET).unwrap();
        assert_eq!(m.live, 5);
        assert_eq!(m.capacity, 5);
        assert_eq!(m.high_water, 5);
        assert_eq!(m.creates, 5);
    }

    #[test]
    fn metrics_track_failures() {
        let mut reg = registry();
        for _ in 0..4 {
            reg.create(WIDGET).unwrap();
        }
        let _ = reg.create(WIDGET);
        let m = reg.metrics(WIDGET).unwrap();
        assert_eq!(m.failed_creates, 1);
        assert_eq!(m.live, 4);
        assert!(m.memory_bytes >= 4 * 16);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn create_then_delete_restores_count(
                pre in 0usize..4,
                tree in any::<bool>(),
                order in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
            ) {
                let mut reg = registry();
                let ty = if tree { NODE } else { WIDGET };
                let mut live: Vec<Handle> = (0..pre).map(|_| reg.create(ty).unwrap()).collect();
                let before = reg.number(ty).unwrap();

                if let Ok(h) = reg.create(ty) {
                    prop_assert_eq!(reg.number(ty).unwrap(), before + 1);
                    reg.delete(h).unwrap();
                }
                prop_assert_eq!(reg.number(ty).unwrap(), before);

                // Delete the rest in arbitrary order, leaves before roots.
                for idx in order {
                    if live.is_empty() {
                        break;
                    }
                    let h = live[idx.index(live.len())];
                    if reg.first(ty).unwrap() == Some(h) && live.len() > 1 {
                        continue;
                    }
                    reg.delete(h).unwrap();
                    live.retain(|x| *x != h);
                    prop_assert_eq!(reg.number(ty).unwrap(), live.len());
                }
            }
        }
    }
}
