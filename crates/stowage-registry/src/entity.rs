//! Entity handles and record headers.
//!
//! A [`Handle`] is the only way callers refer to an entity. It carries the
//! entity's [`TypeTag`], the registration epoch of its storage, and the
//! generational slot of its record. All three are checked on every
//! registry call.

use std::fmt;

use stowage_arena::SlotHandle;
use stowage_core::{EntityTypeId, TopologyKind, TypeTag};
use stowage_topology::NodeId;

/// Opaque, validated reference to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    pub(crate) tag: TypeTag,
    pub(crate) epoch: u32,
    pub(crate) slot: SlotHandle,
}

impl Handle {
    /// The handle's type tag.
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// The type id encoded in the tag, if the tag is well formed.
    pub fn type_id(&self) -> Option<EntityTypeId> {
        self.tag.decode()
    }

    /// The record slot this handle names.
    pub fn slot(&self) -> SlotHandle {
        self.slot
    }

    /// Pack into a `u128` for passing through opaque boundaries.
    ///
    /// Layout, high to low: tag (32), epoch (32), generation (32), index (32).
    pub fn to_bits(self) -> u128 {
        ((self.tag.raw() as u128) << 96) | ((self.epoch as u128) << 64) | self.slot.to_bits() as u128
    }

    /// Unpack a value produced by [`to_bits`](Self::to_bits).
    ///
    /// Any bit pattern decodes; the registry rejects handles that do not
    /// name a live entity.
    pub fn from_bits(bits: u128) -> Self {
        Self {
            tag: TypeTag::from_raw((bits >> 96) as u32),
            epoch: (bits >> 64) as u32,
            slot: SlotHandle::from_bits(bits as u64),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag.decode() {
            Some(type_id) => write!(
                f,
                "Entity(type={type_id}, idx={}, gen={})",
                self.slot.index(),
                self.slot.generation()
            ),
            None => write!(f, "Entity({}, idx={})", self.tag, self.slot.index()),
        }
    }
}

/// The storage node an entity is linked through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StorageNode {
    List(NodeId),
    Tree(NodeId),
}

impl StorageNode {
    pub(crate) fn kind(self) -> TopologyKind {
        match self {
            StorageNode::List(_) => TopologyKind::List,
            StorageNode::Tree(_) => TopologyKind::Tree,
        }
    }
}

/// Fixed header stored alongside every entity payload.
#[derive(Clone, Debug)]
pub(crate) struct EntityHeader {
    pub(crate) tag: TypeTag,
    /// `None` only while a create is in progress.
    pub(crate) node: Option<StorageNode>,
    pub(crate) ref_count: u32,
    pub(crate) flags: u32,
}

impl EntityHeader {
    pub(crate) fn new(tag: TypeTag) -> Self {
        Self {
            tag,
            node: None,
            ref_count: 0,
            flags: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip() {
        let h = Handle {
            tag: TypeTag::new(EntityTypeId(12)),
            epoch: 7,
            slot: SlotHandle::new(3, 9),
        };
        let back = Handle::from_bits(h.to_bits());
        assert_eq!(back, h);
        assert_eq!(back.type_id(), Some(EntityTypeId(12)));
    }

    #[test]
    fn garbage_bits_have_no_type() {
        let h = Handle::from_bits(0x1234);
        assert_eq!(h.type_id(), None);
        assert!(h.to_string().contains("invalid"));
    }

    #[test]
    fn display_names_type_and_slot() {
        let h = Handle {
            tag: TypeTag::new(EntityTypeId(4)),
            epoch: 1,
            slot: SlotHandle::new(2, 0),
        };
        assert_eq!(h.to_string(), "Entity(type=4, idx=2, gen=0)");
    }
}
