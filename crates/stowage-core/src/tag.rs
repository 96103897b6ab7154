//! Validated type tags.
//!
//! A [`TypeTag`] combines an [`EntityTypeId`] with a magic constant in the
//! high half of a `u32`. Every entity record stores its tag, and every
//! handle carries a copy; the registry decodes and compares both on each
//! call, so a forged or corrupted handle is rejected instead of being
//! interpreted as a different type.

use std::fmt;

use crate::id::EntityTypeId;

/// Type ID stamped with a magic validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag(u32);

impl TypeTag {
    /// Magic constant occupying the high 16 bits of every valid tag.
    pub const MAGIC: u32 = 0xD7A5_0000;

    const MAGIC_MASK: u32 = 0xFFFF_0000;

    /// Stamp a type ID with the magic validator.
    pub fn new(type_id: EntityTypeId) -> Self {
        Self(Self::MAGIC | type_id.0 as u32)
    }

    /// Reinterpret raw bits as a tag without validating them.
    ///
    /// Use [`decode`](Self::decode) to find out whether the bits form a
    /// valid tag.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw bit pattern.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Decode the type ID, or `None` if the magic validator is missing.
    pub fn decode(self) -> Option<EntityTypeId> {
        if self.0 & Self::MAGIC_MASK == Self::MAGIC {
            Some(EntityTypeId((self.0 & !Self::MAGIC_MASK) as u16))
        } else {
            None
        }
    }

    /// Whether the magic validator is present.
    pub fn is_valid(self) -> bool {
        self.decode().is_some()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Some(id) => write!(f, "tag(type={id})"),
            None => write!(f, "tag(invalid {:#010x})", self.0),
        }
    }
}
