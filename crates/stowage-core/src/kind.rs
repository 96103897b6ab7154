//! Storage topology kinds and memory classes.

use std::fmt;

/// Container discipline used to link the entities of one type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TopologyKind {
    /// Doubly-linked list: O(1) insert/remove, insertion-ordered iteration.
    List,
    /// Single-root n-ary tree with parent/child/sibling navigation.
    Tree,
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Tree => write!(f, "tree"),
        }
    }
}

/// Memory class a pool is accounted against.
///
/// The class does not change how memory is obtained; it tags pools so that
/// per-class budgets and metrics can be reported separately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MemoryClass {
    /// General-purpose engine memory.
    #[default]
    Main,
    /// Memory mirrored by GPU-side resources.
    Video,
    /// Sprite and texture metadata.
    Sprite,
    /// Short-lived scratch allocations.
    Temp,
}

impl fmt::Display for MemoryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Video => write!(f, "video"),
            Self::Sprite => write!(f, "sprite"),
            Self::Temp => write!(f, "temp"),
        }
    }
}
