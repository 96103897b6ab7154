//! Structural checks over a tree-backed type.

use std::collections::HashSet;

use stowage_core::EntityTypeId;
use stowage_registry::{Handle, Registry};

/// Check that a tree-backed type is a single well-formed tree.
///
/// Verifies that the root has no parent, that every child points back at
/// its parent, that no entity is visited twice, and that the number of
/// reachable entities matches the registry's count.
pub fn check_tree(registry: &Registry, type_id: EntityTypeId) -> Result<(), String> {
    let expected = registry.number(type_id).map_err(|e| e.to_string())?;
    let Some(root) = registry.first(type_id).map_err(|e| e.to_string())? else {
        return if expected == 0 {
            Ok(())
        } else {
            Err(format!("no root but {expected} entities"))
        };
    };
    if let Some(p) = registry.parent(root).map_err(|e| e.to_string())? {
        return Err(format!("root {root} has parent {p}"));
    }

    let mut seen: HashSet<Handle> = HashSet::new();
    let mut stack = vec![root];
    while let Some(h) = stack.pop() {
        if !seen.insert(h) {
            return Err(format!("{h} reached twice"));
        }
        let mut child = registry.child(h).map_err(|e| e.to_string())?;
        while let Some(c) = child {
            let parent = registry.parent(c).map_err(|e| e.to_string())?;
            if parent != Some(h) {
                return Err(format!("{c} is a child of {h} but its parent is {parent:?}"));
            }
            stack.push(c);
            child = registry.sibling(c).map_err(|e| e.to_string())?;
        }
    }

    if seen.len() != expected {
        return Err(format!("reached {} entities, count is {expected}", seen.len()));
    }
    Ok(())
}
