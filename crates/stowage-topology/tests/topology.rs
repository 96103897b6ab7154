//! Cross-module behaviour of the list and tree topologies.

use stowage_arena::PoolConfig;
use stowage_topology::{List, NodeState, RemoveMode, TopologyError, Tree};

#[test]
fn reparent_onto_descendant_leaves_tree_intact() {
    let mut tree = Tree::new(PoolConfig::new(8)).unwrap();
    let r = tree.insert("R").unwrap();
    let a = tree.insert("A").unwrap();
    let b = tree.insert("B").unwrap();
    tree.add_root(r).unwrap();
    tree.add_child(r, a).unwrap();
    tree.add_child(a, b).unwrap();

    let err = tree.move_as_child(b, r).unwrap_err();
    assert!(matches!(err, TopologyError::WouldCycle { .. }));
    assert_eq!(tree.parent(r).unwrap(), None);
    assert_eq!(tree.child(a).unwrap(), Some(b));
    assert_eq!(tree.len(), 3);
}

#[test]
fn new_root_adopts_old_root() {
    let mut tree = Tree::new(PoolConfig::new(8)).unwrap();
    let n1 = tree.insert(1).unwrap();
    let n2 = tree.insert(2).unwrap();
    tree.add_root(n1).unwrap();
    tree.add_root(n2).unwrap();

    assert_eq!(tree.child(n2).unwrap(), Some(n1));
    assert_eq!(tree.parent(n1).unwrap(), Some(n2));
    assert_eq!(tree.state(n1).unwrap(), NodeState::Attached);
    assert_eq!(tree.state(n2).unwrap(), NodeState::Root);
}

#[test]
fn tree_drains_leaf_first() {
    let mut tree = Tree::new(PoolConfig::new(8)).unwrap();
    let root = tree.insert(0).unwrap();
    tree.add_root(root).unwrap();
    let mut parent = root;
    for v in 1..5 {
        let n = tree.insert(v).unwrap();
        tree.add_child(parent, n).unwrap();
        parent = n;
    }

    let mut order: Vec<_> = tree.descendants(root).unwrap().collect();
    order.reverse();
    for n in order {
        tree.remove(n, RemoveMode::Full).unwrap();
        tree.release(n).unwrap();
    }
    assert!(tree.is_empty());
    assert_eq!(tree.node_count(), 0);
}

#[test]
fn nodes_do_not_cross_topologies() {
    let mut list = List::new(PoolConfig::new(2)).unwrap();
    let mut other = List::new(PoolConfig::new(2)).unwrap();
    let a = list.insert('a').unwrap();
    list.add_start(a).unwrap();
    let b = other.insert('b').unwrap();
    other.add_start(b).unwrap();

    assert!(matches!(
        list.add_after(a, b),
        Err(TopologyError::ForeignNode { .. })
    ));
    assert_eq!(list.len(), 1);
    assert_eq!(other.len(), 1);
}

#[test]
fn list_slot_reuse_invalidates_old_node_ids() {
    let mut list = List::new(PoolConfig::new(1)).unwrap();
    let a = list.insert(1).unwrap();
    list.release(a).unwrap();
    let b = list.insert(2).unwrap();

    assert_eq!(a.slot().index(), b.slot().index());
    assert!(matches!(
        list.add_start(a),
        Err(TopologyError::StaleNode { .. })
    ));
    list.add_start(b).unwrap();
    assert_eq!(list.item(b), Some(&2));
}
