//! Integration tests for tree nodes
//!
//! Tests container promotion, sharing, traversal, copy, and dump.

use edict_listree::{End, ErrorKind, Node, Repeat, deep_copy, dump, traverse};

// =============================================================================
// Containers
// =============================================================================

#[test]
fn null_promotes_to_map_on_named_insert() {
    let node = Node::null();
    node.put(Some(b"k"), End::Tail, Node::text("v")).unwrap();
    assert!(node.is_map());
    assert_eq!(node.peek(Some(b"k")).unwrap().text_lossy(), "v");
}

#[test]
fn null_promotes_to_list_on_anonymous_insert() {
    let node = Node::null();
    node.enqueue(None, Node::text("a")).unwrap();
    node.enqueue(None, Node::text("b")).unwrap();
    assert!(node.is_list());
    assert_eq!(node.dequeue(None).unwrap().unwrap().text_lossy(), "a");
}

#[test]
fn leaves_with_data_are_not_containers() {
    let leaf = Node::text("data");
    let err = leaf.put(Some(b"k"), End::Tail, Node::null()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotAContainer(_)));
}

#[test]
fn frozen_values_reject_mutation() {
    let frozen = Node::frozen(b"constant");
    assert!(frozen.is_read_only());
    let err = frozen.put(None, End::Tail, Node::null()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReadOnly));
    assert_eq!(frozen.text_lossy(), "constant");
}

#[test]
fn named_entries_hold_queues() {
    let root = Node::map();
    for v in ["1", "2", "3"] {
        root.enqueue(Some(b"q"), Node::text(v)).unwrap();
    }
    root.push(Some(b"q"), Node::text("0")).unwrap();
    assert_eq!(root.values_len(Some(b"q")), 4);
    assert_eq!(root.pop(Some(b"q")).unwrap().unwrap().text_lossy(), "0");
    assert_eq!(root.dequeue(Some(b"q")).unwrap().unwrap().text_lossy(), "1");
    assert_eq!(root.get(Some(b"q"), End::Tail, true, None).unwrap().unwrap().text_lossy(), "3");
    assert_eq!(root.dequeue(Some(b"q")).unwrap().unwrap().text_lossy(), "2");
    assert!(!root.has_entry(b"q"));
}

#[test]
fn pattern_get_picks_first_match_from_end() {
    let root = Node::map();
    for v in ["apple", "banana", "avocado"] {
        root.enqueue(Some(b"fruit"), Node::text(v)).unwrap();
    }
    let hit = root.get(Some(b"fruit"), End::Tail, true, Some(b"a*")).unwrap().unwrap();
    assert_eq!(hit.text_lossy(), "avocado");
    assert_eq!(root.values_len(Some(b"fruit")), 2);
    assert!(root.get(Some(b"fruit"), End::Head, false, Some(b"z*")).unwrap().is_none());
}

#[test]
fn shared_values_are_visible_through_every_link() {
    let shared = Node::map();
    let a = Node::map();
    let b = Node::map();
    a.put(Some(b"s"), End::Tail, shared.clone()).unwrap();
    b.put(Some(b"s"), End::Tail, shared.clone()).unwrap();
    shared.put(Some(b"x"), End::Tail, Node::text("1")).unwrap();
    assert!(Node::same(&a.peek(Some(b"s")).unwrap(), &b.peek(Some(b"s")).unwrap()));
    assert!(b.peek(Some(b"s")).unwrap().has_entry(b"x"));
}

// =============================================================================
// Traversal, Copy, Dump
// =============================================================================

#[test]
fn traversal_reports_shared_and_cyclic_nodes() {
    let root = Node::map();
    let shared = Node::text("s");
    root.put(Some(b"a"), End::Tail, shared.clone()).unwrap();
    root.put(Some(b"b"), End::Tail, shared).unwrap();
    root.put(Some(b"self"), End::Tail, root.clone()).unwrap();

    let mut repeats = Vec::new();
    let entered = traverse(&[root.clone()], |v, _| repeats.extend(v.repeat), |_| {});
    assert_eq!(entered, 2);
    assert_eq!(repeats, [Repeat::Shared, Repeat::Cycle]);
    root.remove(b"self").unwrap();
}

#[test]
fn deep_copy_preserves_shape_and_sharing() {
    let root = Node::map();
    let shared = Node::list();
    shared.enqueue(None, Node::text("x")).unwrap();
    root.put(Some(b"left"), End::Tail, shared.clone()).unwrap();
    root.put(Some(b"right"), End::Tail, shared.clone()).unwrap();

    let copy = deep_copy(&root, 64).unwrap();
    assert_eq!(dump(&copy), dump(&root));
    let left = copy.peek(Some(b"left")).unwrap();
    let right = copy.peek(Some(b"right")).unwrap();
    assert!(Node::same(&left, &right));
    assert!(!Node::same(&left, &shared));

    left.enqueue(None, Node::text("y")).unwrap();
    assert_eq!(shared.child_count(), 1);
}

#[test]
fn deep_copy_of_cycle_is_a_cycle() {
    let root = Node::map();
    root.put(Some(b"me"), End::Tail, root.clone()).unwrap();
    let copy = deep_copy(&root, 64).unwrap();
    let inner = copy.peek(Some(b"me")).unwrap();
    assert!(Node::same(&inner, &copy));
    root.remove(b"me").unwrap();
    copy.remove(b"me").unwrap();
}

#[test]
fn dump_renders_nested_paths() {
    let root = Node::map();
    let b = Node::map();
    b.put(Some(b"c"), End::Tail, Node::text("deep")).unwrap();
    let a = Node::map();
    a.put(Some(b"b"), End::Tail, b).unwrap();
    root.put(Some(b"a"), End::Tail, a).unwrap();
    assert_eq!(dump(&root), "a:\n  b:\n    c: deep\n");
}
