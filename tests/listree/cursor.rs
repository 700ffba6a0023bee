//! Integration tests for path cursors
//!
//! Tests resolution, insertion, iteration, and removal through paths.

use edict_listree::{End, ErrorKind, Node, Path, PathCursor, dump};

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn nested_insert_builds_intermediate_maps() {
    let root = Node::map();
    let mut cursor = PathCursor::parse("a.b.c").unwrap();
    cursor.resolve(&root, true).unwrap().unwrap();
    cursor.assign(Node::text("deep")).unwrap();
    drop(cursor);

    assert_eq!(dump(&root), "a:\n  b:\n    c: deep\n");
    let mut lookup = PathCursor::parse("a.b.c").unwrap();
    assert_eq!(lookup.resolve(&root, false).unwrap().unwrap().text_lossy(), "deep");
}

#[test]
fn unassigned_placeholders_vanish_when_cursor_drops() {
    let root = Node::map();
    root.put(Some(b"a"), End::Tail, Node::map()).unwrap();
    {
        let mut cursor = PathCursor::parse("a.x.y").unwrap();
        assert!(cursor.resolve(&root, true).unwrap().unwrap().is_null());
    }
    let a = root.peek(Some(b"a")).unwrap();
    assert!(!a.has_entry(b"x"));
    assert!(root.has_entry(b"a"));
}

#[test]
fn missing_paths_resolve_to_none() {
    let root = Node::map();
    root.put(Some(b"a"), End::Tail, Node::map()).unwrap();
    let mut cursor = PathCursor::parse("a.missing").unwrap();
    assert!(cursor.resolve(&root, false).unwrap().is_none());
    assert!(cursor.current().is_none());
    assert!(matches!(cursor.assign(Node::null()).unwrap_err().kind, ErrorKind::NotFound(_)));
}

#[test]
fn quoted_names_may_contain_dots() {
    let root = Node::map();
    root.put(Some(b"x.y"), End::Tail, Node::text("dotted")).unwrap();
    let mut cursor = PathCursor::parse("\"x.y\"").unwrap();
    assert_eq!(cursor.resolve(&root, false).unwrap().unwrap().text_lossy(), "dotted");
}

#[test]
fn malformed_paths_report_offsets() {
    let err = Path::parse("a[open").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::PathSyntax { .. }), "{err}");
}

// =============================================================================
// Iteration and Removal
// =============================================================================

fn numbered() -> edict_listree::NodeRef {
    let root = Node::map();
    for (name, value) in [("a1", "one"), ("a2", "two"), ("a3", "three"), ("b1", "other")] {
        root.put(Some(name.as_bytes()), End::Tail, Node::text(value)).unwrap();
    }
    root
}

#[test]
fn wildcard_visits_matching_entries_in_name_order() {
    let root = numbered();
    let mut cursor = PathCursor::parse("a?").unwrap();
    let mut seen = vec![cursor.resolve(&root, false).unwrap().unwrap().text_lossy()];
    while let Some(value) = cursor.iterate(false).unwrap() {
        seen.push(value.text_lossy());
    }
    assert_eq!(seen, ["one", "two", "three"]);
}

#[test]
fn popping_iteration_removes_matches_only() {
    let root = numbered();
    let mut cursor = PathCursor::parse("a*").unwrap();
    let mut count = usize::from(cursor.resolve(&root, false).unwrap().is_some());
    while cursor.iterate(true).unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 3);
    assert!(!root.has_entry(b"a1"));
    assert!(!root.has_entry(b"a3"));
    assert!(root.has_entry(b"b1"));
}

#[test]
fn assign_replaces_value_in_place() {
    let root = Node::map();
    root.enqueue(Some(b"k"), Node::text("first")).unwrap();
    root.enqueue(Some(b"k"), Node::text("second")).unwrap();
    let mut cursor = PathCursor::parse("k").unwrap();
    cursor.resolve(&root, false).unwrap();
    let old = cursor.assign(Node::text("replaced")).unwrap();
    assert_eq!(old.text_lossy(), "first");
    assert_eq!(root.values_len(Some(b"k")), 2);
    assert_eq!(root.dequeue(Some(b"k")).unwrap().unwrap().text_lossy(), "replaced");
}

#[test]
fn remove_then_resolve_misses() {
    let root = numbered();
    let mut cursor = PathCursor::parse("b1").unwrap();
    cursor.resolve(&root, false).unwrap();
    cursor.remove().unwrap();
    assert!(cursor.resolve(&root, false).unwrap().is_none());
}
