//! Integration tests for circular lists
//!
//! Tests queue/stack usage, ring exchange, and handle stability.

use edict_foundation::{Cll, End, ErrorKind, Link};
use proptest::prelude::*;

fn values(list: &Cll<u32>) -> Vec<u32> {
    list.iter(End::Head).map(|(_, v)| *v).collect()
}

// =============================================================================
// Queue and Stack Disciplines
// =============================================================================

#[test]
fn tail_put_head_get_is_fifo() {
    let mut list = Cll::new();
    for n in 1..=4 {
        list.push(n, End::Tail);
    }
    let mut out = Vec::new();
    while let Some(link) = list.get(End::Head, true) {
        out.push(list.release(link).unwrap());
    }
    assert_eq!(out, [1, 2, 3, 4]);
    assert!(list.is_empty());
}

#[test]
fn head_put_head_get_is_lifo() {
    let mut list = Cll::new();
    for n in 1..=4 {
        list.push(n, End::Head);
    }
    let mut out = Vec::new();
    while let Some(link) = list.get(End::Head, true) {
        out.push(list.release(link).unwrap());
    }
    assert_eq!(out, [4, 3, 2, 1]);
}

#[test]
fn get_without_pop_leaves_list_intact() {
    let mut list = Cll::new();
    let a = list.push(1, End::Tail);
    list.push(2, End::Tail);
    assert_eq!(list.get(End::Head, false), Some(a));
    assert_eq!(values(&list), [1, 2]);
}

// =============================================================================
// Ring Exchange
// =============================================================================

#[test]
fn cut_element_can_be_reattached_elsewhere() {
    let mut list = Cll::new();
    let a = list.push(1, End::Tail);
    let b = list.push(2, End::Tail);
    let c = list.push(3, End::Tail);

    list.cut(b).unwrap();
    assert!(!list.is_linked(b));
    assert_eq!(values(&list), [1, 3]);

    list.splice(c, b, End::Head).unwrap();
    assert_eq!(values(&list), [1, 3, 2]);
    assert_eq!(list.next(Some(a), End::Head), Some(c));
}

#[test]
fn walking_backwards_from_the_sentinel() {
    let mut list = Cll::new();
    let links: Vec<Link> = (0..3).map(|n| list.push(n, End::Tail)).collect();
    let mut seen = Vec::new();
    let mut at = list.next(None, End::Tail);
    while let Some(link) = at {
        seen.push(link);
        at = list.next(Some(link), End::Tail);
    }
    seen.reverse();
    assert_eq!(seen, links);
}

#[test]
fn released_handles_are_stale() {
    let mut list = Cll::new();
    let a = list.push(7, End::Tail);
    assert_eq!(list.release(a).unwrap(), 7);
    let err = list.cut(a).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StaleLink(_)));
    assert!(list.value(a).is_none());
}

#[test]
fn replace_keeps_position() {
    let mut list = Cll::new();
    list.push(1, End::Tail);
    let b = list.push(2, End::Tail);
    list.push(3, End::Tail);
    assert_eq!(list.replace(b, 20).unwrap(), 2);
    assert_eq!(values(&list), [1, 20, 3]);
}

proptest! {
    #[test]
    fn put_moves_any_member_to_either_end(
        len in 1usize..12,
        pick in any::<prop::sample::Index>(),
        to_head in any::<bool>(),
    ) {
        let mut list = Cll::new();
        let links: Vec<Link> = (0..len as u32).map(|n| list.push(n, End::Tail)).collect();
        let link = links[pick.index(len)];
        let end = if to_head { End::Head } else { End::Tail };

        list.put(link, end).unwrap();
        prop_assert_eq!(list.peek(end), Some(link));
        prop_assert_eq!(list.len(), len);
        prop_assert_eq!(list.get(end, true), Some(link));
        prop_assert_eq!(list.len(), len - 1);
    }

    #[test]
    fn double_splice_restores_order(
        len in 2usize..12,
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let mut list = Cll::new();
        let links: Vec<Link> = (0..len as u32).map(|n| list.push(n, End::Tail)).collect();
        let before = values(&list);
        let (a, b) = (links[a.index(len)], links[b.index(len)]);

        list.splice(a, b, End::Head).unwrap();
        list.splice(a, b, End::Head).unwrap();
        prop_assert_eq!(values(&list), before);
    }
}
