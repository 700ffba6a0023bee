//! Integration tests for the name index
//!
//! Checks ordered queries against a `BTreeSet` model.

use std::collections::BTreeSet;
use std::ops::Bound;

use edict_listree::NameIndex;
use proptest::prelude::*;

fn key(n: u8) -> Vec<u8> {
    format!("n{n:02}").into_bytes()
}

#[test]
fn bounds_on_empty_index() {
    let index = NameIndex::new();
    assert!(index.first().is_none());
    assert!(index.lower_bound(b"a").unwrap().is_none());
    assert!(index.successor(b"a").unwrap().is_none());
}

#[test]
fn drain_returns_entries_in_order() {
    let mut index = NameIndex::new();
    for n in [5, 1, 9, 3] {
        index.find_or_insert(&key(n)).unwrap();
    }
    let drained: Vec<Vec<u8>> = index
        .drain()
        .into_iter()
        .map(|e| e.name().as_bytes().to_vec())
        .collect();
    assert_eq!(drained, [key(1), key(3), key(5), key(9)]);
    assert!(index.is_empty());
}

proptest! {
    #[test]
    fn ordered_queries_match_model(
        inserts in prop::collection::vec(0u8..64, 0..80),
        removes in prop::collection::vec(0u8..64, 0..40),
        needle in 0u8..64,
    ) {
        let mut index = NameIndex::new();
        let mut model = BTreeSet::new();
        for n in inserts {
            index.find_or_insert(&key(n)).unwrap();
            model.insert(key(n));
        }
        for n in removes {
            index.remove(&key(n)).unwrap();
            model.remove(&key(n));
        }
        prop_assert!(index.check_invariants().is_ok());
        prop_assert_eq!(index.len(), model.len());

        let names: Vec<Vec<u8>> = index.iter().map(|e| e.name().as_bytes().to_vec()).collect();
        prop_assert_eq!(&names, &model.iter().cloned().collect::<Vec<_>>());

        let needle = key(needle);
        let lower = index.lower_bound(&needle).unwrap().map(|e| e.name().as_bytes().to_vec());
        prop_assert_eq!(lower, model.range(needle.clone()..).next().cloned());
        let succ = index.successor(&needle).unwrap().map(|e| e.name().as_bytes().to_vec());
        prop_assert_eq!(
            succ,
            model.range((Bound::Excluded(needle), Bound::Unbounded)).next().cloned()
        );
    }
}
