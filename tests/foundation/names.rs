//! Integration tests for names and wildcard patterns

use edict_foundation::Name;
use edict_foundation::pattern::{is_wildcard, matches, unescape};
use proptest::prelude::*;

// =============================================================================
// Names
// =============================================================================

#[test]
fn names_sort_bytewise() {
    let mut names: Vec<Name> = [&b"b"[..], b"a2", b"a", b"a10", b"\xff", b""]
        .into_iter()
        .map(Name::new)
        .collect();
    names.sort();
    let sorted: Vec<&[u8]> = names.iter().map(Name::as_bytes).collect();
    assert_eq!(sorted, [&b""[..], b"a", b"a10", b"a2", b"b", b"\xff"]);
}

#[test]
fn long_names_are_kept_whole() {
    let long = vec![b'x'; 100];
    let name = Name::new(&long);
    assert_eq!(name.len(), 100);
    assert_eq!(name.as_bytes(), &long[..]);
}

// =============================================================================
// Patterns
// =============================================================================

#[test]
fn wildcards_select_numbered_names() {
    let names = [&b"a1"[..], b"a2", b"a3", b"b1", b"a"];
    let hits: Vec<&[u8]> = names.into_iter().filter(|n| matches(b"a?", n)).collect();
    assert_eq!(hits, [&b"a1"[..], b"a2", b"a3"]);
}

#[test]
fn escapes_make_wildcards_literal() {
    assert!(!is_wildcard(br"a\*"));
    assert_eq!(unescape(br"a\*"), b"a*");
    assert!(matches(br"a\*", b"a*"));
    assert!(!matches(br"a\*", b"ab"));
}

proptest! {
    #[test]
    fn name_order_matches_byte_order(
        a in prop::collection::vec(any::<u8>(), 0..6),
        b in prop::collection::vec(any::<u8>(), 0..6),
    ) {
        prop_assert_eq!(Name::new(&a).cmp(&Name::new(&b)), a.cmp(&b));
    }

    #[test]
    fn star_matches_everything(text in prop::collection::vec(any::<u8>(), 0..16)) {
        prop_assert!(matches(b"*", &text));
    }
}
