//! Balanced name index for map-mode nodes.
//!
//! An Andersson (AA) tree stored in an arena. Slot 0 is the shared `nil`
//! node at level 0, which lets the rebalancing code compare levels without
//! special-casing missing children. Freed slots are recycled.
//!
//! Invariants checked by [`NameIndex::check_invariants`]:
//! - a node's level is exactly one more than its left child's level;
//! - a right child is at the same level or one lower;
//! - a right grandchild is strictly lower (no more than two same-level
//!   nodes chain to the right);
//! - in-order traversal is strictly increasing by name.

use std::cmp::Ordering;

use edict_foundation::name::{compare, prefix_of};
use edict_foundation::{Error, Name, Result};

use crate::entry::NamedEntry;

const NIL: u32 = 0;

#[derive(Debug)]
struct TreeNode {
    entry: Option<NamedEntry>,
    left: u32,
    right: u32,
    level: u32,
}

impl TreeNode {
    const fn nil() -> Self {
        Self {
            entry: None,
            left: NIL,
            right: NIL,
            level: 0,
        }
    }
}

/// Bookkeeping for a single delete descent.
struct Deletion<'k> {
    key: &'k [u8],
    prefix: u16,
    last: u32,
    deleted: u32,
    removed: Option<NamedEntry>,
}

/// Arena-backed AA tree of [`NamedEntry`] keyed by name.
#[derive(Debug)]
pub struct NameIndex {
    nodes: Vec<TreeNode>,
    free: Vec<u32>,
    root: u32,
    len: usize,
}

impl Default for NameIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl NameIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode::nil()],
            free: Vec::new(),
            root: NIL,
            len: 0,
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn name_at(&self, t: u32) -> Result<&Name> {
        self.nodes[t as usize]
            .entry
            .as_ref()
            .map(NamedEntry::name)
            .ok_or_else(|| Error::internal(format!("name index slot {t} is vacant")))
    }

    fn cmp_at(&self, prefix: u16, key: &[u8], t: u32) -> Result<Ordering> {
        let name = self.name_at(t)?;
        Ok(compare(prefix, key, name.prefix(), name.as_bytes()))
    }

    fn level(&self, t: u32) -> u32 {
        self.nodes[t as usize].level
    }

    fn left(&self, t: u32) -> u32 {
        self.nodes[t as usize].left
    }

    fn right(&self, t: u32) -> u32 {
        self.nodes[t as usize].right
    }

    fn alloc(&mut self, entry: NamedEntry) -> u32 {
        let node = TreeNode {
            entry: Some(entry),
            left: NIL,
            right: NIL,
            level: 1,
        };
        if let Some(t) = self.free.pop() {
            self.nodes[t as usize] = node;
            t
        } else {
            self.nodes.push(node);
            u32::try_from(self.nodes.len() - 1).unwrap_or(u32::MAX)
        }
    }

    fn free_slot(&mut self, t: u32) {
        self.nodes[t as usize] = TreeNode::nil();
        self.free.push(t);
    }

    /// Right rotation when a left child shares its parent's level.
    fn skew(&mut self, t: u32) -> u32 {
        if t == NIL {
            return t;
        }
        let l = self.left(t);
        if l != NIL && self.level(l) == self.level(t) {
            self.nodes[t as usize].left = self.right(l);
            self.nodes[l as usize].right = t;
            return l;
        }
        t
    }

    /// Left rotation and promotion when two right links share a level.
    fn split(&mut self, t: u32) -> u32 {
        if t == NIL {
            return t;
        }
        let r = self.right(t);
        if r != NIL && self.level(self.right(r)) == self.level(t) {
            self.nodes[t as usize].right = self.left(r);
            self.nodes[r as usize].left = t;
            self.nodes[r as usize].level += 1;
            return r;
        }
        t
    }

    fn find_slot(&self, key: &[u8]) -> Result<Option<u32>> {
        let prefix = prefix_of(key);
        let mut t = self.root;
        while t != NIL {
            match self.cmp_at(prefix, key, t)? {
                Ordering::Less => t = self.left(t),
                Ordering::Greater => t = self.right(t),
                Ordering::Equal => return Ok(Some(t)),
            }
        }
        Ok(None)
    }

    /// Finds the entry with the given name.
    ///
    /// # Errors
    /// Returns `Internal` if the tree links reach a vacant slot.
    pub fn find(&self, key: &[u8]) -> Result<Option<&NamedEntry>> {
        Ok(self
            .find_slot(key)?
            .and_then(|t| self.nodes[t as usize].entry.as_ref()))
    }

    /// Finds the entry with the given name, mutably.
    ///
    /// # Errors
    /// As [`NameIndex::find`].
    pub fn find_mut(&mut self, key: &[u8]) -> Result<Option<&mut NamedEntry>> {
        Ok(match self.find_slot(key)? {
            Some(t) => self.nodes[t as usize].entry.as_mut(),
            None => None,
        })
    }

    fn insert_at(&mut self, t: u32, key: &[u8], prefix: u16) -> Result<(u32, u32)> {
        if t == NIL {
            let slot = self.alloc(NamedEntry::new(Name::new(key)));
            self.len += 1;
            return Ok((slot, slot));
        }
        let found = match self.cmp_at(prefix, key, t)? {
            Ordering::Less => {
                let (l, found) = self.insert_at(self.left(t), key, prefix)?;
                self.nodes[t as usize].left = l;
                found
            }
            Ordering::Greater => {
                let (r, found) = self.insert_at(self.right(t), key, prefix)?;
                self.nodes[t as usize].right = r;
                found
            }
            Ordering::Equal => return Ok((t, t)),
        };
        let t = self.skew(t);
        let t = self.split(t);
        Ok((t, found))
    }

    /// Finds the entry with the given name, inserting an empty one if absent.
    ///
    /// # Errors
    /// As [`NameIndex::find`].
    pub fn find_or_insert(&mut self, key: &[u8]) -> Result<&mut NamedEntry> {
        let prefix = prefix_of(key);
        let (root, found) = self.insert_at(self.root, key, prefix)?;
        self.root = root;
        self.nodes[found as usize]
            .entry
            .as_mut()
            .ok_or_else(|| Error::internal(format!("insert returned vacant slot {found}")))
    }

    fn delete_at(&mut self, t: u32, del: &mut Deletion<'_>) -> Result<u32> {
        if t == NIL {
            return Ok(NIL);
        }
        del.last = t;
        if self.cmp_at(del.prefix, del.key, t)? == Ordering::Less {
            let l = self.delete_at(self.left(t), del)?;
            self.nodes[t as usize].left = l;
        } else {
            del.deleted = t;
            let r = self.delete_at(self.right(t), del)?;
            self.nodes[t as usize].right = r;
        }

        if t == del.last {
            // Deepest node on the path: the in-order successor of `deleted`
            // (or `deleted` itself). Splice its entry into `deleted`'s slot.
            if del.deleted != NIL && self.cmp_at(del.prefix, del.key, del.deleted)? == Ordering::Equal {
                let successor = self.nodes[t as usize].entry.take();
                del.removed = if del.deleted == t {
                    successor
                } else {
                    std::mem::replace(&mut self.nodes[del.deleted as usize].entry, successor)
                };
                del.deleted = NIL;
                let r = self.right(t);
                self.free_slot(t);
                self.len -= 1;
                return Ok(r);
            }
            return Ok(t);
        }

        let level = self.level(t);
        let want = level.saturating_sub(1);
        if self.level(self.left(t)) < want || self.level(self.right(t)) < want {
            self.nodes[t as usize].level = want;
            let r = self.right(t);
            if self.level(r) > want {
                self.nodes[r as usize].level = want;
            }
            let t = self.skew(t);
            let r = self.skew(self.right(t));
            self.nodes[t as usize].right = r;
            if r != NIL {
                let rr = self.skew(self.right(r));
                self.nodes[r as usize].right = rr;
            }
            let t = self.split(t);
            let r = self.split(self.right(t));
            self.nodes[t as usize].right = r;
            return Ok(t);
        }
        Ok(t)
    }

    /// Removes the entry with the given name, returning it.
    ///
    /// # Errors
    /// As [`NameIndex::find`].
    pub fn remove(&mut self, key: &[u8]) -> Result<Option<NamedEntry>> {
        if self.find_slot(key)?.is_none() {
            return Ok(None);
        }
        let mut del = Deletion {
            key,
            prefix: prefix_of(key),
            last: NIL,
            deleted: NIL,
            removed: None,
        };
        self.root = self.delete_at(self.root, &mut del)?;
        Ok(del.removed)
    }

    /// Returns the entry with the smallest name.
    #[must_use]
    pub fn first(&self) -> Option<&NamedEntry> {
        let mut t = self.root;
        if t == NIL {
            return None;
        }
        while self.left(t) != NIL {
            t = self.left(t);
        }
        self.nodes[t as usize].entry.as_ref()
    }

    /// Returns the entry with the smallest name `>= key`.
    ///
    /// # Errors
    /// As [`NameIndex::find`].
    pub fn lower_bound(&self, key: &[u8]) -> Result<Option<&NamedEntry>> {
        self.bound(key, true)
    }

    /// Returns the entry with the smallest name `> key`.
    ///
    /// # Errors
    /// As [`NameIndex::find`].
    pub fn successor(&self, key: &[u8]) -> Result<Option<&NamedEntry>> {
        self.bound(key, false)
    }

    fn bound(&self, key: &[u8], inclusive: bool) -> Result<Option<&NamedEntry>> {
        let prefix = prefix_of(key);
        let mut t = self.root;
        let mut candidate = NIL;
        while t != NIL {
            let go_left = match self.cmp_at(prefix, key, t)? {
                Ordering::Less => true,
                Ordering::Equal => inclusive,
                Ordering::Greater => false,
            };
            if go_left {
                candidate = t;
                t = self.left(t);
            } else {
                t = self.right(t);
            }
        }
        Ok(self.nodes[candidate as usize].entry.as_ref())
    }

    /// Iterates over entries in name order.
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter {
            index: self,
            stack: Vec::new(),
        };
        iter.push_left(self.root);
        iter
    }

    /// Removes every entry, returning them in name order.
    pub fn drain(&mut self) -> Vec<NamedEntry> {
        let mut order = Vec::with_capacity(self.len);
        let mut stack = Vec::new();
        let mut t = self.root;
        while t != NIL || !stack.is_empty() {
            while t != NIL {
                stack.push(t);
                t = self.left(t);
            }
            if let Some(top) = stack.pop() {
                order.push(top);
                t = self.right(top);
            }
        }
        let entries = order
            .into_iter()
            .filter_map(|t| self.nodes[t as usize].entry.take())
            .collect();
        *self = Self::new();
        entries
    }

    /// Verifies the AA-tree and ordering invariants.
    ///
    /// # Errors
    /// Returns a description of the first violated invariant.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let mut count = 0usize;
        self.check_node(self.root, &mut count)?;
        if count != self.len {
            return Err(format!("len {} but {} reachable entries", self.len, count));
        }
        let names: Vec<&Name> = self.iter().map(NamedEntry::name).collect();
        if names.windows(2).any(|w| w[0] >= w[1]) {
            return Err("in-order traversal is not strictly increasing".to_string());
        }
        Ok(())
    }

    fn check_node(&self, t: u32, count: &mut usize) -> std::result::Result<(), String> {
        if t == NIL {
            return Ok(());
        }
        *count += 1;
        let level = self.level(t);
        let (l, r) = (self.left(t), self.right(t));
        if self.level(l) + 1 != level {
            return Err(format!("left child of level-{level} node has level {}", self.level(l)));
        }
        if self.level(r) != level && self.level(r) + 1 != level {
            return Err(format!("right child of level-{level} node has level {}", self.level(r)));
        }
        if r != NIL && self.level(self.right(r)) >= level {
            return Err(format!("three level-{level} nodes chained to the right"));
        }
        if l == NIL && r == NIL && level != 1 {
            return Err(format!("leaf at level {level}"));
        }
        self.check_node(l, count)?;
        self.check_node(r, count)
    }
}

/// In-order iterator over a [`NameIndex`].
pub struct Iter<'a> {
    index: &'a NameIndex,
    stack: Vec<u32>,
}

impl Iter<'_> {
    fn push_left(&mut self, mut t: u32) {
        while t != NIL {
            self.stack.push(t);
            t = self.index.left(t);
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a NamedEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let t = self.stack.pop()?;
        self.push_left(self.index.right(t));
        self.index.nodes[t as usize].entry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edict_foundation::ErrorKind;
    use proptest::prelude::*;

    fn names(index: &NameIndex) -> Vec<String> {
        index.iter().map(|e| e.name().to_text()).collect()
    }

    fn index_of(names: &[&str]) -> NameIndex {
        let mut index = NameIndex::new();
        for name in names {
            index.find_or_insert(name.as_bytes()).unwrap();
        }
        index
    }

    fn text(entry: Option<&NamedEntry>) -> Option<String> {
        entry.map(|e| e.name().to_text())
    }

    #[test]
    fn insert_keeps_order_and_balance() {
        let mut index = NameIndex::new();
        for name in ["m", "c", "x", "a", "e", "z", "b"] {
            index.find_or_insert(name.as_bytes()).unwrap();
            index.check_invariants().unwrap();
        }
        assert_eq!(names(&index), vec!["a", "b", "c", "e", "m", "x", "z"]);
        assert_eq!(index.len(), 7);
    }

    #[test]
    fn find_or_insert_is_idempotent() {
        let index = index_of(&["k", "k"]);
        assert_eq!(index.len(), 1);
        assert!(index.find(b"k").unwrap().is_some());
        assert!(index.find(b"q").unwrap().is_none());
    }

    #[test]
    fn remove_splices_successor() {
        let mut index = NameIndex::new();
        for i in 0..32 {
            index.find_or_insert(format!("n{i:02}").as_bytes()).unwrap();
        }
        let removed = index.remove(b"n10").unwrap().expect("present");
        assert_eq!(removed.name().to_text(), "n10");
        index.check_invariants().unwrap();
        assert!(index.find(b"n10").unwrap().is_none());
        assert!(index.find(b"n11").unwrap().is_some());
        assert_eq!(index.len(), 31);
        assert!(index.remove(b"n10").unwrap().is_none());
    }

    #[test]
    fn bounds_and_successor() {
        let index = index_of(&["a1", "a2", "a3", "b"]);
        assert_eq!(text(index.first()).unwrap(), "a1");
        assert_eq!(text(index.lower_bound(b"a").unwrap()).unwrap(), "a1");
        assert_eq!(text(index.lower_bound(b"a2").unwrap()).unwrap(), "a2");
        assert_eq!(text(index.successor(b"a2").unwrap()).unwrap(), "a3");
        assert_eq!(text(index.successor(b"a3").unwrap()).unwrap(), "b");
        assert!(index.successor(b"b").unwrap().is_none());
    }

    #[test]
    fn slots_are_recycled() {
        let mut index = index_of(&["a", "b"]);
        index.remove(b"a").unwrap();
        index.find_or_insert(b"c").unwrap();
        assert_eq!(index.nodes.len(), 3);
        assert_eq!(names(&index), vec!["b", "c"]);
    }

    #[test]
    fn drain_returns_sorted_entries() {
        let mut index = index_of(&["q", "e", "w"]);
        let drained: Vec<_> = index.drain().into_iter().map(|e| e.name().to_text()).collect();
        assert_eq!(drained, vec!["e", "q", "w"]);
        assert!(index.is_empty());
        assert!(index.first().is_none());
    }

    #[test]
    fn vacant_slot_on_a_search_path_is_an_internal_error() {
        let mut index = index_of(&["m", "a"]);
        let a = index.find_slot(b"a").unwrap().unwrap();
        index.nodes[a as usize].entry = None;

        for result in [
            index.find(b"a").map(|_| ()),
            index.lower_bound(b"a").map(|_| ()),
            index.find_or_insert(b"b").map(|_| ()),
            index.remove(b"a").map(|_| ()),
        ] {
            let err = result.unwrap_err();
            assert!(matches!(err.kind, ErrorKind::Internal(_)), "{err}");
        }
    }

    proptest! {
        #[test]
        fn random_insert_delete_preserves_invariants(
            ops in proptest::collection::vec((any::<bool>(), 0u8..48), 0..200)
        ) {
            let mut index = NameIndex::new();
            let mut model = std::collections::BTreeSet::new();
            for (insert, key) in ops {
                let key = [b'k', key];
                if insert {
                    index.find_or_insert(&key).unwrap();
                    model.insert(key.to_vec());
                } else {
                    let removed = index.remove(&key).unwrap().is_some();
                    prop_assert_eq!(removed, model.remove(&key.to_vec()));
                }
                prop_assert!(index.check_invariants().is_ok(), "{:?}", index.check_invariants());
            }
            let keys: Vec<Vec<u8>> = index.iter().map(|e| e.name().as_bytes().to_vec()).collect();
            let expected: Vec<Vec<u8>> = model.into_iter().collect();
            prop_assert_eq!(keys, expected);
        }
    }
}
