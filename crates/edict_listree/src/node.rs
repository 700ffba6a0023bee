//! The generic tree value.
//!
//! A [`Node`] is shared through [`NodeRef`] (an `Arc`). Every container
//! reaches its children through [`ValueLink`]s, each of which owns one strong
//! reference, so a node's reference count is the number of links (plus any
//! transient handles held by cursors or the VM) pointing at it. Dropping the
//! last reference releases the node and, recursively, everything it links.
//!
//! Node contents sit behind a `parking_lot::RwLock`. No method holds that
//! lock while locking another node, calling back into user code, or
//! recursing into children; multi-node operations snapshot first.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use edict_foundation::{Cll, End, Error, Link, Name, Result, pattern};
use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::trace;

use crate::buffer::{Buffer, Kind};
use crate::index::NameIndex;
use crate::native::NativeValue;

/// Shared handle to a node.
pub type NodeRef = Arc<Node>;

/// Whether a node accepts mutation. Fixed at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    /// Ordinary node.
    Mutable,
    /// Every mutation fails with `ErrorKind::ReadOnly`.
    ReadOnly,
}

/// What a node holds.
pub enum Content {
    /// A byte buffer.
    Leaf(Buffer),
    /// An ordered sequence of children.
    List(Cll<ValueLink>),
    /// Children indexed by name, each name holding a collision list.
    Map(NameIndex),
    /// A native variable supplied by the reflection layer.
    Native(Arc<dyn NativeValue>),
}

/// One owning reference from a container to a node.
#[derive(Clone)]
pub struct ValueLink(NodeRef);

impl ValueLink {
    /// Creates a link, taking one reference to `target`.
    #[must_use]
    pub fn new(target: NodeRef) -> Self {
        Self(target)
    }

    /// Returns the linked node.
    #[must_use]
    pub fn target(&self) -> &NodeRef {
        &self.0
    }

    /// Consumes the link, handing its reference to the caller.
    #[must_use]
    pub fn into_target(self) -> NodeRef {
        self.0
    }
}

impl fmt::Debug for ValueLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueLink({:?})", self.0)
    }
}

struct Body {
    content: Content,
    kind: Kind,
}

/// A tree value.
pub struct Node {
    body: RwLock<Body>,
    access: Access,
}

/// Children of a node captured at one instant.
pub enum Children {
    /// Leaves and native variables have no tree children.
    None,
    /// List-mode children, head to tail.
    List(Vec<NodeRef>),
    /// Map-mode entries in name order, each with its collision list head to tail.
    Map(Vec<(Name, Vec<NodeRef>)>),
}

fn list_ref<'a>(content: &'a Content, name: Option<&[u8]>) -> Result<Option<&'a Cll<ValueLink>>> {
    Ok(match (content, name) {
        (Content::List(list), None) => Some(list),
        (Content::Map(index), Some(name)) => index.find(name)?.map(crate::entry::NamedEntry::values),
        _ => None,
    })
}

fn list_mut<'a>(content: &'a mut Content, name: Option<&[u8]>) -> Result<Option<&'a mut Cll<ValueLink>>> {
    Ok(match (content, name) {
        (Content::List(list), None) => Some(list),
        (Content::Map(index), Some(name)) => index
            .find_mut(name)?
            .map(crate::entry::NamedEntry::values_mut),
        _ => None,
    })
}

fn describe(name: Option<&[u8]>) -> String {
    name.map_or_else(
        || "<list>".to_string(),
        |n| String::from_utf8_lossy(n).into_owned(),
    )
}

impl Node {
    /// Creates a node with explicit content, kind and access.
    #[must_use]
    pub fn new(content: Content, kind: Kind, access: Access) -> NodeRef {
        Arc::new(Self {
            body: RwLock::new(Body { content, kind }),
            access,
        })
    }

    /// Creates the null value: an empty leaf marked [`Kind::NULL`].
    ///
    /// Placeholders installed by inserting lookups are null values.
    #[must_use]
    pub fn null() -> NodeRef {
        Self::new(Content::Leaf(Buffer::default()), Kind::NULL, Access::Mutable)
    }

    /// Creates a leaf from a buffer.
    #[must_use]
    pub fn leaf(buffer: Buffer, kind: Kind) -> NodeRef {
        Self::new(Content::Leaf(buffer), kind, Access::Mutable)
    }

    /// Creates a leaf duplicating `bytes`.
    #[must_use]
    pub fn bytes(bytes: &[u8]) -> NodeRef {
        Self::leaf(Buffer::duplicate(bytes), Kind::NONE)
    }

    /// Creates a leaf duplicating `text`.
    #[must_use]
    pub fn text(text: &str) -> NodeRef {
        Self::bytes(text.as_bytes())
    }

    /// Creates a leaf that takes ownership of `bytes`.
    #[must_use]
    pub fn owned(bytes: Vec<u8>) -> NodeRef {
        Self::leaf(Buffer::Owned(bytes), Kind::NONE)
    }

    /// Creates a leaf borrowing a window of a shared allocation.
    #[must_use]
    pub fn view(data: Arc<[u8]>, range: Range<usize>) -> NodeRef {
        Self::leaf(Buffer::view(data, range), Kind::NONE)
    }

    /// Creates a read-only leaf over static bytes.
    #[must_use]
    pub fn frozen(bytes: &'static [u8]) -> NodeRef {
        Self::new(
            Content::Leaf(Buffer::Static(bytes)),
            Kind::NONE,
            Access::ReadOnly,
        )
    }

    /// Creates an empty map-mode node.
    #[must_use]
    pub fn map() -> NodeRef {
        Self::new(Content::Map(NameIndex::new()), Kind::NONE, Access::Mutable)
    }

    /// Creates an empty list-mode node.
    #[must_use]
    pub fn list() -> NodeRef {
        Self::new(Content::List(Cll::new()), Kind::NONE, Access::Mutable)
    }

    /// Wraps a native variable.
    #[must_use]
    pub fn native(value: Arc<dyn NativeValue>) -> NodeRef {
        Self::new(Content::Native(value), Kind::NATIVE, Access::Mutable)
    }

    /// Returns an identity key for the node, stable while it is alive.
    #[must_use]
    pub fn id(node: &NodeRef) -> usize {
        Arc::as_ptr(node) as usize
    }

    /// Returns true if both handles point at the same node.
    #[must_use]
    pub fn same(a: &NodeRef, b: &NodeRef) -> bool {
        Arc::ptr_eq(a, b)
    }

    /// Returns the node's access mode.
    #[must_use]
    pub fn access(&self) -> Access {
        self.access
    }

    /// Returns true if the node rejects mutation.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.access == Access::ReadOnly
    }

    /// Returns the kind markers.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.body.read().kind
    }

    /// Adds kind markers.
    ///
    /// # Errors
    /// Returns `ReadOnly` for read-only nodes.
    pub fn mark(&self, kind: Kind) -> Result<()> {
        self.write()?.kind |= kind;
        Ok(())
    }

    /// Returns true for leaf nodes.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.body.read().content, Content::Leaf(_))
    }

    /// Returns true for list-mode nodes.
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self.body.read().content, Content::List(_))
    }

    /// Returns true for map-mode nodes.
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self.body.read().content, Content::Map(_))
    }

    /// Returns the wrapped native variable, if any.
    #[must_use]
    pub fn native_value(&self) -> Option<Arc<dyn NativeValue>> {
        match &self.body.read().content {
            Content::Native(v) => Some(Arc::clone(v)),
            _ => None,
        }
    }

    /// Returns true for the null value (an empty leaf marked null).
    #[must_use]
    pub fn is_null(&self) -> bool {
        let body = self.body.read();
        body.kind.contains(Kind::NULL)
            && matches!(&body.content, Content::Leaf(b) if b.is_empty())
    }

    /// Returns true for an empty leaf or a container without children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.body.read().content {
            Content::Leaf(b) => b.is_empty(),
            Content::List(list) => list.is_empty(),
            Content::Map(index) => index.is_empty(),
            Content::Native(_) => false,
        }
    }

    /// Returns the number of direct children: list elements or map entries.
    #[must_use]
    pub fn child_count(&self) -> usize {
        match &self.body.read().content {
            Content::List(list) => list.len(),
            Content::Map(index) => index.len(),
            Content::Leaf(_) | Content::Native(_) => 0,
        }
    }

    /// Runs `f` over the leaf bytes. Returns `None` for non-leaves.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        match &self.body.read().content {
            Content::Leaf(b) => Some(f(b.as_bytes())),
            _ => None,
        }
    }

    /// Returns a copy of the value's bytes.
    ///
    /// Native variables render through [`NativeValue::to_bytes`]; containers
    /// yield nothing.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let native = match &self.body.read().content {
            Content::Leaf(b) => return b.as_bytes().to_vec(),
            Content::Native(v) => Arc::clone(v),
            Content::List(_) | Content::Map(_) => return Vec::new(),
        };
        native.to_bytes()
    }

    /// Returns the value's bytes as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    /// Returns true if the value's bytes match the wildcard `pattern`.
    #[must_use]
    pub fn matches(&self, pattern: &[u8]) -> bool {
        pattern::matches(pattern, &self.to_bytes())
    }

    /// Returns true if both values are leaves with equal bytes.
    #[must_use]
    pub fn content_eq(&self, other: &Node) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        match (self.with_bytes(<[u8]>::to_vec), other.with_bytes(<[u8]>::to_vec)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Captures the node's children.
    #[must_use]
    pub fn children(&self) -> Children {
        match &self.body.read().content {
            Content::List(list) => Children::List(
                list.iter(End::Head)
                    .map(|(_, v)| Arc::clone(v.target()))
                    .collect(),
            ),
            Content::Map(index) => Children::Map(
                index
                    .iter()
                    .map(|e| {
                        let values = e
                            .values()
                            .iter(End::Head)
                            .map(|(_, v)| Arc::clone(v.target()))
                            .collect();
                        (e.name().clone(), values)
                    })
                    .collect(),
            ),
            Content::Leaf(_) | Content::Native(_) => Children::None,
        }
    }

    /// Returns a childless copy: leaves keep their buffer, containers come
    /// back empty in the same mode, native variables stay shared.
    #[must_use]
    pub fn shell(&self) -> NodeRef {
        let body = self.body.read();
        let content = match &body.content {
            Content::Leaf(b) => Content::Leaf(b.clone()),
            Content::List(_) => Content::List(Cll::new()),
            Content::Map(_) => Content::Map(NameIndex::new()),
            Content::Native(v) => Content::Native(Arc::clone(v)),
        };
        Self::new(content, body.kind, Access::Mutable)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Body>> {
        if self.is_read_only() {
            return Err(Error::read_only());
        }
        Ok(self.body.write())
    }

    /// Turns an empty leaf into a container of the requested mode.
    fn promote(body: &mut Body, named: bool) -> Result<()> {
        let ok = match &body.content {
            Content::Leaf(b) if b.is_empty() => {
                body.content = if named {
                    Content::Map(NameIndex::new())
                } else {
                    Content::List(Cll::new())
                };
                body.kind = body.kind.without(Kind::NULL);
                true
            }
            Content::Map(_) => named,
            Content::List(_) => !named,
            Content::Leaf(_) | Content::Native(_) => false,
        };
        if ok {
            Ok(())
        } else if named {
            Err(Error::not_a_container("named insert into non-map value"))
        } else {
            Err(Error::not_a_container("anonymous insert into non-list value"))
        }
    }

    fn prune(content: &mut Content, name: Option<&[u8]>) -> Result<()> {
        if let (Content::Map(index), Some(name)) = (content, name) {
            if index.find(name)?.is_some_and(crate::entry::NamedEntry::is_empty) {
                index.remove(name)?;
                trace!(name = %describe(Some(name)), "pruned empty entry");
            }
        }
        Ok(())
    }

    /// Attaches `value` at `end` of the collision list for `name`, or of the
    /// list-mode children when `name` is `None`. Returns the new link.
    ///
    /// # Errors
    /// Returns `ReadOnly` or `NotAContainer`.
    pub fn insert(&self, name: Option<&[u8]>, end: End, value: NodeRef) -> Result<Link> {
        let mut body = self.write()?;
        Self::promote(&mut body, name.is_some())?;
        let link = match (&mut body.content, name) {
            (Content::Map(index), Some(name)) => {
                index.find_or_insert(name)?.values_mut().push(ValueLink::new(value), end)
            }
            (Content::List(list), None) => list.push(ValueLink::new(value), end),
            _ => return Err(Error::internal("promotion produced the wrong mode")),
        };
        Ok(link)
    }

    /// Attaches `value` at `end`; see [`Node::insert`].
    ///
    /// # Errors
    /// Returns `ReadOnly` or `NotAContainer`.
    pub fn put(&self, name: Option<&[u8]>, end: End, value: NodeRef) -> Result<()> {
        self.insert(name, end, value).map(|_| ())
    }

    /// Returns the value at `end` of a collision list, optionally the first
    /// one (walking from `end`) whose bytes match `pattern`, and detaches it
    /// when `pop` is set. Popping the last value of a named entry prunes the
    /// entry.
    ///
    /// # Errors
    /// Returns `ReadOnly` when popping from a read-only node.
    pub fn get(
        &self,
        name: Option<&[u8]>,
        end: End,
        pop: bool,
        pattern: Option<&[u8]>,
    ) -> Result<Option<NodeRef>> {
        let Some(pattern) = pattern else {
            if !pop {
                let body = self.body.read();
                return Ok(list_ref(&body.content, name)?
                    .and_then(|list| list.peek(end).and_then(|l| list.value(l)))
                    .map(|v| Arc::clone(v.target())));
            }
            let mut body = self.write()?;
            let Some(list) = list_mut(&mut body.content, name)? else {
                return Ok(None);
            };
            let Some(link) = list.get(end, true) else {
                return Ok(None);
            };
            let value = list.release(link)?.into_target();
            Self::prune(&mut body.content, name)?;
            return Ok(Some(value));
        };

        let candidates: Vec<(Link, NodeRef)> = {
            let body = self.body.read();
            list_ref(&body.content, name)?
                .map(|list| {
                    list.iter(end)
                        .map(|(l, v)| (l, Arc::clone(v.target())))
                        .collect()
                })
                .unwrap_or_default()
        };
        let Some((link, value)) = candidates.into_iter().find(|(_, v)| v.matches(pattern)) else {
            return Ok(None);
        };
        if pop {
            return self.release_link(name, link, Some(&value));
        }
        Ok(Some(value))
    }

    /// Appends at the tail.
    ///
    /// # Errors
    /// See [`Node::put`].
    pub fn enqueue(&self, name: Option<&[u8]>, value: NodeRef) -> Result<()> {
        self.put(name, End::Tail, value)
    }

    /// Removes from the head.
    ///
    /// # Errors
    /// See [`Node::get`].
    pub fn dequeue(&self, name: Option<&[u8]>) -> Result<Option<NodeRef>> {
        self.get(name, End::Head, true, None)
    }

    /// Pushes at the head.
    ///
    /// # Errors
    /// See [`Node::put`].
    pub fn push(&self, name: Option<&[u8]>, value: NodeRef) -> Result<()> {
        self.put(name, End::Head, value)
    }

    /// Pops from the head.
    ///
    /// # Errors
    /// See [`Node::get`].
    pub fn pop(&self, name: Option<&[u8]>) -> Result<Option<NodeRef>> {
        self.get(name, End::Head, true, None)
    }

    /// Returns the head value without removing it.
    #[must_use]
    pub fn peek(&self, name: Option<&[u8]>) -> Option<NodeRef> {
        self.get(name, End::Head, false, None).ok().flatten()
    }

    /// Returns true if the map holds an entry called `name`. A damaged
    /// name index reads as empty here.
    #[must_use]
    pub fn has_entry(&self, name: &[u8]) -> bool {
        match &self.body.read().content {
            Content::Map(index) => matches!(index.find(name), Ok(Some(_))),
            _ => false,
        }
    }

    /// Returns the number of values bound to `name` (or list children).
    #[must_use]
    pub fn values_len(&self, name: Option<&[u8]>) -> usize {
        list_ref(&self.body.read().content, name)
            .ok()
            .flatten()
            .map_or(0, Cll::len)
    }

    /// Removes the whole entry `name`, returning its values head to tail.
    ///
    /// # Errors
    /// Returns `ReadOnly` for read-only nodes.
    pub fn remove(&self, name: &[u8]) -> Result<Option<Vec<NodeRef>>> {
        let mut body = self.write()?;
        let Content::Map(index) = &mut body.content else {
            return Ok(None);
        };
        Ok(index.remove(name)?.map(|mut entry| {
            entry
                .values_mut()
                .drain()
                .into_iter()
                .map(ValueLink::into_target)
                .collect()
        }))
    }

    /// Steps through a collision list: the neighbour of `from` in direction
    /// `dir`, or the element at that end when `from` is `None`.
    ///
    /// # Errors
    /// Returns `Internal` if the name index is damaged.
    pub fn next_link(
        &self,
        name: Option<&[u8]>,
        from: Option<Link>,
        dir: End,
    ) -> Result<Option<(Link, NodeRef)>> {
        let body = self.body.read();
        let Some(list) = list_ref(&body.content, name)? else {
            return Ok(None);
        };
        if from.is_some_and(|from| list.value(from).is_none()) {
            return Ok(None);
        }
        Ok(list
            .next(from, dir)
            .and_then(|link| list.value(link).map(|v| (link, Arc::clone(v.target())))))
    }

    /// Returns the node a link currently points at.
    ///
    /// # Errors
    /// As [`Node::next_link`].
    pub fn link_target(&self, name: Option<&[u8]>, link: Link) -> Result<Option<NodeRef>> {
        let body = self.body.read();
        Ok(list_ref(&body.content, name)?
            .and_then(|list| list.value(link))
            .map(|v| Arc::clone(v.target())))
    }

    /// Points an existing link at a new value, returning the old one.
    ///
    /// # Errors
    /// Returns `ReadOnly`, or `StaleLink`/`NotFound` when the link is gone.
    pub fn replace_link(&self, name: Option<&[u8]>, link: Link, value: NodeRef) -> Result<NodeRef> {
        let mut body = self.write()?;
        let list = list_mut(&mut body.content, name)?
            .ok_or_else(|| Error::not_found(describe(name)))?;
        Ok(list.replace(link, ValueLink::new(value))?.into_target())
    }

    /// Detaches a link, pruning the entry if it empties.
    ///
    /// With `expect`, the link is only released while it still points at
    /// that exact node; otherwise `Ok(None)` is returned.
    ///
    /// # Errors
    /// Returns `ReadOnly` for read-only nodes.
    pub fn release_link(
        &self,
        name: Option<&[u8]>,
        link: Link,
        expect: Option<&NodeRef>,
    ) -> Result<Option<NodeRef>> {
        let mut body = self.write()?;
        let Some(list) = list_mut(&mut body.content, name)? else {
            return Ok(None);
        };
        match (list.value(link), expect) {
            (None, _) => return Ok(None),
            (Some(v), Some(expect)) if !Arc::ptr_eq(v.target(), expect) => return Ok(None),
            _ => {}
        }
        let value = list.release(link)?.into_target();
        Self::prune(&mut body.content, name)?;
        Ok(Some(value))
    }

    /// Returns the first entry name after `after` (or from the start) that
    /// matches the wildcard `pattern`, in name order.
    ///
    /// # Errors
    /// As [`Node::next_link`].
    pub fn next_matching_name(&self, pattern: &[u8], after: Option<&[u8]>) -> Result<Option<Name>> {
        let body = self.body.read();
        let Content::Map(index) = &body.content else {
            return Ok(None);
        };
        let literal = literal_prefix(pattern);
        let mut entry = match after {
            Some(after) if after >= literal.as_slice() => index.successor(after)?,
            _ => index.lower_bound(&literal)?,
        };
        while let Some(e) = entry {
            let name = e.name().as_bytes();
            if !name.starts_with(&literal) {
                return Ok(None);
            }
            if pattern::matches(pattern, name) {
                return Ok(Some(e.name().clone()));
            }
            entry = index.successor(name)?;
        }
        Ok(None)
    }
}

/// Literal bytes before the first unescaped wildcard.
fn literal_prefix(pattern: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < pattern.len() {
        match pattern[i] {
            b'*' | b'?' => break,
            b'\\' if i + 1 < pattern.len() => {
                out.push(pattern[i + 1]);
                i += 2;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.body.read();
        match &body.content {
            Content::Leaf(b) => write!(f, "Leaf({b:?}, {:?})", body.kind),
            Content::List(list) => write!(f, "List(len={})", list.len()),
            Content::Map(index) => write!(f, "Map(entries={})", index.len()),
            Content::Native(v) => write!(f, "Native({})", v.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(node: &NodeRef) -> String {
        node.text_lossy()
    }

    #[test]
    fn tail_insert_head_get_is_fifo() {
        let root = Node::map();
        root.put(Some(b"x"), End::Tail, Node::text("v1")).unwrap();
        root.put(Some(b"x"), End::Tail, Node::text("v2")).unwrap();
        let first = root.get(Some(b"x"), End::Head, true, None).unwrap().unwrap();
        let second = root.get(Some(b"x"), End::Head, true, None).unwrap().unwrap();
        assert_eq!(text(&first), "v1");
        assert_eq!(text(&second), "v2");
        assert!(!root.has_entry(b"x"));
    }

    #[test]
    fn head_insert_head_get_is_lifo() {
        let root = Node::map();
        root.put(Some(b"x"), End::Head, Node::text("v1")).unwrap();
        root.put(Some(b"x"), End::Head, Node::text("v2")).unwrap();
        assert_eq!(text(&root.pop(Some(b"x")).unwrap().unwrap()), "v2");
        assert_eq!(text(&root.pop(Some(b"x")).unwrap().unwrap()), "v1");
        assert!(root.pop(Some(b"x")).unwrap().is_none());
    }

    #[test]
    fn tail_get_mirrors_head_get() {
        let root = Node::map();
        root.put(Some(b"x"), End::Tail, Node::text("v1")).unwrap();
        root.put(Some(b"x"), End::Tail, Node::text("v2")).unwrap();
        assert_eq!(text(&root.get(Some(b"x"), End::Tail, false, None).unwrap().unwrap()), "v2");
        root.put(Some(b"y"), End::Head, Node::text("v1")).unwrap();
        root.put(Some(b"y"), End::Head, Node::text("v2")).unwrap();
        assert_eq!(text(&root.get(Some(b"y"), End::Tail, true, None).unwrap().unwrap()), "v1");
    }

    #[test]
    fn pattern_get_matches_contents() {
        let root = Node::list();
        for word in ["apple", "banana", "avocado"] {
            root.enqueue(None, Node::text(word)).unwrap();
        }
        let hit = root.get(None, End::Tail, true, Some(b"a*")).unwrap().unwrap();
        assert_eq!(text(&hit), "avocado");
        assert_eq!(root.child_count(), 2);
        assert!(root.get(None, End::Head, false, Some(b"z*")).unwrap().is_none());
    }

    #[test]
    fn reference_count_follows_links() {
        let value = Node::text("shared");
        let a = Node::map();
        let b = Node::list();
        a.put(Some(b"k"), End::Head, value.clone()).unwrap();
        b.enqueue(None, value.clone()).unwrap();
        assert_eq!(Arc::strong_count(&value), 3);
        drop(a);
        assert_eq!(Arc::strong_count(&value), 2);
        b.dequeue(None).unwrap();
        assert_eq!(Arc::strong_count(&value), 1);
    }

    #[test]
    fn empty_leaf_promotes() {
        let node = Node::null();
        assert!(node.is_null());
        node.put(Some(b"a"), End::Head, Node::text("1")).unwrap();
        assert!(node.is_map());
        assert!(!node.kind().contains(Kind::NULL));

        let node = Node::null();
        node.put(None, End::Head, Node::text("1")).unwrap();
        assert!(node.is_list());
    }

    #[test]
    fn non_container_rejects_children() {
        let node = Node::text("data");
        let err = node.put(Some(b"a"), End::Head, Node::null()).unwrap_err();
        assert!(matches!(err.kind, edict_foundation::ErrorKind::NotAContainer(_)));
        let map = Node::map();
        assert!(map.put(None, End::Head, Node::null()).is_err());
    }

    #[test]
    fn read_only_rejects_mutation() {
        let node = Node::frozen(b"const");
        assert!(node.is_read_only());
        assert!(node.mark(Kind::BINARY).is_err());
        let err = node.put(None, End::Head, Node::null()).unwrap_err();
        assert!(matches!(err.kind, edict_foundation::ErrorKind::ReadOnly));
        assert_eq!(text(&node), "const");
    }

    #[test]
    fn next_matching_name_uses_literal_prefix() {
        let root = Node::map();
        for name in ["a1", "b1", "a3", "a2", "ab"] {
            root.put(Some(name.as_bytes()), End::Head, Node::null()).unwrap();
        }
        let mut seen = Vec::new();
        let mut after: Option<Name> = None;
        while let Some(name) = root.next_matching_name(b"a?", after.as_ref().map(Name::as_bytes)).unwrap() {
            seen.push(name.to_text());
            after = Some(name);
        }
        assert_eq!(seen, vec!["a1", "a2", "a3", "ab"]);
        assert_eq!(
            root.next_matching_name(b"*1", None).unwrap().map(|n| n.to_text()),
            Some("a1".to_string())
        );
    }

    #[test]
    fn release_link_checks_identity() {
        let root = Node::map();
        let v = Node::text("v");
        let link = root.insert(Some(b"k"), End::Head, v.clone()).unwrap();
        let other = Node::text("w");
        assert!(root.release_link(Some(b"k"), link, Some(&other)).unwrap().is_none());
        let old = root.replace_link(Some(b"k"), link, other.clone()).unwrap();
        assert!(Node::same(&old, &v));
        let gone = root.release_link(Some(b"k"), link, Some(&other)).unwrap().unwrap();
        assert!(Node::same(&gone, &other));
        assert!(!root.has_entry(b"k"));
    }

    #[test]
    fn remove_entry_returns_values() {
        let root = Node::map();
        root.enqueue(Some(b"k"), Node::text("1")).unwrap();
        root.enqueue(Some(b"k"), Node::text("2")).unwrap();
        let values = root.remove(b"k").unwrap().unwrap();
        assert_eq!(values.iter().map(text).collect::<Vec<_>>(), vec!["1", "2"]);
        assert!(root.remove(b"k").unwrap().is_none());
    }
}
