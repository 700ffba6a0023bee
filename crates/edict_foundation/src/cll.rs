//! Circular doubly linked rings with stable handles.
//!
//! A [`Cll`] owns an arena of slots. Slot 0 is the list sentinel; every
//! other slot is either free, a detached self-loop, or a member of some ring
//! within the arena (normally the sentinel's ring). Handles ([`Link`]) stay
//! valid until the slot is released, and released slots are recycled.
//!
//! All linkage changes go through [`Cll::splice`], the exchange primitive:
//! exchanging the `end`-side neighbours of two links either excises a
//! contiguous range into its own ring or merges two rings, and applying it
//! twice restores the original linkage.

use std::fmt;
use std::ops::ControlFlow;

use crate::{Error, ErrorKind, Result};

/// Stable handle to a slot in a [`Cll`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link(u32);

impl Link {
    /// The list sentinel. It is always present and never holds a value.
    pub const SENTINEL: Link = Link(0);

    /// Returns the raw slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns true for the sentinel handle.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.0 == 0
    }

    const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({})", self.0)
    }
}

/// Selects one end of a list.
///
/// A link's `Head` neighbour is the next element walking from head to tail;
/// the sentinel's `Head` neighbour is the first element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum End {
    /// The front of the list; forward direction.
    Head,
    /// The back of the list; reverse direction.
    Tail,
}

impl End {
    /// Returns the other end.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Head => Self::Tail,
            Self::Tail => Self::Head,
        }
    }

    const fn idx(self) -> usize {
        match self {
            Self::Head => 0,
            Self::Tail => 1,
        }
    }
}

struct Slot<T> {
    lnk: [u32; 2],
    value: Option<T>,
}

/// An owning circular list with a sentinel and O(1) splice/cut.
pub struct Cll<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for Cll<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Cll<T> {
    /// Creates an empty list: a self-looped sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                lnk: [0, 0],
                value: None,
            }],
            free: Vec::new(),
        }
    }

    fn check(&self, link: Link) -> Result<()> {
        match self.slots.get(link.slot()) {
            Some(slot) if link.is_sentinel() || slot.value.is_some() => Ok(()),
            _ => Err(Error::new(ErrorKind::StaleLink(link.0))),
        }
    }

    fn neighbour(&self, link: Link, end: End) -> Link {
        Link(self.slots[link.slot()].lnk[end.idx()])
    }

    /// Allocates a detached, self-looped link holding `value`.
    pub fn alloc(&mut self, value: T) -> Link {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.lnk = [index, index];
            slot.value = Some(value);
            Link(index)
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                lnk: [index, index],
                value: Some(value),
            });
            Link(index)
        }
    }

    /// Exchanges the `end`-side neighbours of `a` and `b`.
    ///
    /// Afterwards `a`'s former `end` neighbour follows `b` and `b`'s former
    /// `end` neighbour follows `a`. When `b` is a detached self-loop this
    /// inserts it next to `a`; when `b` follows `a` in the same ring
    /// (with `a`'s successor being `b`) it excises `b` into a self-loop.
    /// Splicing the same pair again undoes the operation.
    ///
    /// # Errors
    /// Returns `StaleLink` if either handle is not live.
    pub fn splice(&mut self, a: Link, b: Link, end: End) -> Result<()> {
        self.check(a)?;
        self.check(b)?;
        let e = end.idx();
        let o = end.opposite().idx();
        let an = self.slots[a.slot()].lnk[e];
        let bn = self.slots[b.slot()].lnk[e];
        self.slots[a.slot()].lnk[e] = bn;
        self.slots[bn as usize].lnk[o] = a.0;
        self.slots[b.slot()].lnk[e] = an;
        self.slots[an as usize].lnk[o] = b.0;
        Ok(())
    }

    /// Excises exactly one link, leaving it self-looped.
    ///
    /// # Errors
    /// Returns `StaleLink` for a dead handle or the sentinel.
    pub fn cut(&mut self, link: Link) -> Result<Link> {
        if link.is_sentinel() {
            return Err(Error::new(ErrorKind::StaleLink(0)));
        }
        self.check(link)?;
        let prev = self.neighbour(link, End::Tail);
        self.splice(prev, link, End::Head)?;
        Ok(link)
    }

    /// Returns true if the link is part of a ring other than its own.
    #[must_use]
    pub fn is_linked(&self, link: Link) -> bool {
        self.slots
            .get(link.slot())
            .is_some_and(|slot| slot.lnk[0] != link.0)
    }

    /// Attaches a link at the given end of the list, cutting it from any
    /// ring it currently belongs to.
    ///
    /// # Errors
    /// Returns `StaleLink` for a dead handle or the sentinel.
    pub fn put(&mut self, link: Link, end: End) -> Result<()> {
        self.cut(link)?;
        self.splice(Link::SENTINEL, link, end)
    }

    /// Allocates a link for `value` and attaches it at `end`.
    pub fn push(&mut self, value: T, end: End) -> Link {
        let link = self.alloc(value);
        // Fresh self-loop and the sentinel are both live.
        let _ = self.splice(Link::SENTINEL, link, end);
        link
    }

    /// Returns the link at `end`, cutting it out of the list when `pop` is set.
    pub fn get(&mut self, end: End, pop: bool) -> Option<Link> {
        let link = self.neighbour(Link::SENTINEL, end);
        if link.is_sentinel() {
            return None;
        }
        if pop {
            // Live member of the ring, so the cut cannot fail.
            let _ = self.cut(link);
        }
        Some(link)
    }

    /// Returns the link at `end` without modifying the list.
    #[must_use]
    pub fn peek(&self, end: End) -> Option<Link> {
        let link = self.neighbour(Link::SENTINEL, end);
        (!link.is_sentinel()).then_some(link)
    }

    /// Returns the neighbour of `from` in direction `dir`.
    ///
    /// With `from == None` this starts at the sentinel, so `End::Head` yields
    /// the first element and `End::Tail` the last. Reaching the sentinel
    /// yields `None`.
    #[must_use]
    pub fn next(&self, from: Option<Link>, dir: End) -> Option<Link> {
        let from = from.unwrap_or(Link::SENTINEL);
        let link = self.slots.get(from.slot()).map(|s| Link(s.lnk[dir.idx()]))?;
        (!link.is_sentinel()).then_some(link)
    }

    /// Cuts and frees a link, returning its value.
    ///
    /// # Errors
    /// Returns `StaleLink` for a dead handle or the sentinel.
    pub fn release(&mut self, link: Link) -> Result<T> {
        self.cut(link)?;
        let value = self.slots[link.slot()]
            .value
            .take()
            .ok_or_else(|| Error::new(ErrorKind::StaleLink(link.0)))?;
        self.free.push(link.0);
        Ok(value)
    }

    /// Returns the value held by a link.
    #[must_use]
    pub fn value(&self, link: Link) -> Option<&T> {
        self.slots.get(link.slot()).and_then(|s| s.value.as_ref())
    }

    /// Returns a mutable reference to the value held by a link.
    pub fn value_mut(&mut self, link: Link) -> Option<&mut T> {
        self.slots.get_mut(link.slot()).and_then(|s| s.value.as_mut())
    }

    /// Replaces the value held by a link, returning the old value.
    ///
    /// # Errors
    /// Returns `StaleLink` for a dead handle or the sentinel.
    pub fn replace(&mut self, link: Link, value: T) -> Result<T> {
        self.value_mut(link)
            .map(|slot| std::mem::replace(slot, value))
            .ok_or_else(|| Error::new(ErrorKind::StaleLink(link.0)))
    }

    /// Visits every element of the list starting at `end`.
    ///
    /// See [`Cll::map_from`].
    pub fn map<B>(
        &mut self,
        end: End,
        f: impl FnMut(&mut Self, Link) -> ControlFlow<B>,
    ) -> Option<B> {
        let first = self.neighbour(Link::SENTINEL, end);
        self.map_from(first, end, f)
    }

    /// Visits elements starting at `start` (inclusive) moving in direction
    /// `dir` until the sentinel is reached or the visitor breaks.
    ///
    /// The following link is fetched before the visitor runs, so the visitor
    /// may cut or release the link it was handed.
    pub fn map_from<B>(
        &mut self,
        start: Link,
        dir: End,
        mut f: impl FnMut(&mut Self, Link) -> ControlFlow<B>,
    ) -> Option<B> {
        let mut current = start;
        while !current.is_sentinel() && self.value(current).is_some() {
            let following = self.neighbour(current, dir);
            if let ControlFlow::Break(b) = f(self, current) {
                return Some(b);
            }
            current = following;
        }
        None
    }

    /// Counts the elements of the list. O(n).
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter(End::Head).count()
    }

    /// Returns true if the list holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots[0].lnk[0] == 0
    }

    /// Iterates over `(link, value)` pairs starting at `end`.
    pub fn iter(&self, end: End) -> Iter<'_, T> {
        Iter {
            list: self,
            current: Link::SENTINEL,
            dir: end,
        }
    }

    /// Releases every element, returning the values in head-to-tail order.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Some(link) = self.peek(End::Head) {
            if let Ok(value) = self.release(link) {
                values.push(value);
            }
        }
        values
    }
}

/// Iterator over the elements of a [`Cll`].
pub struct Iter<'a, T> {
    list: &'a Cll<T>,
    current: Link,
    dir: End,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Link, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.list.next(Some(self.current), self.dir)?;
        self.current = link;
        self.list.value(link).map(|value| (link, value))
    }
}

impl<T: fmt::Debug> fmt::Debug for Cll<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter(End::Head).map(|(_, v)| v))
            .finish()
    }
}
