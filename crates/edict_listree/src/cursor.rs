//! Path cursors: resolve, iterate, assign and remove through a [`Path`].
//!
//! A cursor resolves its segments from the root outward. Each level picks a
//! value out of its parent: for a named segment, the entry's collision list
//! is searched (by the first value key, if any) and each further key picks a
//! child of the value selected so far. When the parent is a native variable
//! the level is delegated to [`NativeValue`](crate::NativeValue) member and
//! index addressing instead.
//!
//! Inserting resolution installs placeholders for anything missing. The
//! cursor remembers every placeholder it installed; [`PathCursor::release`]
//! (also run on drop) removes the ones that are still empty and still
//! linked, innermost first, pruning entries that become empty.

use edict_foundation::{End, Error, Link, Name, Result, pattern};
use tracing::{debug, trace};

use crate::native::NativeValue;
use crate::node::{Node, NodeRef};
use crate::path::{Path, Segment, SegmentName};

#[derive(Clone)]
struct Step {
    container: NodeRef,
    entry: Option<Name>,
    key: Option<Vec<u8>>,
    link: Link,
    target: NodeRef,
}

impl Step {
    fn entry(&self) -> Option<&[u8]> {
        self.entry.as_ref().map(Name::as_bytes)
    }
}

enum Level {
    Tree {
        parent: NodeRef,
        entry: Option<Name>,
        steps: Vec<Step>,
    },
    Native {
        target: NodeRef,
    },
}

impl Level {
    fn target(&self) -> Option<&NodeRef> {
        match self {
            Self::Tree { steps, .. } => steps.last().map(|s| &s.target),
            Self::Native { target } => Some(target),
        }
    }
}

struct Placeholder {
    container: NodeRef,
    entry: Option<Name>,
    link: Link,
    node: NodeRef,
}

struct Resolver<'a> {
    dir: End,
    placeholders: &'a mut Vec<Placeholder>,
}

fn native_lookup(native: &dyn NativeValue, name: &[u8]) -> Result<Option<NodeRef>> {
    let numeric = !name.is_empty() && name.iter().all(u8::is_ascii_digit);
    if numeric {
        if let Some(index) = std::str::from_utf8(name).ok().and_then(|s| s.parse().ok()) {
            return native.index(index);
        }
    }
    native.member(name)
}

impl Resolver<'_> {
    /// Finds the first value after `after` whose content matches `key`;
    /// without a match, installs a placeholder when inserting a fresh search.
    fn step(
        &mut self,
        container: &NodeRef,
        entry: Option<Name>,
        key: Option<Vec<u8>>,
        after: Option<Link>,
        insert: bool,
    ) -> Result<Option<Step>> {
        let name = entry.as_ref().map(Name::as_bytes);
        let mut from = after;
        while let Some((link, target)) = container.next_link(name, from, self.dir)? {
            if key.as_deref().is_none_or(|k| target.matches(k)) {
                return Ok(Some(Step {
                    container: NodeRef::clone(container),
                    entry,
                    key,
                    link,
                    target,
                }));
            }
            from = Some(link);
        }
        if !insert || after.is_some() {
            return Ok(None);
        }

        let node = match key.as_deref() {
            Some(k) if !pattern::is_wildcard(k) => Node::bytes(&pattern::unescape(k)),
            _ => Node::null(),
        };
        let link = container.insert(name, self.dir, NodeRef::clone(&node))?;
        trace!(
            entry = %entry.as_ref().map(Name::to_text).unwrap_or_default(),
            "installed placeholder"
        );
        self.placeholders.push(Placeholder {
            container: NodeRef::clone(container),
            entry: entry.clone(),
            link,
            node: NodeRef::clone(&node),
        });
        Ok(Some(Step {
            container: NodeRef::clone(container),
            entry,
            key,
            link,
            target: node,
        }))
    }

    /// Extends `steps` until every key of the segment has been applied.
    fn descend(
        &mut self,
        steps: &mut Vec<Step>,
        parent: &NodeRef,
        entry: Option<&Name>,
        keys: &[Vec<u8>],
        insert: bool,
    ) -> Result<bool> {
        let total = keys.len().max(1);
        while steps.len() < total {
            let i = steps.len();
            let (container, name) = match steps.last() {
                Some(prev) => (NodeRef::clone(&prev.target), None),
                None => (NodeRef::clone(parent), entry.cloned()),
            };
            match self.step(&container, name, keys.get(i).cloned(), None, insert)? {
                Some(step) => steps.push(step),
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    fn level(&mut self, parent: &NodeRef, segment: &Segment, insert: bool) -> Result<Option<Level>> {
        if let Some(native) = parent.native_value() {
            return Self::native_level(parent, native.as_ref(), segment);
        }
        match &segment.name {
            SegmentName::Exact(name) => self.tree_level(parent, Some(name.clone()), &segment.keys, insert),
            SegmentName::Anonymous => self.tree_level(parent, None, &segment.keys, insert),
            SegmentName::Pattern(p) => {
                let mut after: Option<Name> = None;
                while let Some(name) = parent.next_matching_name(p, after.as_ref().map(Name::as_bytes))? {
                    if let Some(level) = self.tree_level(parent, Some(name.clone()), &segment.keys, false)? {
                        return Ok(Some(level));
                    }
                    after = Some(name);
                }
                Ok(None)
            }
        }
    }

    fn tree_level(
        &mut self,
        parent: &NodeRef,
        entry: Option<Name>,
        keys: &[Vec<u8>],
        insert: bool,
    ) -> Result<Option<Level>> {
        let mut steps = Vec::new();
        if !self.descend(&mut steps, parent, entry.as_ref(), keys, insert)? {
            return Ok(None);
        }
        Ok(Some(Level::Tree {
            parent: NodeRef::clone(parent),
            entry,
            steps,
        }))
    }

    fn native_level(parent: &NodeRef, native: &dyn NativeValue, segment: &Segment) -> Result<Option<Level>> {
        let mut current = match &segment.name {
            SegmentName::Exact(name) => native_lookup(native, name.as_bytes())?,
            SegmentName::Anonymous => Some(NodeRef::clone(parent)),
            SegmentName::Pattern(_) => None,
        };
        for key in &segment.keys {
            let Some(node) = current.take() else { break };
            current = match node.native_value() {
                Some(inner) => native_lookup(inner.as_ref(), &pattern::unescape(key))?,
                None => {
                    let mut from = None;
                    let mut found = None;
                    while let Some((link, child)) = node.next_link(None, from, End::Head)? {
                        if child.matches(key) {
                            found = Some(child);
                            break;
                        }
                        from = Some(link);
                    }
                    found
                }
            };
        }
        trace!(native = native.type_name(), found = current.is_some(), "native lookup");
        Ok(current.map(|target| Level::Native { target }))
    }

    /// Moves a level to its next match. `resume` overrides where the last
    /// step continues from (after a pop).
    fn advance(&mut self, level: &mut Level, segment: &Segment, mut resume: Option<Option<Link>>) -> Result<bool> {
        let Level::Tree { parent, entry, steps } = level else {
            return Ok(false);
        };

        while let Some(step) = steps.pop() {
            let mut after = match resume.take() {
                Some(from) => from,
                None if step.key.is_none() => continue,
                None => Some(step.link),
            };
            let depth = steps.len();
            while let Some(next) = self.step(&step.container, step.entry.clone(), step.key.clone(), after, false)? {
                let link = next.link;
                steps.push(next);
                if self.descend(steps, parent, entry.as_ref(), &segment.keys, false)? {
                    return Ok(true);
                }
                steps.truncate(depth);
                after = Some(link);
            }
        }

        if let SegmentName::Pattern(p) = &segment.name {
            let mut after_name = entry.clone();
            while let Some(name) = parent.next_matching_name(p, after_name.as_ref().map(Name::as_bytes))? {
                *entry = Some(name.clone());
                steps.clear();
                if self.descend(steps, parent, Some(&name), &segment.keys, false)? {
                    return Ok(true);
                }
                after_name = Some(name);
            }
        }
        Ok(false)
    }
}

/// A resolvable path expression.
pub struct PathCursor {
    path: Path,
    root: Option<NodeRef>,
    levels: Vec<Level>,
    placeholders: Vec<Placeholder>,
}

impl PathCursor {
    /// Creates an unresolved cursor.
    #[must_use]
    pub fn new(path: Path) -> Self {
        Self {
            path,
            root: None,
            levels: Vec::new(),
            placeholders: Vec::new(),
        }
    }

    /// Parses `text` into a cursor.
    ///
    /// # Errors
    /// Returns `PathSyntax` for malformed paths.
    pub fn parse(text: &str) -> Result<Self> {
        Path::parse(text).map(Self::new)
    }

    /// Returns the path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> End {
        if self.path.is_reverse() { End::Tail } else { End::Head }
    }

    fn cached(&self, root: &NodeRef) -> Option<NodeRef> {
        if !self.root.as_ref().is_some_and(|r| Node::same(r, root)) {
            return None;
        }
        match self.levels.last()? {
            Level::Native { target } => Some(NodeRef::clone(target)),
            Level::Tree { steps, .. } => {
                let step = steps.last()?;
                let live = step.container.link_target(step.entry(), step.link).ok()??;
                Node::same(&live, &step.target).then_some(live)
            }
        }
    }

    /// Resolves the path against `root`.
    ///
    /// Returns the selected value, or `None` when some level has no match
    /// (only possible without `insert`, or through wildcard names). A
    /// successful resolution is cached until the selected link changes.
    ///
    /// # Errors
    /// Returns `NotAContainer` or `ReadOnly` when a placeholder cannot be
    /// installed, and native lookup failures.
    pub fn resolve(&mut self, root: &NodeRef, insert: bool) -> Result<Option<NodeRef>> {
        if let Some(target) = self.cached(root) {
            return Ok(Some(target));
        }
        self.levels.clear();
        self.root = Some(NodeRef::clone(root));

        let dir = self.dir();
        let mut resolver = Resolver {
            dir,
            placeholders: &mut self.placeholders,
        };
        let mut parent = NodeRef::clone(root);
        for segment in self.path.segments().iter().rev() {
            let Some(level) = resolver.level(&parent, segment, insert)? else {
                trace!(path = %self.path, "unresolved");
                self.levels.clear();
                return Ok(None);
            };
            if let Some(target) = level.target() {
                parent = NodeRef::clone(target);
            }
            self.levels.push(level);
        }
        trace!(path = %self.path, insert, "resolved");
        Ok(Some(parent))
    }

    /// Returns the value selected by the last resolution or iteration.
    #[must_use]
    pub fn current(&self) -> Option<NodeRef> {
        self.levels.last().and_then(Level::target).cloned()
    }

    /// Advances to the next match.
    ///
    /// The innermost level moves first: to the next value matching its last
    /// key, then to the next entry matching a wildcard name. When a level is
    /// exhausted the next outer level advances and the inner ones are
    /// resolved afresh beneath it. With `pop`, the current value is removed
    /// before advancing, so repeated calls drain an entry.
    ///
    /// # Errors
    /// Returns `ReadOnly` when popping from a read-only node, or when
    /// popping a native member.
    pub fn iterate(&mut self, pop: bool) -> Result<Option<NodeRef>> {
        let Some(innermost) = self.levels.last() else {
            return Ok(None);
        };
        let dir = self.dir();

        let mut resume = None;
        if pop {
            let Level::Tree { steps, .. } = innermost else {
                return Err(Error::ffi("native members cannot be popped"));
            };
            let step = steps
                .last()
                .ok_or_else(|| Error::internal("resolved level without steps"))?;
            let prev = step
                .container
                .next_link(step.entry(), Some(step.link), dir.opposite())?
                .map(|(link, _)| link);
            step.container
                .release_link(step.entry(), step.link, Some(&step.target))?;
            resume = Some(prev);
        }

        let segments: Vec<&Segment> = self.path.segments().iter().rev().collect();
        let mut resolver = Resolver {
            dir,
            placeholders: &mut self.placeholders,
        };
        let mut idx = self.levels.len() - 1;
        loop {
            let advanced = resolver.advance(&mut self.levels[idx], segments[idx], resume.take())?;
            self.levels.truncate(idx + 1);
            if !advanced {
                if idx == 0 {
                    self.levels.clear();
                    trace!(path = %self.path, "iteration exhausted");
                    self.prune_placeholders()?;
                    return Ok(None);
                }
                idx -= 1;
                continue;
            }

            let mut parent = self.levels[idx].target().cloned();
            for segment in &segments[idx + 1..] {
                let Some(from) = parent.take() else { break };
                if let Some(level) = resolver.level(&from, segment, false)? {
                    parent = level.target().cloned();
                    self.levels.push(level);
                }
            }
            if self.levels.len() == segments.len() {
                return Ok(self.current());
            }
            idx = self.levels.len() - 1;
        }
    }

    /// Points the selected link at `value`, returning the value it replaced.
    ///
    /// A native target stores the value through the reflection layer and is
    /// returned unchanged.
    ///
    /// # Errors
    /// Returns `NotFound` when the cursor is unresolved, `ReadOnly` for
    /// read-only containers, and native assignment failures.
    pub fn assign(&mut self, value: NodeRef) -> Result<NodeRef> {
        let Some(level) = self.levels.last_mut() else {
            return Err(Error::not_found(self.path.to_string()));
        };
        match level {
            Level::Native { target } => {
                let native = target
                    .native_value()
                    .ok_or_else(|| Error::ffi("native member is not assignable"))?;
                native.assign(&value)?;
                Ok(NodeRef::clone(target))
            }
            Level::Tree { steps, .. } => {
                let step = steps
                    .last_mut()
                    .ok_or_else(|| Error::internal("resolved level without steps"))?;
                let old = step
                    .container
                    .replace_link(step.entry.as_ref().map(Name::as_bytes), step.link, NodeRef::clone(&value))?;
                step.target = value;
                Ok(old)
            }
        }
    }

    /// Removes the selected link, returning its value. The cursor is left
    /// unresolved.
    ///
    /// # Errors
    /// Returns `NotFound` when the cursor is unresolved, `ReadOnly` for
    /// read-only containers, and an FFI error for native members.
    pub fn remove(&mut self) -> Result<Option<NodeRef>> {
        let Some(level) = self.levels.pop() else {
            return Err(Error::not_found(self.path.to_string()));
        };
        self.levels.clear();
        match level {
            Level::Native { .. } => Err(Error::ffi("native members cannot be removed")),
            Level::Tree { steps, .. } => {
                let step = steps
                    .last()
                    .ok_or_else(|| Error::internal("resolved level without steps"))?;
                step.container
                    .release_link(step.entry(), step.link, Some(&step.target))
            }
        }
    }

    /// Appends an exact innermost segment. The cached resolution is dropped;
    /// placeholders stay tracked.
    pub fn extend(&mut self, name: &[u8]) {
        self.levels.clear();
        self.path.push_innermost(name);
    }

    fn prune_placeholders(&mut self) -> Result<()> {
        while let Some(p) = self.placeholders.pop() {
            if !p.node.is_empty() {
                continue;
            }
            let entry = p.entry.as_ref().map(Name::as_bytes);
            if p.container.release_link(entry, p.link, Some(&p.node))?.is_some() {
                debug!(
                    path = %self.path,
                    entry = %p.entry.as_ref().map(Name::to_text).unwrap_or_default(),
                    "pruned placeholder"
                );
            }
        }
        Ok(())
    }

    /// Drops the cached resolution and removes unassigned placeholders.
    ///
    /// # Errors
    /// Returns `ReadOnly` if a placeholder's container became read-only.
    pub fn release(&mut self) -> Result<()> {
        self.levels.clear();
        self.root = None;
        self.prune_placeholders()
    }
}

impl Drop for PathCursor {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

impl std::fmt::Debug for PathCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCursor")
            .field("path", &self.path.as_str())
            .field("resolved", &!self.levels.is_empty())
            .field("placeholders", &self.placeholders.len())
            .finish()
    }
}
