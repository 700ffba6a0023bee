//! Cycle-safe depth-first traversal.
//!
//! Every traversal call owns an identity-keyed visited set, so a node
//! reachable through several links is entered once and later encounters are
//! reported as repeats without descending. Nothing is marked on the nodes
//! themselves; dropping the set at the end of the call is the cleanup pass.

use std::collections::HashSet;

use edict_foundation::Name;

use crate::node::{Children, Node, NodeRef};

/// Per-level controls a pre-order visitor may set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraverseFlags {
    /// Do not descend into the current node's children.
    pub halt: bool,
    /// Visit the current node's children in reverse order.
    pub reverse: bool,
}

/// Why a node is being reported without being entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    /// Already entered earlier in this traversal through another link.
    Shared,
    /// An ancestor on the current descent path.
    Cycle,
}

/// One step of a traversal.
#[derive(Debug)]
pub struct Visit<'a> {
    /// Name of the entry the node is bound to, `None` for roots and list children.
    pub name: Option<&'a Name>,
    /// The node itself.
    pub node: &'a NodeRef,
    /// Distance from the root (roots are depth 0).
    pub depth: usize,
    /// Set when the node is not entered again.
    pub repeat: Option<Repeat>,
}

struct Walker<Pre, Post> {
    entered: HashSet<usize>,
    path: HashSet<usize>,
    preop: Pre,
    postop: Post,
    visited: usize,
}

impl<Pre, Post> Walker<Pre, Post>
where
    Pre: FnMut(&Visit<'_>, &mut TraverseFlags),
    Post: FnMut(&Visit<'_>),
{
    fn walk(&mut self, name: Option<&Name>, node: &NodeRef, depth: usize) {
        let id = Node::id(node);
        let repeat = if self.path.contains(&id) {
            Some(Repeat::Cycle)
        } else if self.entered.contains(&id) {
            Some(Repeat::Shared)
        } else {
            None
        };
        let visit = Visit {
            name,
            node,
            depth,
            repeat,
        };
        let mut flags = TraverseFlags::default();
        (self.preop)(&visit, &mut flags);
        if repeat.is_some() {
            return;
        }
        self.entered.insert(id);
        self.visited += 1;

        if !flags.halt {
            self.path.insert(id);
            match node.children() {
                Children::None => {}
                Children::List(mut values) => {
                    if flags.reverse {
                        values.reverse();
                    }
                    for child in &values {
                        self.walk(None, child, depth + 1);
                    }
                }
                Children::Map(mut entries) => {
                    if flags.reverse {
                        entries.reverse();
                    }
                    for (entry, values) in &entries {
                        let ordered: Box<dyn Iterator<Item = &NodeRef>> = if flags.reverse {
                            Box::new(values.iter().rev())
                        } else {
                            Box::new(values.iter())
                        };
                        for child in ordered {
                            self.walk(Some(entry), child, depth + 1);
                        }
                    }
                }
            }
            self.path.remove(&id);
        }

        (self.postop)(&visit);
    }
}

/// Walks every node reachable from `roots`.
///
/// `preop` runs before a node's children and may set [`TraverseFlags`];
/// `postop` runs after them. Repeats get a `preop` call only. Returns the
/// number of distinct nodes entered.
pub fn traverse<Pre, Post>(roots: &[NodeRef], preop: Pre, postop: Post) -> usize
where
    Pre: FnMut(&Visit<'_>, &mut TraverseFlags),
    Post: FnMut(&Visit<'_>),
{
    let mut walker = Walker {
        entered: HashSet::new(),
        path: HashSet::new(),
        preop,
        postop,
        visited: 0,
    };
    for root in roots {
        walker.walk(None, root, 0);
    }
    walker.visited
}
