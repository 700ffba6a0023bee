//! Structural copy that preserves sharing.

use std::collections::HashMap;

use edict_foundation::{End, Result};

use crate::node::{Children, Node, NodeRef};

struct Copier {
    copies: HashMap<usize, NodeRef>,
    max_depth: usize,
}

impl Copier {
    fn copy(&mut self, node: &NodeRef, depth: usize) -> Result<NodeRef> {
        if depth > self.max_depth {
            return Ok(NodeRef::clone(node));
        }
        let id = Node::id(node);
        if let Some(copy) = self.copies.get(&id) {
            return Ok(NodeRef::clone(copy));
        }
        let copy = node.shell();
        self.copies.insert(id, NodeRef::clone(&copy));

        match node.children() {
            Children::None => {}
            Children::List(values) => {
                for child in &values {
                    let child = self.copy(child, depth + 1)?;
                    copy.put(None, End::Tail, child)?;
                }
            }
            Children::Map(entries) => {
                for (name, values) in &entries {
                    for child in values {
                        let child = self.copy(child, depth + 1)?;
                        copy.put(Some(name.as_bytes()), End::Tail, child)?;
                    }
                }
            }
        }
        Ok(copy)
    }
}

/// Copies `node` and everything it links down to `max_depth` levels.
///
/// Nodes reachable through several links are copied once and the copy is
/// linked everywhere the original was, so cycles come out as cycles. Nodes
/// deeper than `max_depth` are linked into the copy as they are. Copies are
/// always mutable; native variables stay shared.
///
/// # Errors
/// Propagates insertion failures, which only occur on internal
/// inconsistency.
pub fn deep_copy(node: &NodeRef, max_depth: usize) -> Result<NodeRef> {
    Copier {
        copies: HashMap::new(),
        max_depth,
    }
    .copy(node, 0)
}
