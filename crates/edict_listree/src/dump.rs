//! Indented text rendering of a tree.

use std::fmt::{self, Write as _};

use crate::buffer::Kind;
use crate::node::{Node, NodeRef};
use crate::traverse::{Repeat, traverse};

/// Displays a node and everything below it.
///
/// Map entries render as `name: value` lines, list children as `- value`,
/// containers as a bare label followed by their indented children. Nodes met
/// a second time render as `<shared>` or `<cycle>`.
pub struct Dump<'a>(pub &'a NodeRef);

fn scalar(node: &Node) -> String {
    if let Some(native) = node.native_value() {
        return format!("<{}> {}", native.type_name(), String::from_utf8_lossy(&native.to_bytes()));
    }
    if node.kind().contains(Kind::BINARY) {
        return node
            .to_bytes()
            .iter()
            .fold(String::from("0x"), |mut out, b| {
                let _ = write!(out, "{b:02x}");
                out
            });
    }
    if node.is_null() {
        return "<null>".to_string();
    }
    node.text_lossy()
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        traverse(
            std::slice::from_ref(self.0),
            |visit, _| {
                let container = visit.node.is_map() || visit.node.is_list();
                if visit.depth == 0 {
                    if !container {
                        out.push_str(&scalar(visit.node));
                        out.push('\n');
                    }
                    return;
                }
                for _ in 1..visit.depth {
                    out.push_str("  ");
                }
                match visit.name {
                    Some(name) => {
                        let _ = write!(out, "{name}:");
                    }
                    None => out.push('-'),
                }
                match visit.repeat {
                    Some(Repeat::Shared) => out.push_str(" <shared>"),
                    Some(Repeat::Cycle) => out.push_str(" <cycle>"),
                    None if container => {}
                    None => {
                        out.push(' ');
                        out.push_str(&scalar(visit.node));
                    }
                }
                out.push('\n');
            },
            |_| {},
        );
        f.write_str(&out)
    }
}

/// Renders a node to a string.
#[must_use]
pub fn dump(node: &NodeRef) -> String {
    Dump(node).to_string()
}
