//! One execution environment: the five resource stacks plus dispatch state.

use std::sync::Arc;

use edict_foundation::{Error, Result};
use edict_listree::{Node, NodeRef, PathCursor};

use super::state::VmState;

/// A code buffer being executed.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) code: Arc<[u8]>,
    pub(crate) pc: usize,
}

/// The operand loaded by `EXT` or promoted by `REF`.
#[derive(Debug, Default)]
pub(crate) enum Pending {
    #[default]
    None,
    Literal(NodeRef),
    Cursor(PathCursor),
}

/// An execution environment.
#[derive(Debug)]
pub(crate) struct Env {
    /// Lexical scopes, root first.
    pub(crate) dict: Vec<NodeRef>,
    /// One data stack per open scope or call.
    pub(crate) stack: Vec<Vec<NodeRef>>,
    /// Callables awaiting `FUN_EVAL`.
    pub(crate) func: Vec<NodeRef>,
    /// Raised exceptions, oldest first.
    pub(crate) excp: Vec<NodeRef>,
    /// In-flight code buffers.
    pub(crate) code: Vec<Frame>,
    pub(crate) pending: Pending,
    pub(crate) state: VmState,
    pub(crate) skipdepth: usize,
}

impl Env {
    pub(crate) fn new(root: NodeRef) -> Self {
        Self {
            dict: vec![root],
            stack: vec![Vec::new()],
            func: Vec::new(),
            excp: Vec::new(),
            code: Vec::new(),
            pending: Pending::None,
            state: VmState::NONE,
            skipdepth: 0,
        }
    }

    /// Returns the innermost data stack.
    pub(crate) fn data(&mut self) -> Result<&mut Vec<NodeRef>> {
        self.stack.last_mut().ok_or_else(|| Error::underflow("stack"))
    }

    pub(crate) fn push(&mut self, value: NodeRef) -> Result<()> {
        self.data()?.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<NodeRef> {
        self.data()?.pop().ok_or_else(|| Error::underflow("data"))
    }

    pub(crate) fn peek(&self) -> Result<NodeRef> {
        self.stack
            .last()
            .and_then(|data| data.last())
            .cloned()
            .ok_or_else(|| Error::underflow("data"))
    }

    pub(crate) fn innermost_scope(&self) -> Result<NodeRef> {
        self.dict.last().cloned().ok_or_else(|| Error::underflow("dict"))
    }

    /// Opens a scope with its own data stack.
    pub(crate) fn open_scope(&mut self, scope: NodeRef) {
        self.dict.push(scope);
        self.stack.push(Vec::new());
    }

    /// Closes the innermost scope. The root scope is never closed.
    pub(crate) fn close_scope(&mut self) -> Result<NodeRef> {
        if self.dict.len() < 2 {
            return Err(Error::underflow("dict"));
        }
        self.merge_stack()?;
        self.dict.pop().ok_or_else(|| Error::underflow("dict"))
    }

    /// Pops the innermost data stack and appends it to the one below.
    pub(crate) fn merge_stack(&mut self) -> Result<()> {
        if self.stack.len() < 2 {
            return Err(Error::underflow("stack"));
        }
        let inner = self.stack.pop().unwrap_or_default();
        self.data()?.extend(inner);
        Ok(())
    }

    pub(crate) fn raise(&mut self, exception: NodeRef) {
        self.excp.push(exception);
        self.state.insert(VmState::THROWING);
    }

    /// Clears THROWING once no exceptions remain.
    pub(crate) fn settle(&mut self) {
        if self.excp.is_empty() {
            self.state.remove(VmState::THROWING);
        }
    }

    pub(crate) fn take_pending(&mut self) -> Pending {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn new_scope() -> NodeRef {
        Node::map()
    }

    /// Returns the data stack of the outermost scope.
    pub(crate) fn into_result(mut self) -> (Vec<NodeRef>, Vec<NodeRef>, VmState) {
        let stack = if self.stack.is_empty() {
            Vec::new()
        } else {
            self.stack.swap_remove(0)
        };
        (stack, std::mem::take(&mut self.excp), self.state)
    }
}
