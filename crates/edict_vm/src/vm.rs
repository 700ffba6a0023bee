//! Stack-based virtual machine for Edict bytecode.
//!
//! Each run executes inside an [`Env`](env::Env) holding five resource
//! stacks: `dict` (lexical scopes, each a tree node), `stack` (one data
//! stack per scope or call), `func` (callables awaiting `FUN_EVAL`), `excp`
//! (raised exceptions) and `code` (nested code buffers). The environment is
//! owned by the call to [`Vm::run`] and threaded through dispatch, so a run
//! started from a continuation gets its own and never sees the caller's.
//!
//! # Exceptions and skipping
//!
//! Interpreter exceptions are tree values on `excp`. While one is in flight
//! (THROWING), or while a CATCH is bypassing its handler (BYPASS), opcodes
//! are skipped. Skipping keeps brackets balanced: openers raise `skipdepth`,
//! closers lower it, and a closer reached at depth zero belongs to a region
//! opened before skipping began, so it is processed structurally. `S2D`
//! counts as an opener since `CTX_POP` closes its scope. `EXT` and `RESET`
//! always run so operands stay in sync with the code, `REF` promotes a
//! literal without popping or raising, `FUN_POP` always runs, and `CATCH`
//! and `E2S` run at depth zero while THROWING.
//! The end of a code frame ends any skip region begun in it.
//!
//! An opener that fails still opens its region, so the matching closer
//! never consumes an enclosing scope or call.

#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]

mod env;
mod state;

pub use state::VmState;

use std::sync::{Arc, Weak};

use edict_foundation::{Error, Result};
use edict_listree::{Buffer, Kind, Node, NodeRef, PathCursor};
use tracing::{debug, trace, warn};

use crate::compiler::Compiler;
use crate::config::VmConfig;
use crate::ffi::{self, Reflector};
use crate::host::HostReflector;
use crate::opcode::{ExtFlags, Instruction, Opcode, decode_at};
use env::{Env, Frame, Pending};

/// The result of a completed run.
#[derive(Debug)]
pub struct Outcome {
    /// The outermost data stack, bottom first.
    pub stack: Vec<NodeRef>,
    /// Exceptions still pending when the code ran out, oldest first.
    pub exceptions: Vec<NodeRef>,
    /// Final state flags.
    pub state: VmState,
}

impl Outcome {
    /// Returns the top of the data stack.
    #[must_use]
    pub fn top(&self) -> Option<&NodeRef> {
        self.stack.last()
    }

    /// Returns the data stack as text, bottom first.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.stack.iter().map(|n| n.text_lossy()).collect()
    }

    /// Returns true if the run ended with an uncaught exception.
    #[must_use]
    pub fn is_throwing(&self) -> bool {
        self.state.contains(VmState::THROWING)
    }
}

/// The parts of a VM that continuations share with it.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) reflector: Arc<dyn Reflector>,
    pub(crate) compiler: Compiler,
    pub(crate) config: VmConfig,
    fun_pop: Arc<[u8]>,
}

impl Services {
    fn new(reflector: Arc<dyn Reflector>) -> Self {
        Self {
            reflector,
            compiler: Compiler::default(),
            config: VmConfig::default(),
            fun_pop: Arc::from([Opcode::FunPop.byte()]),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakServices {
        WeakServices {
            reflector: Arc::downgrade(&self.reflector),
            compiler: self.compiler.clone(),
            config: self.config.clone(),
            fun_pop: Arc::clone(&self.fun_pop),
        }
    }
}

/// [`Services`] that do not keep the reflector alive. A continuation stored
/// in its reflector's module holds these.
#[derive(Clone)]
pub(crate) struct WeakServices {
    reflector: Weak<dyn Reflector>,
    pub(crate) compiler: Compiler,
    pub(crate) config: VmConfig,
    fun_pop: Arc<[u8]>,
}

impl WeakServices {
    pub(crate) fn upgrade(&self) -> Result<Services> {
        let reflector = self
            .reflector
            .upgrade()
            .ok_or_else(|| Error::continuation("reflector was dropped"))?;
        Ok(Services {
            reflector,
            compiler: self.compiler.clone(),
            config: self.config.clone(),
            fun_pop: Arc::clone(&self.fun_pop),
        })
    }
}

/// Resolves `cursor` in the innermost scope that has the path. With
/// `insert`, a miss everywhere creates the path in the innermost scope.
fn locate(scopes: &[NodeRef], cursor: &mut PathCursor, insert: bool) -> Result<Option<NodeRef>> {
    for scope in scopes.iter().rev() {
        if let Some(value) = cursor.resolve(scope, false)? {
            return Ok(Some(value));
        }
    }
    match scopes.last() {
        Some(innermost) if insert => cursor.resolve(innermost, true),
        _ => Ok(None),
    }
}

fn parse_cursor(path: &NodeRef) -> Result<PathCursor> {
    PathCursor::parse(&path.text_lossy())
}

/// Takes the pending cursor, promoting a literal, or pops the path text
/// from the data stack when nothing is pending.
fn take_cursor(env: &mut Env) -> Result<PathCursor> {
    match env.take_pending() {
        Pending::Cursor(cursor) => Ok(cursor),
        Pending::Literal(path) => parse_cursor(&path),
        Pending::None => parse_cursor(&env.pop()?),
    }
}

impl Services {
    fn push_frame(&self, env: &mut Env, code: Arc<[u8]>) -> Result<()> {
        if env.code.len() >= self.config.max_code_depth {
            return Err(Error::overflow("code"));
        }
        env.code.push(Frame { code, pc: 0 });
        Ok(())
    }

    /// Evaluates a value: native callables are called, compiled code runs
    /// as a new frame, and anything else is compiled as source text.
    fn evaluate(&self, env: &mut Env, value: NodeRef) -> Result<()> {
        if let Some(ty) = self.reflector.callable(&value) {
            trace!(function = %ty.name, "ffi call");
            let ret = ffi::call(self.reflector.as_ref(), &value, &ty, env.data()?)?;
            if let Some(ret) = ret {
                env.push(ret)?;
            }
            return Ok(());
        }
        if value.native_value().is_some() || value.is_map() || value.is_list() {
            return Err(Error::ffi(format!("{} is not callable", value.text_lossy())));
        }
        let code: Arc<[u8]> = if value.kind().contains(Kind::CODE) {
            Arc::from(value.to_bytes())
        } else {
            self.compiler.compile_bytes(&value.to_bytes())?.into_shared()
        };
        self.push_frame(env, code)
    }

    fn literal(code: &Arc<[u8]>, instruction: &Instruction) -> Result<NodeRef> {
        let ext = instruction
            .ext
            .as_ref()
            .ok_or_else(|| Error::malformed(instruction.offset, "EXT without operand"))?;
        let kind = ext.flags.kind();
        let buffer = if ext.flags.contains(ExtFlags::DUP) {
            Buffer::duplicate(&code[ext.range.clone()])
        } else {
            Buffer::view(Arc::clone(code), ext.range.clone())
        };
        Ok(Node::leaf(buffer, kind))
    }

    fn throw(env: &mut Env) -> Result<()> {
        let exception = match env.take_pending() {
            Pending::Literal(value) => value,
            Pending::Cursor(mut cursor) => match locate(&env.dict, &mut cursor, false)? {
                Some(value) => value,
                None => Node::text(cursor.path().as_str()),
            },
            Pending::None => Node::frozen(b"exception"),
        };
        debug!(exception = %exception.text_lossy(), "throw");
        env.raise(exception);
        Ok(())
    }

    fn catch(env: &mut Env) -> Result<()> {
        let pending = env.take_pending();
        if !env.state.contains(VmState::THROWING) {
            trace!("nothing thrown, bypassing handler");
            env.state.insert(VmState::BYPASS);
            return Ok(());
        }
        let position = match pending {
            Pending::None => {
                debug!(count = env.excp.len(), "caught all");
                env.excp.clear();
                None
            }
            Pending::Literal(value) => env.excp.iter().position(|e| e.content_eq(&value)),
            Pending::Cursor(mut cursor) => match locate(&env.dict, &mut cursor, false)? {
                Some(target) => env.excp.iter().position(|e| Node::same(e, &target)),
                None => None,
            },
        };
        if let Some(index) = position {
            let caught = env.excp.remove(index);
            debug!(exception = %caught.text_lossy(), "caught");
        }
        env.settle();
        Ok(())
    }

    fn push_ext(env: &mut Env) -> Result<()> {
        match env.take_pending() {
            Pending::Literal(value) => env.push(value),
            Pending::Cursor(mut cursor) => {
                let name = env.pop()?;
                cursor.extend(&name.to_bytes());
                env.pending = Pending::Cursor(cursor);
                Ok(())
            }
            Pending::None => Err(Error::underflow("operand")),
        }
    }

    fn deref(&self, env: &mut Env) -> Result<()> {
        if matches!(env.pending, Pending::Literal(_)) {
            if let Pending::Literal(value) = env.take_pending() {
                return env.push(value);
            }
        }
        let mut cursor = take_cursor(env)?;
        match locate(&env.dict, &mut cursor, false)? {
            Some(value) if value.kind().contains(Kind::IMMEDIATE) => self.evaluate(env, value),
            Some(value) => env.push(value),
            None => {
                trace!(path = %cursor.path(), "unresolved");
                env.push(Node::text(cursor.path().as_str()))
            }
        }
    }

    fn assign(env: &mut Env) -> Result<()> {
        let mut cursor = take_cursor(env)?;
        let value = env.pop()?;
        if locate(&env.dict, &mut cursor, true)?.is_none() {
            return Err(Error::not_found(cursor.path().to_string()));
        }
        cursor.assign(value)?;
        Ok(())
    }

    fn remove(env: &mut Env) -> Result<()> {
        let mut cursor = take_cursor(env)?;
        if locate(&env.dict, &mut cursor, false)?.is_some() {
            cursor.remove()?;
        } else {
            trace!(path = %cursor.path(), "nothing to remove");
        }
        Ok(())
    }

    /// `REF` while skipping: a literal that parses becomes the pending
    /// cursor so a `CATCH` at depth zero can still match by identity.
    /// Nothing is popped and a bad path stays a literal.
    fn skip_ref(env: &mut Env) {
        if let Pending::Literal(path) = &env.pending {
            match parse_cursor(path) {
                Ok(cursor) => env.pending = Pending::Cursor(cursor),
                Err(e) => trace!(error = %e, "path left unparsed while skipping"),
            }
        }
    }

    fn execute(&self, env: &mut Env, code: &Arc<[u8]>, instruction: &Instruction) -> Result<()> {
        match instruction.op {
            Opcode::Reset => env.pending = Pending::None,
            Opcode::Ext => env.pending = Pending::Literal(Self::literal(code, instruction)?),
            Opcode::Throw => Self::throw(env)?,
            Opcode::Catch => Self::catch(env)?,
            Opcode::PushExt => Self::push_ext(env)?,
            Opcode::Eval => {
                let value = env.pop()?;
                self.evaluate(env, value)?;
            }
            Opcode::Ref => {
                if !matches!(env.pending, Pending::Cursor(_)) {
                    let cursor = take_cursor(env)?;
                    env.pending = Pending::Cursor(cursor);
                }
            }
            Opcode::Deref => self.deref(env)?,
            Opcode::Assign => Self::assign(env)?,
            Opcode::Remove => Self::remove(env)?,
            Opcode::CtxPush => env.open_scope(Env::new_scope()),
            Opcode::CtxPop => {
                env.close_scope()?;
            }
            Opcode::FunPush => {
                let callable = env.pop();
                env.func.push(callable.as_ref().map_or_else(|_| Node::null(), NodeRef::clone));
                env.stack.push(Vec::new());
                callable?;
            }
            Opcode::FunEval => {
                let callable = env.func.pop().ok_or_else(|| Error::underflow("func"))?;
                if let Err(e) = self.push_frame(env, Arc::clone(&self.fun_pop)) {
                    env.merge_stack()?;
                    return Err(e);
                }
                self.evaluate(env, callable)?;
            }
            Opcode::FunPop => env.merge_stack()?,
            Opcode::S2S => {
                let value = env.peek()?;
                env.push(value)?;
            }
            Opcode::D2S => {
                let scope = env.innermost_scope()?;
                env.push(scope)?;
            }
            Opcode::E2S => {
                let exception = env.excp.pop().ok_or_else(|| Error::underflow("excp"))?;
                env.settle();
                env.push(exception)?;
            }
            Opcode::F2S => {
                let callable = env.func.last().cloned().ok_or_else(|| Error::underflow("func"))?;
                env.push(callable)?;
            }
            Opcode::S2D => {
                let scope = env.pop();
                env.open_scope(scope.as_ref().map_or_else(|_| Env::new_scope(), NodeRef::clone));
                scope?;
            }
            Opcode::S2E => {
                let exception = env.pop()?;
                debug!(exception = %exception.text_lossy(), "throw");
                env.raise(exception);
            }
            Opcode::S2F => {
                let callable = env.pop()?;
                env.func.push(callable);
            }
        }
        Ok(())
    }

    /// Handles an opcode met while skipping. Returns false if the opcode
    /// must execute normally.
    fn skip(env: &mut Env, op: Opcode) -> Result<bool> {
        match op {
            Opcode::Ext | Opcode::Reset | Opcode::FunPop => return Ok(false),
            Opcode::Ref => {
                Self::skip_ref(env);
                return Ok(true);
            }
            Opcode::Catch | Opcode::E2S
                if env.skipdepth == 0 && env.state.contains(VmState::THROWING) =>
            {
                return Ok(false);
            }
            _ => {}
        }
        env.pending = Pending::None;
        if op.opens_region() {
            env.skipdepth += 1;
        } else if op.closes_region() {
            if env.skipdepth > 0 {
                env.skipdepth -= 1;
                if env.skipdepth == 0 && !env.state.contains(VmState::THROWING) {
                    env.state.remove(VmState::BYPASS);
                }
            } else {
                match op {
                    Opcode::CtxPop => {
                        env.close_scope()?;
                    }
                    _ => {
                        env.func.pop().ok_or_else(|| Error::underflow("func"))?;
                        env.merge_stack()?;
                    }
                }
                env.state.remove(VmState::BYPASS);
                debug!(op = %op, "closed region while skipping");
            }
        }
        Ok(true)
    }

    /// Runs one instruction of the environment's top frame.
    fn step(&self, env: &mut Env) -> Result<()> {
        let Some(frame) = env.code.last_mut() else {
            env.state.insert(VmState::COMPLETE);
            return Ok(());
        };
        if frame.pc >= frame.code.len() {
            env.code.pop();
            env.skipdepth = 0;
            env.state.remove(VmState::BYPASS);
            env.state.insert(VmState::YIELD);
            if env.code.is_empty() {
                env.state.insert(VmState::COMPLETE);
            }
            return Ok(());
        }

        let code = Arc::clone(&frame.code);
        let (instruction, next) = match decode_at(&code, frame.pc) {
            Ok(decoded) => decoded,
            Err(e) => {
                env.state.insert(VmState::ERROR);
                return Err(e);
            }
        };
        frame.pc = next;
        env.state.remove(VmState::YIELD);
        if self.config.trace_opcodes {
            trace!(
                offset = instruction.offset,
                op = %instruction.op,
                state = ?env.state,
                skipdepth = env.skipdepth,
                "dispatch"
            );
        }

        let result = if env.state.is_skipping() {
            match Self::skip(env, instruction.op) {
                Ok(true) => Ok(()),
                Ok(false) => self.execute(env, &code, &instruction),
                Err(e) => Err(e),
            }
        } else {
            self.execute(env, &code, &instruction)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                debug!(op = %instruction.op, error = %e, "raised");
                env.raise(Node::text(&e.to_string()));
                Ok(())
            }
            Err(e) => {
                env.state.insert(VmState::ERROR);
                Err(e)
            }
        }
    }
}

/// Stack-based virtual machine.
pub struct Vm {
    services: Services,
}

impl Vm {
    /// Creates a VM calling natives through `reflector`.
    #[must_use]
    pub fn new(reflector: Arc<dyn Reflector>) -> Self {
        Self::from_services(Services::new(reflector))
    }

    pub(crate) fn from_services(services: Services) -> Self {
        Self { services }
    }

    pub(crate) fn services(&self) -> &Services {
        &self.services
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.services.config = config;
        self
    }

    /// Replaces the compiler used for source text.
    #[must_use]
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.services.compiler = compiler;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &VmConfig {
        &self.services.config
    }

    /// Returns the reflection collaborator.
    #[must_use]
    pub fn reflector(&self) -> &Arc<dyn Reflector> {
        &self.services.reflector
    }

    /// Compiles `source` and runs it with `root` as the outermost scope.
    ///
    /// # Errors
    /// Returns `Compile` for unlexable source, and fatal dispatch errors.
    pub fn evaluate(&mut self, root: &NodeRef, source: &str) -> Result<Outcome> {
        let code = self.services.compiler.compile(source)?;
        self.run(root, code.into_shared())
    }

    /// Runs compiled code with `root` as the outermost scope.
    ///
    /// # Errors
    /// Returns `MalformedBytecode`, `UnknownOpcode` or `Internal`. Every other
    /// failure is raised inside the VM and reported in the [`Outcome`].
    pub fn run(&mut self, root: &NodeRef, code: Arc<[u8]>) -> Result<Outcome> {
        self.run_with_args(root, code, Vec::new())
    }

    /// Runs compiled code with `args` preloaded on the data stack, last
    /// argument on top.
    ///
    /// Each run gets a fresh environment that is dropped when it returns.
    ///
    /// # Errors
    /// As [`Vm::run`].
    pub fn run_with_args(&mut self, root: &NodeRef, code: Arc<[u8]>, args: Vec<NodeRef>) -> Result<Outcome> {
        let mut env = Env::new(NodeRef::clone(root));
        env.data()?.extend(args);
        self.services.push_frame(&mut env, code)?;
        trace!("environment created");
        while !env.state.contains(VmState::COMPLETE) {
            self.services.step(&mut env)?;
        }

        let (stack, exceptions, state) = env.into_result();
        if !exceptions.is_empty() {
            warn!(
                count = exceptions.len(),
                first = %exceptions[0].text_lossy(),
                "environment finished with pending exceptions"
            );
        }
        Ok(Outcome {
            stack,
            exceptions,
            state,
        })
    }

}

impl Default for Vm {
    fn default() -> Self {
        Self::new(Arc::new(HostReflector::new()))
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("config", &self.services.config)
            .finish_non_exhaustive()
    }
}
