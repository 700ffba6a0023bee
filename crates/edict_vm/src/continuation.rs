//! Native closures that run bytecode.
//!
//! A continuation pairs a code buffer with a captured root scope. The
//! reflector wraps it as a native callable; when native code calls it, the
//! code runs in a fresh environment on its own OS thread while the caller
//! blocks on the join, so the call is synchronous from the caller's side.
//!
//! The reflector is held weakly: a continuation registered in the module of
//! the reflector that built it does not keep that reflector alive.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use edict_foundation::{Error, Result};
use edict_listree::NodeRef;
use tracing::debug;

use crate::ffi::{FnType, NativeArg, Trampoline, TypeDesc};
use crate::vm::{Outcome, Services, Vm, WeakServices};

static THREAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Bytecode callable from native code.
pub struct Continuation {
    code: Arc<[u8]>,
    root: NodeRef,
    services: WeakServices,
    ret: TypeDesc,
}

impl Continuation {
    pub(crate) fn new(code: Arc<[u8]>, root: NodeRef, services: WeakServices, ret: TypeDesc) -> Self {
        Self {
            code,
            root,
            services,
            ret,
        }
    }

    fn run(services: Services, root: &NodeRef, code: Arc<[u8]>, args: Vec<NodeRef>) -> Result<Outcome> {
        Vm::from_services(services).run_with_args(root, code, args)
    }

    fn run_on_thread(&self, services: Services, args: Vec<NodeRef>) -> Result<Outcome> {
        let config = &services.config;
        let name = format!(
            "{}-{}",
            config.thread_name,
            THREAD_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(size) = config.continuation_stack_size {
            builder = builder.stack_size(size);
        }

        let root = NodeRef::clone(&self.root);
        let code = Arc::clone(&self.code);
        debug!(thread = %name, "starting continuation");
        let handle = builder
            .spawn(move || Self::run(services, &root, code, args))
            .map_err(|e| Error::continuation(format!("failed to spawn {name}: {e}")))?;
        let outcome = handle
            .join()
            .map_err(|_| Error::continuation(format!("{name} panicked")))?;
        debug!(thread = %name, "joined continuation");
        outcome
    }

    /// Runs the code with `args` on the data stack, last argument on top,
    /// and converts the top of the resulting stack to the return type.
    ///
    /// # Errors
    /// Returns `Continuation` if the reflector is gone, the thread cannot
    /// start or panics, or the code ends with an uncaught exception, and
    /// conversion failures.
    pub fn call(&self, args: &[NativeArg]) -> Result<NativeArg> {
        let services = self.services.upgrade()?;
        let reflector = Arc::clone(&services.reflector);
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            if let Some(value) = reflector.to_value(arg.clone())? {
                values.push(value);
            }
        }

        let outcome = if services.config.spawn_continuation_threads {
            self.run_on_thread(services, values)?
        } else {
            Self::run(services, &self.root, Arc::clone(&self.code), values)?
        };
        if let Some(exception) = outcome.exceptions.last() {
            return Err(Error::continuation(format!(
                "uncaught exception: {}",
                exception.text_lossy()
            )));
        }
        match (outcome.top(), &self.ret) {
            (_, TypeDesc::Void) => Ok(NativeArg::Void),
            (Some(top), ty) => reflector.from_value(top, ty),
            (None, ty) => Err(Error::continuation(format!("expected a {ty} result, stack is empty"))),
        }
    }
}

impl std::fmt::Debug for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Continuation")
            .field("code_len", &self.code.len())
            .field("ret", &self.ret)
            .finish_non_exhaustive()
    }
}

impl Vm {
    /// Wraps `code` as a native callable of type `ty` that runs with `root`
    /// as its outermost scope.
    ///
    /// # Errors
    /// Returns `Ffi` if the reflector cannot build closures.
    pub fn continuation(&self, code: Arc<[u8]>, root: &NodeRef, ty: FnType) -> Result<NodeRef> {
        let continuation = Arc::new(Continuation::new(
            code,
            NodeRef::clone(root),
            self.services().downgrade(),
            ty.ret.clone(),
        ));
        let trampoline: Trampoline = Arc::new(move |args| continuation.call(args));
        self.reflector().closure(ty, trampoline)
    }
}
