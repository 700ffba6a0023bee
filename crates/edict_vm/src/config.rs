//! Configuration for the virtual machine.

/// Configuration for the virtual machine.
///
/// Controls resource limits, continuation threading, and opcode tracing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmConfig {
    /// Maximum depth of the code stack. Evaluating past it raises an
    /// exception instead of growing without bound.
    pub max_code_depth: usize,

    /// Run continuations on a freshly spawned OS thread (true) or on the
    /// calling thread (false).
    pub spawn_continuation_threads: bool,

    /// Stack size for continuation threads; `None` uses the platform default.
    pub continuation_stack_size: Option<usize>,

    /// Name prefix for continuation threads.
    pub thread_name: String,

    /// Emit a `trace!` event for every dispatched opcode.
    pub trace_opcodes: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_code_depth: 1024,
            spawn_continuation_threads: true,
            continuation_stack_size: None,
            thread_name: "edict-cont".to_string(),
            trace_opcodes: false,
        }
    }
}

impl VmConfig {
    /// Creates a configuration that runs continuations inline and keeps
    /// the code stack shallow, for embedding in tests.
    #[must_use]
    pub fn embedded() -> Self {
        Self {
            max_code_depth: 256,
            spawn_continuation_threads: false,
            ..Self::default()
        }
    }

    /// Creates a configuration with per-opcode tracing enabled.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            trace_opcodes: true,
            ..Self::default()
        }
    }

    /// Builder method to set the code stack limit.
    #[must_use]
    pub fn with_max_code_depth(mut self, depth: usize) -> Self {
        self.max_code_depth = depth;
        self
    }

    /// Builder method to choose threaded or inline continuations.
    #[must_use]
    pub fn with_spawn_continuation_threads(mut self, spawn: bool) -> Self {
        self.spawn_continuation_threads = spawn;
        self
    }

    /// Builder method to set the continuation thread stack size.
    #[must_use]
    pub fn with_continuation_stack_size(mut self, size: usize) -> Self {
        self.continuation_stack_size = Some(size);
        self
    }

    /// Builder method to set the continuation thread name prefix.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Builder method to enable/disable opcode tracing.
    #[must_use]
    pub fn with_trace_opcodes(mut self, trace: bool) -> Self {
        self.trace_opcodes = trace;
        self
    }
}
