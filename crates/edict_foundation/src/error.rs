//! Error types for the Edict system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//!
//! These errors form the setup/construction channel: tree operations,
//! compilation, and bytecode decoding report failures through `Result`.
//! Interpreter-level exceptions are ordinary tree values and never pass
//! through this type once they have been raised.

use std::fmt;

use thiserror::Error;

/// The main error type for Edict operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a read-only violation error.
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(ErrorKind::ReadOnly)
    }

    /// Creates an error for an insert into a node that cannot hold children.
    #[must_use]
    pub fn not_a_container(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAContainer(what.into()))
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound(what.into()))
    }

    /// Creates a resource stack underflow error.
    #[must_use]
    pub fn underflow(resource: &'static str) -> Self {
        Self::new(ErrorKind::StackUnderflow(resource))
    }

    /// Creates a resource stack overflow error.
    #[must_use]
    pub fn overflow(resource: &'static str) -> Self {
        Self::new(ErrorKind::StackOverflow(resource))
    }

    /// Creates a compile error at a source position.
    #[must_use]
    pub fn compile(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::new(ErrorKind::Compile {
            message: message.into(),
            line,
            column,
        })
    }

    /// Creates a continuation error.
    #[must_use]
    pub fn continuation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Continuation(message.into()))
    }

    /// Creates a path syntax error.
    #[must_use]
    pub fn path_syntax(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ErrorKind::PathSyntax {
            message: message.into(),
            offset,
        })
    }

    /// Creates a malformed bytecode error.
    #[must_use]
    pub fn malformed(offset: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedBytecode {
            offset,
            message: message.into(),
        })
    }

    /// Creates an FFI error.
    #[must_use]
    pub fn ffi(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Ffi(message.into()))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Returns true if an interpreter can surface this error as an
    /// exception value instead of aborting execution.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.kind,
            ErrorKind::MalformedBytecode { .. } | ErrorKind::UnknownOpcode(_) | ErrorKind::Internal(_)
        )
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Mutation attempted on a read-only node.
    #[error("node is read-only")]
    ReadOnly,

    /// A child insert hit a node that is neither empty nor a container of the
    /// required mode.
    #[error("not a container: {0}")]
    NotAContainer(String),

    /// A list link handle no longer refers to a live slot.
    #[error("stale link: {0}")]
    StaleLink(u32),

    /// Path expression could not be parsed.
    #[error("path syntax error at offset {offset}: {message}")]
    PathSyntax {
        /// Description of the problem.
        message: String,
        /// Byte offset into the path text.
        offset: usize,
    },

    /// A required lookup produced no match.
    #[error("not found: {0}")]
    NotFound(String),

    /// A VM resource stack was empty.
    #[error("{0} stack underflow")]
    StackUnderflow(&'static str),

    /// A VM resource stack hit its configured depth limit.
    #[error("{0} stack overflow")]
    StackOverflow(&'static str),

    /// Bytecode ended mid-record or carried an impossible operand.
    #[error("malformed bytecode at offset {offset}: {message}")]
    MalformedBytecode {
        /// Byte offset of the offending record.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    /// Opcode byte outside the instruction set.
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// Source text could not be compiled.
    #[error("compile error at {line}:{column}: {message}")]
    Compile {
        /// Description of the problem.
        message: String,
        /// Line number (1-indexed).
        line: u32,
        /// Column number (1-indexed).
        column: u32,
    },

    /// The reflection collaborator rejected a call or conversion.
    #[error("ffi: {0}")]
    Ffi(String),

    /// A continuation thread failed to start or panicked.
    #[error("continuation: {0}")]
    Continuation(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Path expression or script name.
    pub source: Option<String>,
    /// Byte offset into the code buffer or path.
    pub offset: Option<usize>,
    /// Chain of evaluation frames, innermost last.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the byte offset.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Adds a frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "at {source}")?;
            if let Some(offset) = self.offset {
                write!(f, "+{offset}")?;
            }
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
