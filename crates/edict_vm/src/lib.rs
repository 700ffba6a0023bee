//! Bytecode, compiler, and stack VM for the Edict concatenative language.
//!
//! This crate provides:
//! - [`Opcode`] / [`Bytecode`] - The 22-opcode instruction set and its wire format
//! - [`Lexer`] / [`compile`] - Source text to bytecode
//! - [`Vm`] - The stack machine with its exception and skip state machine
//! - [`Reflector`] - The seam through which native functions are called
//! - [`HostReflector`] - A reflector for functions written in Rust
//! - [`Continuation`] - Bytecode wrapped as a native callable

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod compiler;
pub mod config;
pub mod continuation;
pub mod ffi;
pub mod host;
pub mod lexer;
pub mod opcode;
pub mod span;
pub mod token;
pub mod vm;

pub use compiler::{Compiler, Emitter, compile, compile_with, default_emit};
pub use config::VmConfig;
pub use continuation::Continuation;
pub use ffi::{CallSignature, FnType, NativeArg, Param, Reflector, Trampoline, TypeDesc};
pub use host::{HostCell, HostFunction, HostReflector};
pub use lexer::Lexer;
pub use opcode::{Bytecode, Decoder, Ext, ExtFlags, Instruction, Opcode};
pub use span::Span;
pub use token::{Operand, Token, TokenKind};
pub use vm::{Outcome, Vm, VmState};
