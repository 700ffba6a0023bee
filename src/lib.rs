//! Edict - Embeddable concatenative interpreter
//!
//! This crate re-exports all layers of the Edict system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: edict_runtime    - Script bootstrap, host natives, CLI
//! Layer 2: edict_vm         - Lexer, compiler, bytecode VM, FFI seam, continuations
//! Layer 1: edict_listree    - List/tree value store, name index, path cursors
//! Layer 0: edict_foundation - Core types (Cll, Name, Error)
//! ```

pub use edict_foundation as foundation;
pub use edict_listree as listree;
pub use edict_runtime as runtime;
pub use edict_vm as vm;
