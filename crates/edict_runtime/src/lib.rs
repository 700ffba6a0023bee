//! Process bootstrap and CLI for Edict.
//!
//! This crate provides:
//! - [`CliConfig`] - Command-line flags, parsed by hand
//! - [`Bootstrap`] - A script resolved from the command line
//! - [`Runtime`] - A VM whose root scope carries the host natives

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod natives;
pub mod runtime;

pub use cli::{Bootstrap, CliConfig, ScriptSource};
pub use natives::Output;
pub use runtime::{Runtime, RuntimeError};
