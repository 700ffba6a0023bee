//! Errors, circular lists, names, and wildcard matching for Edict.
//!
//! This crate provides:
//! - [`Cll`] - Arena-backed circular doubly linked rings with O(1) splice
//! - [`Name`] - Byte-string names with a cached comparison prefix
//! - [`pattern`] - Byte-wise wildcard matching used by lookups
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cll;
pub mod error;
pub mod name;
pub mod pattern;

pub use cll::{Cll, End, Link};
pub use error::{Error, ErrorContext, ErrorKind};
pub use name::Name;

/// Result type alias using the Edict error type.
pub type Result<T> = std::result::Result<T, Error>;
