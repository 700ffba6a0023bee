//! Reference-counted list/tree value store and path cursors for Edict.
//!
//! This crate provides:
//! - [`Node`] - The generic tree value: a leaf buffer, an ordered list of
//!   children, a name-indexed map of children, or a native variable
//! - [`NameIndex`] - Arena-backed balanced (Andersson) tree of named entries
//! - [`traverse`](traverse::traverse) - Cycle-safe pre/post-order traversal
//! - [`deep_copy`](copy::deep_copy) - Sharing-aware structural copy
//! - [`Dump`] - Indented, cycle-safe text rendering
//! - [`PathCursor`] - Path expressions that resolve, iterate, insert, and
//!   remove tree entries

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod buffer;
pub mod copy;
pub mod cursor;
pub mod dump;
pub mod entry;
pub mod index;
pub mod native;
pub mod node;
pub mod path;
pub mod traverse;

pub use buffer::{Buffer, Kind};
pub use copy::deep_copy;
pub use cursor::PathCursor;
pub use dump::{Dump, dump};
pub use entry::NamedEntry;
pub use index::NameIndex;
pub use native::NativeValue;
pub use node::{Access, Children, Content, Node, NodeRef, ValueLink};
pub use path::{Path, Segment, SegmentName};
pub use traverse::{Repeat, TraverseFlags, Visit, traverse};

pub use edict_foundation::{End, Error, ErrorKind, Name, Result};
