//! Native variables.
//!
//! The tree store does not know how native memory is laid out. A reflection
//! layer wraps each native location in a [`NativeValue`] and the store
//! forwards member and index addressing to it.

use std::any::Any;
use std::fmt;

use edict_foundation::{Error, Result};

use crate::node::NodeRef;

/// A value backed by native memory and type metadata.
pub trait NativeValue: Send + Sync + fmt::Debug {
    /// Name of the native type, for diagnostics.
    fn type_name(&self) -> &str;

    /// Returns the named member (struct field, module symbol).
    ///
    /// `Ok(None)` means the type has no such member.
    ///
    /// # Errors
    /// Returns an error if the member exists but cannot be materialized.
    fn member(&self, name: &[u8]) -> Result<Option<NodeRef>> {
        let _ = name;
        Ok(None)
    }

    /// Returns the element at `index` (array, pointer arithmetic).
    ///
    /// # Errors
    /// Returns an error if the element cannot be materialized.
    fn index(&self, index: usize) -> Result<Option<NodeRef>> {
        let _ = index;
        Ok(None)
    }

    /// Stores `value` into the native location.
    ///
    /// # Errors
    /// The default implementation rejects assignment.
    fn assign(&self, value: &NodeRef) -> Result<()> {
        let _ = value;
        Err(Error::ffi(format!("{} is not assignable", self.type_name())))
    }

    /// Renders the current value as bytes.
    fn to_bytes(&self) -> Vec<u8>;

    /// Supports downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}
