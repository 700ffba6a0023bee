//! A reflector for functions written in Rust.
//!
//! [`HostReflector`] stands in for a native-library reflection layer when the
//! callables are Rust closures: each registered function becomes a native
//! node in the reflector's module map, and scalars travel as text leaves.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use edict_foundation::{End, Error, Result};
use edict_listree::{NativeValue, Node, NodeRef};
use parking_lot::Mutex;
use tracing::debug;

use crate::ffi::{CallSignature, FnType, NativeArg, Reflector, Trampoline, TypeDesc};

/// A Rust function exposed as a native callable.
pub struct HostFunction {
    ty: FnType,
    func: Trampoline,
}

impl HostFunction {
    /// Wraps `func` with its type.
    #[must_use]
    pub fn new(ty: FnType, func: Trampoline) -> Self {
        Self { ty, func }
    }

    /// Returns the function type.
    #[must_use]
    pub fn ty(&self) -> &FnType {
        &self.ty
    }

    /// Calls the function.
    ///
    /// # Errors
    /// Returns whatever the function reports.
    pub fn call(&self, args: &[NativeArg]) -> Result<NativeArg> {
        (self.func)(args)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction").field("ty", &self.ty).finish_non_exhaustive()
    }
}

impl NativeValue for HostFunction {
    fn type_name(&self) -> &str {
        "fn"
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.ty.name.clone().into_bytes()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A typed native memory cell.
#[derive(Debug)]
pub struct HostCell {
    ty: TypeDesc,
    type_name: String,
    value: Mutex<NodeRef>,
}

impl HostCell {
    /// Creates a cell holding `value`.
    #[must_use]
    pub fn new(ty: TypeDesc, value: NodeRef) -> Self {
        Self {
            type_name: ty.to_string(),
            ty,
            value: Mutex::new(value),
        }
    }

    /// Returns the stored value.
    #[must_use]
    pub fn get(&self) -> NodeRef {
        NodeRef::clone(&self.value.lock())
    }
}

impl NativeValue for HostCell {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn assign(&self, value: &NodeRef) -> Result<()> {
        let checked = match self.ty {
            TypeDesc::Int => parse_int(value).map(|_| ()),
            TypeDesc::Float => parse_float(value).map(|_| ()),
            _ => Ok(()),
        };
        checked?;
        *self.value.lock() = NodeRef::clone(value);
        Ok(())
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.get().to_bytes()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn scalar_text(value: &NodeRef) -> String {
    value.text_lossy().trim().to_string()
}

fn parse_int(value: &NodeRef) -> Result<i64> {
    let text = scalar_text(value);
    text.parse()
        .map_err(|_| Error::ffi(format!("expected int, got {text:?}")))
}

fn parse_float(value: &NodeRef) -> Result<f64> {
    let text = scalar_text(value);
    text.parse()
        .map_err(|_| Error::ffi(format!("expected float, got {text:?}")))
}

/// A reflector over Rust closures.
pub struct HostReflector {
    module: NodeRef,
}

impl HostReflector {
    /// Creates a reflector with an empty module.
    #[must_use]
    pub fn new() -> Self {
        Self { module: Node::map() }
    }

    /// Returns the module map holding every registered function.
    #[must_use]
    pub fn module(&self) -> NodeRef {
        NodeRef::clone(&self.module)
    }

    /// Registers `func` under `name` in the module, shadowing any earlier
    /// binding of that name.
    ///
    /// # Errors
    /// Returns `ReadOnly` or `NotAContainer` if the module cannot be written.
    pub fn register<F>(&self, name: &str, ty: FnType, func: F) -> Result<NodeRef>
    where
        F: Fn(&[NativeArg]) -> Result<NativeArg> + Send + Sync + 'static,
    {
        let node = Node::native(Arc::new(HostFunction::new(ty, Arc::new(func))));
        self.module
            .put(Some(name.as_bytes()), End::Head, NodeRef::clone(&node))?;
        debug!(name, "registered host function");
        Ok(node)
    }

    fn function(value: &NodeRef) -> Option<Arc<dyn NativeValue>> {
        value
            .native_value()
            .filter(|native| native.as_any().is::<HostFunction>())
    }
}

impl Default for HostReflector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostReflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostReflector")
            .field("functions", &self.module.child_count())
            .finish()
    }
}

impl Reflector for HostReflector {
    fn create(&self, ty: &TypeDesc) -> Result<NodeRef> {
        let initial = match ty {
            TypeDesc::Void => return Err(Error::ffi("cannot create a void value")),
            TypeDesc::Int | TypeDesc::Float => Node::text("0"),
            TypeDesc::Bytes | TypeDesc::Node | TypeDesc::Named(_) => Node::null(),
        };
        Ok(Node::native(Arc::new(HostCell::new(ty.clone(), initial))))
    }

    fn callable(&self, value: &NodeRef) -> Option<FnType> {
        let native = Self::function(value)?;
        native
            .as_any()
            .downcast_ref::<HostFunction>()
            .map(|f| f.ty().clone())
    }

    fn invoke(&self, location: &NodeRef, sig: &CallSignature, args: &[NativeArg]) -> Result<NativeArg> {
        let native = Self::function(location)
            .ok_or_else(|| Error::ffi(format!("{} is not a host function", sig.ty.name)))?;
        let function = native
            .as_any()
            .downcast_ref::<HostFunction>()
            .ok_or_else(|| Error::ffi(format!("{} is not a host function", sig.ty.name)))?;
        if args.len() != function.ty().params.len() {
            return Err(Error::ffi(format!(
                "{} takes {} arguments, got {}",
                sig.ty.name,
                function.ty().params.len(),
                args.len()
            )));
        }
        function.call(args)
    }

    fn to_value(&self, arg: NativeArg) -> Result<Option<NodeRef>> {
        Ok(match arg {
            NativeArg::Void => None,
            NativeArg::Int(n) => Some(Node::text(&n.to_string())),
            NativeArg::Float(n) => Some(Node::text(&n.to_string())),
            NativeArg::Bytes(bytes) => Some(Node::owned(bytes)),
            NativeArg::Node(node) => Some(node),
        })
    }

    fn from_value(&self, value: &NodeRef, ty: &TypeDesc) -> Result<NativeArg> {
        let value = match value.native_value() {
            Some(native) => match native.as_any().downcast_ref::<HostCell>() {
                Some(cell) => cell.get(),
                None => NodeRef::clone(value),
            },
            None => NodeRef::clone(value),
        };
        Ok(match ty {
            TypeDesc::Void => NativeArg::Void,
            TypeDesc::Int => NativeArg::Int(parse_int(&value)?),
            TypeDesc::Float => NativeArg::Float(parse_float(&value)?),
            TypeDesc::Bytes => NativeArg::Bytes(value.to_bytes()),
            TypeDesc::Node | TypeDesc::Named(_) => NativeArg::Node(value),
        })
    }

    fn closure(&self, ty: FnType, trampoline: Trampoline) -> Result<NodeRef> {
        Ok(Node::native(Arc::new(HostFunction::new(ty, trampoline))))
    }
}
