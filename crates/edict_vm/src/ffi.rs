//! The reflection seam.
//!
//! The VM never inspects native memory itself. Whatever turns native symbols
//! into callable values implements [`Reflector`], and the VM drives it
//! through a fixed protocol: find the callable type of a value, prepare a
//! signature, marshal each parameter off the data stack, invoke, and coerce
//! the result back into a tree value.

use std::fmt;
use std::sync::Arc;

use edict_foundation::{Error, Result};
use edict_listree::NodeRef;

/// A native type, as far as the VM needs to know it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDesc {
    /// No value.
    Void,
    /// A signed integer.
    Int,
    /// A floating-point number.
    Float,
    /// A byte buffer.
    Bytes,
    /// A tree value passed through untouched.
    Node,
    /// A type only the reflector understands.
    Named(String),
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Bytes => f.write_str("bytes"),
            Self::Node => f.write_str("node"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A declared parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub ty: TypeDesc,
}

impl Param {
    /// Creates a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A function type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FnType {
    /// Function name, for diagnostics.
    pub name: String,
    /// Parameters in declaration order.
    pub params: Vec<Param>,
    /// Return type.
    pub ret: TypeDesc,
}

impl FnType {
    /// Creates a function type.
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<Param>, ret: TypeDesc) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
        }
    }
}

/// A marshaled argument or return value.
#[derive(Clone, Debug)]
pub enum NativeArg {
    /// No value.
    Void,
    /// An integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A byte buffer.
    Bytes(Vec<u8>),
    /// A tree value.
    Node(NodeRef),
}

impl NativeArg {
    /// Returns the integer, or an FFI error naming what was found instead.
    ///
    /// # Errors
    /// Returns `Ffi` for non-integer arguments.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            other => Err(Error::ffi(format!("expected int, got {other:?}"))),
        }
    }

    /// Returns the float, widening integers.
    ///
    /// # Errors
    /// Returns `Ffi` for non-numeric arguments.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Self::Float(n) => Ok(*n),
            Self::Int(n) => Ok(*n as f64),
            other => Err(Error::ffi(format!("expected float, got {other:?}"))),
        }
    }
}

/// A prepared call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSignature {
    /// The function type the call was prepared for.
    pub ty: FnType,
}

/// The entry point behind a native closure.
pub type Trampoline = Arc<dyn Fn(&[NativeArg]) -> Result<NativeArg> + Send + Sync>;

/// The reflection collaborator.
pub trait Reflector: Send + Sync {
    /// Creates a native-memory value of the given type.
    ///
    /// # Errors
    /// Returns `Ffi` for types that cannot be instantiated.
    fn create(&self, ty: &TypeDesc) -> Result<NodeRef>;

    /// Returns the function type if `value` is callable.
    fn callable(&self, value: &NodeRef) -> Option<FnType>;

    /// Prepares a call signature.
    ///
    /// # Errors
    /// Returns `Ffi` for unsupported signatures.
    fn prepare(&self, ty: &FnType) -> Result<CallSignature> {
        Ok(CallSignature { ty: ty.clone() })
    }

    /// Marshals one argument. `next` yields the next value off the data
    /// stack.
    ///
    /// # Errors
    /// Propagates stack underflow and conversion failures.
    fn marshal(
        &self,
        param: &Param,
        next: &mut dyn FnMut() -> Result<NodeRef>,
    ) -> Result<NativeArg> {
        self.from_value(&next()?, &param.ty)
    }

    /// Invokes a prepared call on the callable at `location`.
    ///
    /// # Errors
    /// Returns whatever the native side reports.
    fn invoke(&self, location: &NodeRef, sig: &CallSignature, args: &[NativeArg]) -> Result<NativeArg>;

    /// Coerces a native value into a tree value. `None` for void.
    ///
    /// # Errors
    /// Returns `Ffi` for values with no tree representation.
    fn to_value(&self, arg: NativeArg) -> Result<Option<NodeRef>>;

    /// Coerces a tree value into a native value of type `ty`.
    ///
    /// # Errors
    /// Returns `Ffi` when the value does not convert.
    fn from_value(&self, value: &NodeRef, ty: &TypeDesc) -> Result<NativeArg>;

    /// Wraps a trampoline as a native callable value of type `ty`.
    ///
    /// # Errors
    /// Returns `Ffi` if the reflector cannot build closures.
    fn closure(&self, ty: FnType, trampoline: Trampoline) -> Result<NodeRef>;
}

/// Calls `location` with arguments taken off `stack`.
///
/// The last parameter is on top of the stack, so parameters are marshaled
/// back to front. Returns the coerced result, if any.
pub(crate) fn call(
    reflector: &dyn Reflector,
    location: &NodeRef,
    ty: &FnType,
    stack: &mut Vec<NodeRef>,
) -> Result<Option<NodeRef>> {
    let sig = reflector.prepare(ty)?;
    let mut args = Vec::with_capacity(ty.params.len());
    for param in ty.params.iter().rev() {
        let mut next = || stack.pop().ok_or_else(|| Error::underflow("data"));
        args.push(reflector.marshal(param, &mut next)?);
    }
    args.reverse();
    let ret = reflector.invoke(location, &sig, &args)?;
    reflector.to_value(ret)
}
