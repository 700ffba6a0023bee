//! Host functions installed in the runtime's root scope.

use std::io::Write;
use std::sync::Arc;

use edict_foundation::{Error, Result};
use edict_listree::{deep_copy, dump};
use edict_vm::{FnType, HostReflector, NativeArg, Param, TypeDesc};
use parking_lot::Mutex;

/// Nesting limit for `copy`.
const COPY_DEPTH: usize = 256;

/// Where `print` and `dump` write.
#[derive(Clone, Debug, Default)]
pub enum Output {
    /// Standard output.
    #[default]
    Stdout,
    /// An in-memory transcript.
    Captured(Arc<Mutex<String>>),
}

impl Output {
    /// Creates an empty in-memory transcript.
    #[must_use]
    pub fn captured() -> Self {
        Self::Captured(Arc::new(Mutex::new(String::new())))
    }

    /// Returns everything written so far, if captured.
    #[must_use]
    pub fn transcript(&self) -> Option<String> {
        match self {
            Self::Stdout => None,
            Self::Captured(buf) => Some(buf.lock().clone()),
        }
    }

    fn write(&self, text: &str) -> Result<()> {
        match self {
            Self::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes())
                    .and_then(|()| out.flush())
                    .map_err(|e| Error::ffi(format!("write failed: {e}")))
            }
            Self::Captured(buf) => {
                buf.lock().push_str(text);
                Ok(())
            }
        }
    }
}

fn binary(name: &str, a: TypeDesc, b: TypeDesc, ret: TypeDesc) -> FnType {
    FnType::new(name, vec![Param::new("a", a), Param::new("b", b)], ret)
}

fn unary(name: &str, ty: TypeDesc, ret: TypeDesc) -> FnType {
    FnType::new(name, vec![Param::new("value", ty)], ret)
}

fn bytes(arg: &NativeArg) -> Result<&[u8]> {
    match arg {
        NativeArg::Bytes(bytes) => Ok(bytes),
        other => Err(Error::ffi(format!("expected bytes, got {other:?}"))),
    }
}

fn node(arg: &NativeArg) -> Result<&edict_listree::NodeRef> {
    match arg {
        NativeArg::Node(node) => Ok(node),
        other => Err(Error::ffi(format!("expected node, got {other:?}"))),
    }
}

/// Registers the standard natives on `host`.
///
/// | name  | arguments | result |
/// |-------|-----------|--------|
/// | `print` | value | writes the value's text and a newline |
/// | `dump`  | value | writes the value as an indented tree |
/// | `copy`  | value | a deep copy of the value |
/// | `add`   | a b   | a + b |
/// | `sub`   | a b   | a - b |
/// | `eq`    | a b   | `1` if the byte contents match, else `0` |
///
/// # Errors
/// Returns an error if the host module cannot be written.
pub fn install(host: &HostReflector, output: &Output) -> Result<()> {
    let out = output.clone();
    host.register("print", unary("print", TypeDesc::Bytes, TypeDesc::Void), move |args| {
        let text = String::from_utf8_lossy(bytes(&args[0])?).into_owned();
        out.write(&format!("{text}\n"))?;
        Ok(NativeArg::Void)
    })?;

    let out = output.clone();
    host.register("dump", unary("dump", TypeDesc::Node, TypeDesc::Void), move |args| {
        out.write(&dump(node(&args[0])?))?;
        Ok(NativeArg::Void)
    })?;

    host.register("copy", unary("copy", TypeDesc::Node, TypeDesc::Node), |args| {
        Ok(NativeArg::Node(deep_copy(node(&args[0])?, COPY_DEPTH)?))
    })?;

    host.register("add", binary("add", TypeDesc::Int, TypeDesc::Int, TypeDesc::Int), |args| {
        args[0]
            .as_int()?
            .checked_add(args[1].as_int()?)
            .map(NativeArg::Int)
            .ok_or_else(|| Error::ffi("add overflowed"))
    })?;

    host.register("sub", binary("sub", TypeDesc::Int, TypeDesc::Int, TypeDesc::Int), |args| {
        args[0]
            .as_int()?
            .checked_sub(args[1].as_int()?)
            .map(NativeArg::Int)
            .ok_or_else(|| Error::ffi("sub overflowed"))
    })?;

    host.register("eq", binary("eq", TypeDesc::Bytes, TypeDesc::Bytes, TypeDesc::Int), |args| {
        Ok(NativeArg::Int(i64::from(bytes(&args[0])? == bytes(&args[1])?)))
    })?;

    Ok(())
}
