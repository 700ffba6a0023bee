//! Bytecode instruction set and wire format.
//!
//! Every instruction is one opcode byte. `EXT` is followed by two big-endian
//! `u32` fields, payload length then flags, and then the payload bytes.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use edict_foundation::{Error, ErrorKind, Result};
use edict_listree::Kind;

/// A single bytecode instruction. Discriminants are the wire encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Clear the pending operand.
    Reset = 0,
    /// Load an inline literal as the pending operand.
    Ext,
    /// Raise the pending operand, or a generic exception.
    Throw,
    /// Consume matching exceptions, or bypass the handler when none are pending.
    Catch,
    /// Push the pending literal, or extend the pending cursor with the stack top.
    PushExt,
    /// Evaluate the value popped from the data stack.
    Eval,
    /// Turn the pending literal into a path cursor.
    Ref,
    /// Push the value the pending cursor resolves to.
    Deref,
    /// Store the stack top through the pending cursor.
    Assign,
    /// Remove the value the pending cursor resolves to.
    Remove,
    /// Open a lexical scope with its own data stack.
    CtxPush,
    /// Close a scope, merging its data stack into the outer one.
    CtxPop,
    /// Move the callable to `func` and open an argument stack.
    FunPush,
    /// Call the pending function.
    FunEval,
    /// Close an argument stack after a call.
    FunPop,
    /// Duplicate the data stack top.
    S2S,
    /// Push the innermost scope onto the data stack.
    D2S,
    /// Pop the newest exception onto the data stack.
    E2S,
    /// Push the pending function onto the data stack.
    F2S,
    /// Pop the stack top and open it as a scope.
    S2D,
    /// Pop the stack top and raise it.
    S2E,
    /// Pop the stack top onto `func`.
    S2F,
}

impl Opcode {
    /// All opcodes in encoding order.
    pub const ALL: [Opcode; 22] = [
        Self::Reset,
        Self::Ext,
        Self::Throw,
        Self::Catch,
        Self::PushExt,
        Self::Eval,
        Self::Ref,
        Self::Deref,
        Self::Assign,
        Self::Remove,
        Self::CtxPush,
        Self::CtxPop,
        Self::FunPush,
        Self::FunEval,
        Self::FunPop,
        Self::S2S,
        Self::D2S,
        Self::E2S,
        Self::F2S,
        Self::S2D,
        Self::S2E,
        Self::S2F,
    ];

    /// Decodes an opcode byte.
    ///
    /// # Errors
    /// Returns `UnknownOpcode` for bytes outside the instruction set.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(byte))
            .copied()
            .ok_or_else(|| Error::new(ErrorKind::UnknownOpcode(byte)))
    }

    /// Returns the wire byte.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Returns the mnemonic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reset => "RESET",
            Self::Ext => "EXT",
            Self::Throw => "THROW",
            Self::Catch => "CATCH",
            Self::PushExt => "PUSHEXT",
            Self::Eval => "EVAL",
            Self::Ref => "REF",
            Self::Deref => "DEREF",
            Self::Assign => "ASSIGN",
            Self::Remove => "REMOVE",
            Self::CtxPush => "CTX_PUSH",
            Self::CtxPop => "CTX_POP",
            Self::FunPush => "FUN_PUSH",
            Self::FunEval => "FUN_EVAL",
            Self::FunPop => "FUN_POP",
            Self::S2S => "S2S",
            Self::D2S => "D2S",
            Self::E2S => "E2S",
            Self::F2S => "F2S",
            Self::S2D => "S2D",
            Self::S2E => "S2E",
            Self::S2F => "S2F",
        }
    }

    /// Returns true for opcodes that open a bracketed region. `S2D` opens
    /// a scope that `CTX_POP` closes.
    #[must_use]
    pub const fn opens_region(self) -> bool {
        matches!(self, Self::CtxPush | Self::FunPush | Self::S2D)
    }

    /// Returns true for opcodes that close a bracketed region.
    #[must_use]
    pub const fn closes_region(self) -> bool {
        matches!(self, Self::CtxPop | Self::FunEval)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flags carried by an `EXT` record.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExtFlags(u32);

impl ExtFlags {
    /// No flags: the literal borrows its bytes from the code buffer.
    pub const NONE: ExtFlags = ExtFlags(0);
    /// Duplicate the payload into an owned buffer.
    pub const DUP: ExtFlags = ExtFlags(0x01);
    /// The payload is binary data.
    pub const BINARY: ExtFlags = ExtFlags(0x02);
    /// The payload is compiled bytecode.
    pub const CODE: ExtFlags = ExtFlags(0x04);
    /// The literal is the null value.
    pub const NULL: ExtFlags = ExtFlags(0x08);

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Builds flags from raw bits, keeping unknown bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns true if every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: ExtFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the node kind markers these flags imply.
    #[must_use]
    pub fn kind(self) -> Kind {
        let mut kind = Kind::NONE;
        if self.contains(Self::BINARY) {
            kind |= Kind::BINARY;
        }
        if self.contains(Self::CODE) {
            kind |= Kind::CODE;
        }
        if self.contains(Self::NULL) {
            kind |= Kind::NULL;
        }
        kind
    }
}

impl std::ops::BitOr for ExtFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for ExtFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtFlags({:#x})", self.0)
    }
}

/// Size of the `EXT` header following the opcode byte.
pub const EXT_HEADER: usize = 8;

/// A bytecode buffer under construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bytecode {
    bytes: Vec<u8>,
}

impl Bytecode {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing wire bytes.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Appends an operand-less opcode.
    pub fn emit(&mut self, op: Opcode) -> &mut Self {
        self.bytes.push(op.byte());
        self
    }

    /// Appends an `EXT` record.
    ///
    /// # Errors
    /// Returns `MalformedBytecode` if the payload does not fit a `u32` length.
    pub fn emit_ext(&mut self, payload: &[u8], flags: ExtFlags) -> Result<&mut Self> {
        let len = u32::try_from(payload.len())
            .map_err(|_| Error::malformed(self.bytes.len(), "literal longer than u32::MAX"))?;
        let mut header = [0u8; EXT_HEADER];
        BigEndian::write_u32(&mut header[..4], len);
        BigEndian::write_u32(&mut header[4..], flags.bits());
        self.bytes.push(Opcode::Ext.byte());
        self.bytes.extend_from_slice(&header);
        self.bytes.extend_from_slice(payload);
        Ok(self)
    }

    /// Appends another buffer.
    pub fn append(&mut self, other: &Bytecode) -> &mut Self {
        self.bytes.extend_from_slice(&other.bytes);
        self
    }

    /// Returns the wire bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if nothing has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Freezes the buffer into a shareable allocation.
    #[must_use]
    pub fn into_shared(self) -> Arc<[u8]> {
        Arc::from(self.bytes)
    }

    /// Renders one instruction per line, for diagnostics.
    ///
    /// # Errors
    /// Returns decoding errors for malformed buffers.
    pub fn disassemble(&self) -> Result<String> {
        let mut out = String::new();
        for instruction in Decoder::new(&self.bytes) {
            let instruction = instruction?;
            out.push_str(&format!("{:04} {}", instruction.offset, instruction.op));
            if let Some(ext) = &instruction.ext {
                let payload = String::from_utf8_lossy(&self.bytes[ext.range.clone()]);
                out.push_str(&format!(" {:?} {payload:?}", ext.flags));
            }
            out.push('\n');
        }
        Ok(out)
    }
}

/// Operand of a decoded `EXT` record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ext {
    /// Record flags.
    pub flags: ExtFlags,
    /// Payload position within the code buffer.
    pub range: Range<usize>,
}

/// A decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode byte.
    pub offset: usize,
    /// The opcode.
    pub op: Opcode,
    /// The literal operand, for `EXT`.
    pub ext: Option<Ext>,
}

/// Decodes the instruction at `offset`, returning it with the offset of the
/// following instruction.
///
/// # Errors
/// Returns `UnknownOpcode` or `MalformedBytecode` for truncated records.
pub fn decode_at(code: &[u8], offset: usize) -> Result<(Instruction, usize)> {
    let byte = *code
        .get(offset)
        .ok_or_else(|| Error::malformed(offset, "read past end of code"))?;
    let op = Opcode::from_byte(byte)?;
    if op != Opcode::Ext {
        return Ok((Instruction { offset, op, ext: None }, offset + 1));
    }

    let header = code
        .get(offset + 1..offset + 1 + EXT_HEADER)
        .ok_or_else(|| Error::malformed(offset, "truncated EXT header"))?;
    let len = usize::try_from(BigEndian::read_u32(&header[..4]))
        .map_err(|_| Error::malformed(offset, "EXT length exceeds address space"))?;
    let flags = ExtFlags::from_bits(BigEndian::read_u32(&header[4..]));
    let start = offset + 1 + EXT_HEADER;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= code.len())
        .ok_or_else(|| Error::malformed(offset, format!("EXT payload of {len} bytes is truncated")))?;
    Ok((
        Instruction {
            offset,
            op,
            ext: Some(Ext {
                flags,
                range: start..end,
            }),
        },
        end,
    ))
}

/// Iterates over the instructions of a code buffer.
pub struct Decoder<'a> {
    code: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder starting at offset 0.
    #[must_use]
    pub fn new(code: &'a [u8]) -> Self {
        Self {
            code,
            pos: 0,
            failed: false,
        }
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.code.len() {
            return None;
        }
        match decode_at(self.code, self.pos) {
            Ok((instruction, next)) => {
                self.pos = next;
                Some(Ok(instruction))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
