//! Source to bytecode.
//!
//! Compilation is a single pass over the token stream: each token is handed
//! to an emitter which appends its opcodes. The default emitter implements
//! the token grammar below; hosts can swap in their own.
//!
//! | Token | Bytecode |
//! |-------|----------|
//! | `[text]` | `EXT PUSHEXT` |
//! | `path` | `EXT REF DEREF` |
//! | `@path` / `@` | `EXT REF ASSIGN` / `ASSIGN` |
//! | `/path` / `/` | `EXT REF REMOVE` / `REMOVE` |
//! | `!` | `EVAL` |
//! | `^`, `^[text]`, `^path` | `THROW`, `EXT THROW`, `EXT REF THROW` |
//! | `\|`, `\|[text]`, `\|path` | `CATCH`, `EXT CATCH`, `EXT REF CATCH` |
//! | `<` `>` | `CTX_PUSH` `CTX_POP` |
//! | `(` `)` | `FUN_PUSH` `FUN_EVAL` |
//! | `$ %d %e %f =d =e =f` | `S2S D2S E2S F2S S2D S2E S2F` |

use std::fmt;
use std::sync::Arc;

use edict_foundation::{Error, Result};

use crate::lexer::Lexer;
use crate::opcode::{Bytecode, ExtFlags, Opcode};
use crate::token::{Operand, Token, TokenKind};

/// A token-to-opcode emission callback.
pub type Emitter = dyn Fn(&mut Bytecode, &Token) -> Result<()> + Send + Sync;

fn emit_path(code: &mut Bytecode, path: &str) -> Result<()> {
    code.emit_ext(path.as_bytes(), ExtFlags::NONE)?.emit(Opcode::Ref);
    Ok(())
}

fn emit_operand(code: &mut Bytecode, operand: Option<&Operand>, op: Opcode) -> Result<()> {
    match operand {
        None => {}
        Some(Operand::Literal(bytes)) => {
            code.emit_ext(bytes, ExtFlags::NONE)?;
        }
        Some(Operand::Path(path)) => emit_path(code, path)?,
    }
    code.emit(op);
    Ok(())
}

fn emit_targeted(code: &mut Bytecode, path: Option<&str>, op: Opcode) -> Result<()> {
    if let Some(path) = path {
        emit_path(code, path)?;
    }
    code.emit(op);
    Ok(())
}

/// The default token grammar.
///
/// Literals are emitted without `DUP`, so the values they produce borrow
/// their bytes from the shared code buffer.
///
/// # Errors
/// Returns `Compile` for lexer error tokens.
pub fn default_emit(code: &mut Bytecode, token: &Token) -> Result<()> {
    match &token.kind {
        TokenKind::Literal(bytes) => {
            code.emit_ext(bytes, ExtFlags::NONE)?.emit(Opcode::PushExt);
        }
        TokenKind::Path(path) => {
            emit_path(code, path)?;
            code.emit(Opcode::Deref);
        }
        TokenKind::Assign(path) => emit_targeted(code, path.as_deref(), Opcode::Assign)?,
        TokenKind::Remove(path) => emit_targeted(code, path.as_deref(), Opcode::Remove)?,
        TokenKind::Eval => {
            code.emit(Opcode::Eval);
        }
        TokenKind::Throw(operand) => emit_operand(code, operand.as_ref(), Opcode::Throw)?,
        TokenKind::Catch(operand) => emit_operand(code, operand.as_ref(), Opcode::Catch)?,
        TokenKind::ScopeOpen => {
            code.emit(Opcode::CtxPush);
        }
        TokenKind::ScopeClose => {
            code.emit(Opcode::CtxPop);
        }
        TokenKind::CallOpen => {
            code.emit(Opcode::FunPush);
        }
        TokenKind::CallClose => {
            code.emit(Opcode::FunEval);
        }
        TokenKind::Move(op) => {
            code.emit(*op);
        }
        TokenKind::Comment(_) | TokenKind::Eof => {}
        TokenKind::Error(message) => {
            return Err(Error::compile(message.clone(), token.span.line, token.span.column));
        }
    }
    Ok(())
}

/// Compiles `source` with a custom emitter.
///
/// # Errors
/// Returns the first error the emitter reports.
pub fn compile_with(
    mut emit: impl FnMut(&mut Bytecode, &Token) -> Result<()>,
    source: &str,
) -> Result<Bytecode> {
    let mut code = Bytecode::new();
    let mut lexer = Lexer::new(source);
    loop {
        let token = lexer.next_token();
        if token.kind == TokenKind::Eof {
            break;
        }
        emit(&mut code, &token)?;
    }
    Ok(code)
}

/// Compiles `source` with the default grammar.
///
/// # Errors
/// Returns `Compile` for unlexable input.
pub fn compile(source: &str) -> Result<Bytecode> {
    compile_with(default_emit, source)
}

/// A shareable compiler, carried by the VM for `EVAL` of text values.
#[derive(Clone)]
pub struct Compiler {
    emit: Arc<Emitter>,
}

impl Compiler {
    /// Creates a compiler using `emit` for every token.
    #[must_use]
    pub fn new(emit: Arc<Emitter>) -> Self {
        Self { emit }
    }

    /// Compiles source text.
    ///
    /// # Errors
    /// Returns the first error the emitter reports.
    pub fn compile(&self, source: &str) -> Result<Bytecode> {
        compile_with(|code, token| (self.emit)(code, token), source)
    }

    /// Compiles raw source bytes, replacing invalid UTF-8.
    ///
    /// # Errors
    /// Returns the first error the emitter reports.
    pub fn compile_bytes(&self, source: &[u8]) -> Result<Bytecode> {
        self.compile(&String::from_utf8_lossy(source))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(Arc::new(default_emit))
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler").finish_non_exhaustive()
    }
}
