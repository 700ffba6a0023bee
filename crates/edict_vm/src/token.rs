//! Token types for Edict source.
//!
//! Each token maps onto a short, fixed run of opcodes; the compiler does
//! no further parsing.

use crate::opcode::Opcode;
use crate::span::Span;

/// A token from lexical analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The type and value of this token.
    pub kind: TokenKind,
    /// Source location of this token.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns the text this token covers in the given source.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

/// The operand of a throw or catch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// `[text]`
    Literal(Vec<u8>),
    /// A path expression.
    Path(String),
}

/// Token types for Edict source.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Values
    /// `[text]` with balanced nested brackets.
    Literal(Vec<u8>),
    /// A bare path, dereferenced.
    Path(String),
    /// `@path`, or a bare `@` taking the path from the stack.
    Assign(Option<String>),
    /// `/path`, or a bare `/` taking the path from the stack.
    Remove(Option<String>),

    // Control
    /// `!`
    Eval,
    /// `^`, `^[text]` or `^path`
    Throw(Option<Operand>),
    /// `|`, `|[text]` or `|path`
    Catch(Option<Operand>),

    // Delimiters
    /// `<`
    ScopeOpen,
    /// `>`
    ScopeClose,
    /// `(`
    CallOpen,
    /// `)`
    CallClose,

    /// A resource move: `$`, `%d`, `%e`, `%f`, `=d`, `=e`, `=f`.
    Move(Opcode),

    // Special
    /// `# ...` to end of line.
    Comment(String),
    /// Unlexable input.
    Error(String),
    /// End of input.
    Eof,
}
