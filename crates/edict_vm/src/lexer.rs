//! Lexer for Edict source.
//!
//! The lexer converts source text into a stream of tokens. Tokens are
//! separated by whitespace or by the single-character operators, except
//! that a path keeps its bracketed value keys and quoted segments intact.

use crate::opcode::Opcode;
use crate::span::Span;
use crate::token::{Operand, Token, TokenKind};

/// Lexer for Edict source code.
pub struct Lexer<'src> {
    /// Remaining source text.
    rest: &'src str,
    /// Current byte offset in source.
    position: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    column: u32,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            rest: source,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;

        let Some(c) = self.peek_char() else {
            return Token::new(
                TokenKind::Eof,
                Span::new(start, start, start_line, start_column),
            );
        };

        let kind = match c {
            '[' => self.scan_literal().map_or_else(TokenKind::Error, TokenKind::Literal),
            '#' => self.scan_comment(),
            '!' => self.single(TokenKind::Eval),
            '<' => self.single(TokenKind::ScopeOpen),
            '>' => self.single(TokenKind::ScopeClose),
            '(' => self.single(TokenKind::CallOpen),
            ')' => self.single(TokenKind::CallClose),
            '$' => self.single(TokenKind::Move(Opcode::S2S)),
            '@' => {
                self.advance();
                self.scan_optional_path().map_or_else(TokenKind::Error, TokenKind::Assign)
            }
            '/' => {
                self.advance();
                self.scan_optional_path().map_or_else(TokenKind::Error, TokenKind::Remove)
            }
            '^' => {
                self.advance();
                self.scan_operand().map_or_else(TokenKind::Error, TokenKind::Throw)
            }
            '|' => {
                self.advance();
                self.scan_operand().map_or_else(TokenKind::Error, TokenKind::Catch)
            }
            '%' | '=' => self.scan_move(c),
            c if is_path_start(c) => self.scan_path().map_or_else(TokenKind::Error, TokenKind::Path),
            c => {
                self.advance();
                TokenKind::Error(format!("unexpected character: {c}"))
            }
        };

        Token::new(
            kind,
            Span::new(start, self.position, start_line, start_column),
        )
    }

    /// Tokenizes all source and returns a vector of tokens.
    ///
    /// Comments are included in the output.
    #[must_use]
    pub fn tokenize_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Peeks at the next character without consuming it.
    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    /// Peeks at the character after the next one.
    fn peek_second(&self) -> Option<char> {
        self.rest.chars().nth(1)
    }

    /// Advances past the next character.
    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            let len = c.len_utf8();
            self.rest = &self.rest[len..];
            self.position += len;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    /// Consumes the next character and appends it to `out`.
    fn take(&mut self, out: &mut String) {
        if let Some(c) = self.peek_char() {
            out.push(c);
            self.advance();
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Scans a comment starting with `#`.
    fn scan_comment(&mut self) -> TokenKind {
        let mut text = String::new();
        self.advance();
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.take(&mut text);
        }
        TokenKind::Comment(text)
    }

    /// Scans `[...]`, honoring nested brackets. `\` makes the next character
    /// literal and is dropped.
    fn scan_literal(&mut self) -> Result<Vec<u8>, String> {
        let mut text = String::new();
        let mut depth = 0usize;
        self.advance();
        loop {
            match self.peek_char() {
                None => return Err("unterminated literal".to_string()),
                Some('\\') => {
                    self.advance();
                    if self.peek_char().is_none() {
                        return Err("unterminated literal".to_string());
                    }
                    self.take(&mut text);
                }
                Some('[') => {
                    depth += 1;
                    self.take(&mut text);
                }
                Some(']') if depth == 0 => {
                    self.advance();
                    return Ok(text.into_bytes());
                }
                Some(']') => {
                    depth -= 1;
                    self.take(&mut text);
                }
                Some(_) => self.take(&mut text),
            }
        }
    }

    /// Scans a path expression, keeping its escapes, quotes and value keys
    /// verbatim for the path parser.
    fn scan_path(&mut self) -> Result<String, String> {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            match c {
                '\\' => {
                    self.take(&mut text);
                    self.take(&mut text);
                }
                '"' => self.scan_delimited(&mut text, '"', "unterminated quoted name")?,
                '[' => self.scan_delimited(&mut text, ']', "unterminated value key")?,
                c if is_path_char(c) => self.take(&mut text),
                _ => break,
            }
        }
        Ok(text)
    }

    fn scan_delimited(&mut self, text: &mut String, close: char, error: &str) -> Result<(), String> {
        self.take(text);
        loop {
            match self.peek_char() {
                None => return Err(error.to_string()),
                Some('\\') => {
                    self.take(text);
                    self.take(text);
                }
                Some(c) if c == close => {
                    self.take(text);
                    return Ok(());
                }
                Some(_) => self.take(text),
            }
        }
    }

    fn scan_optional_path(&mut self) -> Result<Option<String>, String> {
        match self.peek_char() {
            Some(c) if is_path_start(c) => self.scan_path().map(Some),
            _ => Ok(None),
        }
    }

    fn scan_operand(&mut self) -> Result<Option<Operand>, String> {
        match self.peek_char() {
            Some('[') => self.scan_literal().map(|l| Some(Operand::Literal(l))),
            Some(c) if is_path_start(c) => self.scan_path().map(|p| Some(Operand::Path(p))),
            _ => Ok(None),
        }
    }

    /// Scans `%d %e %f` (push a resource onto the data stack) and
    /// `=d =e =f` (pop the data stack into a resource).
    fn scan_move(&mut self, prefix: char) -> TokenKind {
        let op = match (prefix, self.peek_second()) {
            ('%', Some('d')) => Some(Opcode::D2S),
            ('%', Some('e')) => Some(Opcode::E2S),
            ('%', Some('f')) => Some(Opcode::F2S),
            ('=', Some('d')) => Some(Opcode::S2D),
            ('=', Some('e')) => Some(Opcode::S2E),
            ('=', Some('f')) => Some(Opcode::S2F),
            _ => None,
        };
        self.advance();
        match op {
            Some(op) => {
                self.advance();
                TokenKind::Move(op)
            }
            None => TokenKind::Error(format!("unknown resource move: {prefix}")),
        }
    }
}

/// Characters that end a path token.
fn is_operator(c: char) -> bool {
    matches!(
        c,
        '!' | '<' | '>' | '(' | ')' | '$' | '@' | '/' | '^' | '|' | '#' | '%' | '=' | ']'
    )
}

fn is_path_char(c: char) -> bool {
    !c.is_whitespace() && !is_operator(c)
}

fn is_path_start(c: char) -> bool {
    c != '[' && is_path_char(c)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize_all(source)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect()
    }

    #[test]
    fn lex_literals_with_nesting_and_escapes() {
        assert_eq!(
            kinds(r"[a [b] c] [x\]y]"),
            vec![
                TokenKind::Literal(b"a [b] c".to_vec()),
                TokenKind::Literal(b"x]y".to_vec()),
            ]
        );
    }

    #[test]
    fn lex_paths_and_assignments() {
        assert_eq!(
            kinds(r#"a.b @c / /"x y" @"#),
            vec![
                TokenKind::Path("a.b".into()),
                TokenKind::Assign(Some("c".into())),
                TokenKind::Remove(None),
                TokenKind::Remove(Some("\"x y\"".into())),
                TokenKind::Assign(None),
            ]
        );
    }

    #[test]
    fn lex_paths_keep_value_keys() {
        assert_eq!(kinds("stack[top].x"), vec![TokenKind::Path("stack[top].x".into())]);
        assert_eq!(kinds("-a*"), vec![TokenKind::Path("-a*".into())]);
    }

    #[test]
    fn lex_operators() {
        assert_eq!(
            kinds("< > ( ) ! $ %d %e %f =d =e =f"),
            vec![
                TokenKind::ScopeOpen,
                TokenKind::ScopeClose,
                TokenKind::CallOpen,
                TokenKind::CallClose,
                TokenKind::Eval,
                TokenKind::Move(Opcode::S2S),
                TokenKind::Move(Opcode::D2S),
                TokenKind::Move(Opcode::E2S),
                TokenKind::Move(Opcode::F2S),
                TokenKind::Move(Opcode::S2D),
                TokenKind::Move(Opcode::S2E),
                TokenKind::Move(Opcode::S2F),
            ]
        );
    }

    #[test]
    fn lex_throw_and_catch_operands() {
        assert_eq!(
            kinds("^ ^[boom] |err | <"),
            vec![
                TokenKind::Throw(None),
                TokenKind::Throw(Some(Operand::Literal(b"boom".to_vec()))),
                TokenKind::Catch(Some(Operand::Path("err".into()))),
                TokenKind::Catch(None),
                TokenKind::ScopeOpen,
            ]
        );
    }

    #[test]
    fn delimiters_end_paths() {
        assert_eq!(
            kinds("inc(counter)"),
            vec![
                TokenKind::Path("inc".into()),
                TokenKind::CallOpen,
                TokenKind::Path("counter".into()),
                TokenKind::CallClose,
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        let tokens = Lexer::tokenize_all("a # note\nb");
        assert_eq!(tokens[1].kind, TokenKind::Comment(" note".into()));
        assert_eq!(tokens[2].kind, TokenKind::Path("b".into()));
        assert_eq!((tokens[2].span.line, tokens[2].span.column), (2, 1));
    }

    #[test]
    fn errors_are_tokens() {
        assert!(matches!(&kinds("[open")[0], TokenKind::Error(m) if m == "unterminated literal"));
        assert!(matches!(&kinds("]")[0], TokenKind::Error(_)));
        assert!(matches!(&kinds("%x")[0], TokenKind::Error(_)));
        assert!(matches!(&kinds("a[b")[0], TokenKind::Error(_)));
    }

    #[test]
    fn spans_track_columns() {
        let tokens = Lexer::tokenize_all("[0] @counter");
        assert_eq!(tokens[0].span, Span::new(0, 3, 1, 1));
        assert_eq!(tokens[1].span, Span::new(4, 12, 1, 5));
        assert_eq!(tokens[1].text("[0] @counter"), "@counter");
    }

    proptest! {
        #[test]
        fn lexer_never_panics_and_terminates(source in "\\PC{0,64}") {
            let tokens = Lexer::tokenize_all(&source);
            prop_assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
            for token in &tokens {
                prop_assert!(token.span.end <= source.len());
            }
        }
    }
}
