//! Path expressions.
//!
//! ```text
//! path    := ['-'] segment ('.' segment)*
//! segment := name ('[' key ']')*
//! name    := '"' quoted '"' | bare
//! ```
//!
//! Bare names and keys may contain `*` and `?` wildcards; `\` makes the next
//! byte literal. A bare name with wildcards matches entry names; without, it
//! names exactly one entry. An empty bare name followed by keys selects
//! among list-mode children. The leading `-` reverses the direction in which
//! collision lists are searched and new values are placed.

use std::fmt;

use edict_foundation::{Error, Name, Result, pattern};

/// How a segment picks entries of its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SegmentName {
    /// Exactly one entry name.
    Exact(Name),
    /// Every entry whose name matches the wildcard pattern, in name order.
    Pattern(Vec<u8>),
    /// The parent's list-mode children.
    Anonymous,
}

impl SegmentName {
    /// Returns true for wildcard names.
    #[must_use]
    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}

/// One level of a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Entry selection.
    pub name: SegmentName,
    /// Value-match keys, outermost first. The first key matches within the
    /// entry's collision list; each later key matches among the children of
    /// the value selected so far.
    pub keys: Vec<Vec<u8>>,
}

impl Segment {
    /// Creates an exact segment without keys.
    #[must_use]
    pub fn exact(name: &[u8]) -> Self {
        Self {
            name: SegmentName::Exact(Name::new(name)),
            keys: Vec::new(),
        }
    }
}

/// A parsed path expression. Segments are stored innermost first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    segments: Vec<Segment>,
    reverse: bool,
    text: String,
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn error(&self, message: &str) -> Error {
        Error::path_syntax(message, self.pos)
    }

    /// Reads up to (not including) an unescaped `close`, keeping escapes.
    fn delimited(&mut self, close: u8, what: &str) -> Result<Vec<u8>> {
        let start = self.pos;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => return Err(Error::path_syntax(format!("unterminated {what}"), start)),
                Some(b) if b == close => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push(b'\\');
                    self.pos += 1;
                    if let Some(b) = self.peek() {
                        out.push(b);
                        self.pos += 1;
                    }
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
    }

    fn bare(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            match b {
                b'.' | b'[' => break,
                b'\\' => {
                    out.push(b);
                    self.pos += 1;
                    if let Some(b) = self.peek() {
                        out.push(b);
                        self.pos += 1;
                    }
                }
                _ => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
        out
    }

    fn segment(&mut self) -> Result<Segment> {
        let start = self.pos;
        let name = if self.peek() == Some(b'"') {
            self.pos += 1;
            let raw = self.delimited(b'"', "quoted name")?;
            Some(SegmentName::Exact(Name::new(&pattern::unescape(&raw))))
        } else {
            let raw = self.bare();
            if raw.is_empty() {
                None
            } else if pattern::is_wildcard(&raw) {
                Some(SegmentName::Pattern(raw))
            } else {
                Some(SegmentName::Exact(Name::new(&pattern::unescape(&raw))))
            }
        };

        let mut keys = Vec::new();
        while self.peek() == Some(b'[') {
            self.pos += 1;
            keys.push(self.delimited(b']', "value key")?);
        }

        let name = match name {
            Some(name) => name,
            None if !keys.is_empty() => SegmentName::Anonymous,
            None => return Err(Error::path_syntax("empty segment", start)),
        };
        Ok(Segment { name, keys })
    }

    fn path(&mut self) -> Result<(Vec<Segment>, bool)> {
        let reverse = self.peek() == Some(b'-');
        if reverse {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(self.error("empty path"));
        }
        let mut segments = Vec::new();
        loop {
            segments.push(self.segment()?);
            match self.peek() {
                None => break,
                Some(b'.') => self.pos += 1,
                Some(_) => return Err(self.error("expected '.' or end of path")),
            }
        }
        segments.reverse();
        Ok((segments, reverse))
    }
}

fn quote(name: &[u8]) -> String {
    let mut out = String::from("\"");
    for &b in name {
        if b == b'"' || b == b'\\' {
            out.push('\\');
        }
        out.push_str(&String::from_utf8_lossy(&[b]));
    }
    out.push('"');
    out
}

impl Path {
    /// Parses a path expression.
    ///
    /// # Errors
    /// Returns `PathSyntax` with the byte offset of the problem.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_bytes(text.as_bytes())
    }

    /// Parses a path expression from raw bytes.
    ///
    /// # Errors
    /// Returns `PathSyntax` with the byte offset of the problem.
    pub fn parse_bytes(text: &[u8]) -> Result<Self> {
        let (segments, reverse) = Parser { input: text, pos: 0 }.path()?;
        Ok(Self {
            segments,
            reverse,
            text: String::from_utf8_lossy(text).into_owned(),
        })
    }

    /// Returns the segments, innermost first.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the path began with `-`.
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Returns true if any segment names entries by wildcard.
    #[must_use]
    pub fn has_wildcards(&self) -> bool {
        self.segments.iter().any(|s| s.name.is_pattern())
    }

    /// Appends an exact innermost segment.
    pub fn push_innermost(&mut self, name: &[u8]) {
        self.segments.insert(0, Segment::exact(name));
        self.text.push('.');
        self.text.push_str(&quote(name));
    }

    /// Returns the path text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
