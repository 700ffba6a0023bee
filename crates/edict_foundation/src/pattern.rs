//! Byte-wise wildcard matching.
//!
//! Patterns understand `*` (any run of bytes, including none), `?` (exactly
//! one byte) and `\` (the next byte is literal; a trailing `\` is itself).
//! Matching works on raw bytes so names and buffer contents need not be
//! UTF-8.

/// Returns true if the pattern contains an unescaped `*` or `?`.
#[must_use]
pub fn is_wildcard(pattern: &[u8]) -> bool {
    let mut i = 0;
    while i < pattern.len() {
        match pattern[i] {
            b'\\' => i += 2,
            b'*' | b'?' => return true,
            _ => i += 1,
        }
    }
    false
}

/// Removes escapes, producing the literal bytes a non-wildcard pattern
/// stands for.
#[must_use]
pub fn unescape(pattern: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pattern.len());
    let mut bytes = pattern.iter();
    while let Some(&b) = bytes.next() {
        if b == b'\\' {
            out.push(bytes.next().copied().unwrap_or(b'\\'));
        } else {
            out.push(b);
        }
    }
    out
}

/// Matches `text` against `pattern`.
///
/// Runs in O(pattern * text) worst case by backtracking only to the most
/// recent `*`.
#[must_use]
pub fn matches(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0usize, 0usize);
    // (pattern index after the star, text index the star currently covers up to)
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        let advance = match pattern.get(p) {
            Some(b'*') => {
                star = Some((p + 1, t));
                p += 1;
                continue;
            }
            Some(b'?') => Some(1),
            Some(b'\\') => match pattern.get(p + 1) {
                Some(&escaped) => (escaped == text[t]).then_some(2),
                None => (text[t] == b'\\').then_some(1),
            },
            Some(&c) => (c == text[t]).then_some(1),
            None => None,
        };
        if let Some(n) = advance {
            p += n;
            t += 1;
            continue;
        }
        match star {
            Some((sp, st)) => {
                p = sp;
                t = st + 1;
                star = Some((sp, st + 1));
            }
            None => return false,
        }
    }

    pattern[p.min(pattern.len())..].iter().all(|&c| c == b'*')
}
