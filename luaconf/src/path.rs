//! Entry-name tokenizer.
//!
//! An entry name addresses a value reachable from the interpreter's globals
//! with dots for table fields and brackets for 1-based integer keys, e.g.
//! `compositions.concerti_grossi_op_6[3]`.  Grammar:
//!
//! ```text
//! Name   = Seg ( ('.' Seg) | ('[' Digits ']') )*
//! Seg    = one or more characters other than '.' and '['
//! Digits = one or more decimal digits
//! ```
//!
//! The tokenizer is lenient: a malformed name (leading separator, empty
//! segment, non-decimal bracket content, text after a `]`) yields `None`,
//! which the navigator reports as "entry not found" rather than an error.

/// One navigation step of an entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A table field (or global binding, for the first step).
    Field(String),
    /// An integer key, 1-based by Lua convention.
    Index(i64),
}

/// Split a name into navigation steps, or `None` if the name is malformed.
///
/// The first step is always a `Field`; names are taken verbatim, with no
/// whitespace handling.
pub fn tokenize(name: &str) -> Option<Vec<Step>> {
    let mut chars = name.chars().peekable();
    let mut steps = vec![Step::Field(segment(&mut chars)?)];

    while let Some(c) = chars.next() {
        match c {
            '.' => steps.push(Step::Field(segment(&mut chars)?)),
            '[' => {
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(d) if d.is_ascii_digit() => digits.push(d),
                        Some(']') => break,
                        _ => return None,
                    }
                }
                if digits.is_empty() {
                    return None;
                }
                steps.push(Step::Index(digits.parse().ok()?));
            }
            // Only a separator may follow a closing bracket.
            _ => return None,
        }
    }
    Some(steps)
}

/// Consume a non-empty run of segment characters.
fn segment(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let mut seg = String::new();
    while let Some(&c) = chars.peek() {
        if c == '.' || c == '[' {
            break;
        }
        seg.push(c);
        chars.next();
    }
    if seg.is_empty() {
        None
    } else {
        Some(seg)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
