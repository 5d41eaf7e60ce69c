use winnow::ascii::multispace0;
use winnow::combinator::{alt, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    // First character must be alphabetic or underscore (not digit).
    if !input.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// Double-quoted string with backslash escape: `\x` stands for the literal
/// character `x`, whatever it is.
pub fn quoted_string(input: &mut &str) -> ModalResult<String> {
    literal("\"").parse_next(input)?;
    let rest = *input;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    loop {
        match chars.next() {
            None => return Err(ErrMode::Cut(ContextError::new())),
            Some((i, '"')) => {
                *input = &rest[i + 1..];
                return Ok(out);
            }
            Some((_, '\\')) => match chars.next() {
                None => return Err(ErrMode::Cut(ContextError::new())),
                Some((_, c)) => out.push(c),
            },
            Some((_, c)) => out.push(c),
        }
    }
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// Number literal: optional sign, digits, optional fraction (digits may be
/// empty after the dot), optional exponent.
pub fn number_literal(input: &mut &str) -> ModalResult<f64> {
    let start = *input;
    let _ = opt(alt((literal("+"), literal("-")))).parse_next(input)?;
    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    if opt(literal(".")).parse_next(input)?.is_some() {
        let _ = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    }
    if opt(alt((literal("e"), literal("E"))))
        .parse_next(input)?
        .is_some()
    {
        let _ = opt(alt((literal("+"), literal("-")))).parse_next(input)?;
        take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    }
    let consumed = &start[..start.len() - input.len()];
    consumed
        .parse()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

pub fn ws_skip(input: &mut &str) -> ModalResult<()> {
    let _ = multispace0.parse_next(input)?;
    Ok(())
}
