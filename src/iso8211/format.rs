//! Subfield format grammar parsing
//!
//! Format controls are a flat, comma-separated token list such as
//! `"(A(10),3I,B12(4))"`. The grammar has no nesting, so a linear scanner
//! is enough; the only subtlety is the type-code tie-break below.

use log::trace;

use super::error::{Iso8211Error, Result};
use super::models::{FieldDataType, SubFieldDescription};

/// Type codes in match order.
///
/// The two-character binary codes must be tried before the bare `B`
/// fallback, otherwise `B11`/`B12`/`B14` would misparse as `BINARY`.
/// Evaluated in declaration order; keep this a list, not a map.
const TYPE_CODES: &[(&str, FieldDataType)] = &[
    ("B1", FieldDataType::IntegerUnsigned),
    ("B2", FieldDataType::IntegerSigned),
    ("B4", FieldDataType::Real),
    ("A", FieldDataType::Text),
    ("I", FieldDataType::Integer),
    ("R", FieldDataType::RealFixed),
    ("S", FieldDataType::RealFloat),
    ("C", FieldDataType::Logical),
    ("B", FieldDataType::Binary),
];

fn grammar_error(format: &str, detail: impl Into<String>) -> Iso8211Error {
    Iso8211Error::MalformedTypeGrammar {
        offset: 0,
        format: format.to_string(),
        detail: detail.into(),
    }
}

/// Parse a format string into its ordered, repetition-expanded subfield list.
pub fn parse_format(format: &str) -> Result<Vec<SubFieldDescription>> {
    let text = format.trim();
    let inner = text
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| grammar_error(format, "format controls must be parenthesized"))?;

    let opens = inner.chars().filter(|&c| c == '(').count();
    let closes = inner.chars().filter(|&c| c == ')').count();
    if opens != closes {
        return Err(grammar_error(format, "unbalanced parentheses"));
    }

    let mut subfields = Vec::new();
    for token in inner.split(',') {
        parse_token(format, token.trim(), &mut subfields)?;
    }
    trace!("Format {:?} expanded to {} subfields", format, subfields.len());
    Ok(subfields)
}

/// Parse one token: `[repetition] code [width] [(length)]`.
fn parse_token(format: &str, token: &str, out: &mut Vec<SubFieldDescription>) -> Result<()> {
    if token.is_empty() {
        return Err(grammar_error(format, "empty token"));
    }

    let digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
    let repetition = if digits == 0 {
        1
    } else {
        token[..digits]
            .parse::<usize>()
            .map_err(|_| grammar_error(format, format!("bad repetition count in {:?}", token)))?
    };
    if repetition == 0 {
        return Err(grammar_error(format, format!("zero repetition in {:?}", token)));
    }
    let rest = &token[digits..];

    let (code, kind) = TYPE_CODES
        .iter()
        .find(|(code, _)| rest.starts_with(code))
        .copied()
        .ok_or_else(|| grammar_error(format, format!("no type code matches {:?}", rest)))?;
    let rest = &rest[code.len()..];

    // Width digits follow the binary codes (the b1w/b2w/b4w convention);
    // an explicit parenthesized length overrides them.
    let width_digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let mut length = if width_digits == 0 {
        None
    } else {
        Some(rest[..width_digits].parse::<usize>().map_err(|_| {
            grammar_error(format, format!("bad width digits in {:?}", token))
        })?)
    };
    let rest = &rest[width_digits..];

    let rest = if let Some(parenthesized) = rest.strip_prefix('(') {
        let closing = parenthesized
            .find(')')
            .ok_or_else(|| grammar_error(format, format!("unterminated length in {:?}", token)))?;
        let explicit = parenthesized[..closing]
            .parse::<usize>()
            .map_err(|_| grammar_error(format, format!("bad length digits in {:?}", token)))?;
        length = Some(explicit);
        &parenthesized[closing + 1..]
    } else {
        rest
    };
    if !rest.is_empty() {
        return Err(grammar_error(
            format,
            format!("trailing {:?} after token {:?}", rest, token),
        ));
    }

    for _ in 0..repetition {
        out.push(SubFieldDescription {
            tag: None,
            kind,
            length,
            mandatory: true,
        });
    }
    Ok(())
}
