//! Field description decoding (control sub-record + subfield layout)

use log::{debug, trace};

use super::codec;
use super::error::{Iso8211Error, Result};
use super::format;
use super::models::{FieldDataStructure, FieldDescription, UNIT_TERMINATOR};

/// Sentinel between the type code and the lexical level of every field's
/// control sub-record. A mismatch means corrupted input or a miscomputed
/// cursor upstream.
pub const CONTROL_LITERAL: [u8; 4] = *b"00;&";

/// Number of bytes in a control sub-record: structure, type, literal, lexical level.
pub const CONTROL_LEN: usize = 9;

/// The leading 9 bytes shared by every field description.
#[derive(Debug, Clone, Copy)]
pub struct ControlSubRecord {
    pub structure: FieldDataStructure,
    pub type_code: u8,
    pub lexical_level: [u8; 3],
}

/// Decode the 9-byte control sub-record at `offset`.
///
/// `offset` is absolute within the record buffer so failures report where
/// the inconsistency sits in the record, not in the field slice.
pub fn parse_control(buf: &[u8], offset: usize) -> Result<ControlSubRecord> {
    if offset + CONTROL_LEN > buf.len() {
        return Err(Iso8211Error::TruncatedRecord {
            offset,
            needed: CONTROL_LEN,
            available: buf.len().saturating_sub(offset),
        });
    }

    let structure =
        FieldDataStructure::try_from(buf[offset]).map_err(|e| relocate(e, offset))?;
    let type_code = buf[offset + 1];

    let literal: [u8; 4] = buf[offset + 2..offset + 6].try_into().unwrap();
    if literal != CONTROL_LITERAL {
        return Err(Iso8211Error::UnexpectedControlLiteral {
            offset: offset + 2,
            found: literal,
        });
    }

    let lexical_level: [u8; 3] = buf[offset + 6..offset + 9].try_into().unwrap();
    Ok(ControlSubRecord {
        structure,
        type_code,
        lexical_level,
    })
}

/// Decode one complete (non-control) field description.
///
/// Layout after the control sub-record: field name, unit terminator,
/// subfield labels, unit terminator, format controls, field terminator.
pub fn parse_description(record: &[u8], offset: usize, length: usize) -> Result<FieldDescription> {
    let control = parse_control(record, offset)?;

    let end = offset + length;
    if end > record.len() {
        return Err(Iso8211Error::TruncatedRecord {
            offset,
            needed: length,
            available: record.len().saturating_sub(offset),
        });
    }
    let body = &record[..end];

    let mut cursor = offset + CONTROL_LEN;
    let name_bytes = codec::read_until(body, cursor, UNIT_TERMINATOR)?;
    let name = codec::ascii_str(name_bytes);
    cursor += name_bytes.len() + 1;

    let label_bytes = codec::read_until(body, cursor, UNIT_TERMINATOR)?;
    let labels = parse_labels(label_bytes);
    cursor += label_bytes.len() + 1;

    let format_offset = cursor;
    let format_bytes = codec::read_until(body, cursor, super::models::FIELD_TERMINATOR)?;
    let format_text = codec::ascii_str(format_bytes);
    let mut subfields = format::parse_format(&format_text).map_err(|e| match e {
        Iso8211Error::MalformedTypeGrammar {
            offset: rel,
            format,
            detail,
        } => Iso8211Error::MalformedTypeGrammar {
            offset: format_offset + rel,
            format,
            detail,
        },
        other => other,
    })?;

    // Labels pair with the expanded subfields positionally; a count
    // mismatch (repetition shorthand vs. per-slot labels) leaves the
    // subfields unlabeled rather than guessing.
    if labels.len() == subfields.len() {
        for (subfield, label) in subfields.iter_mut().zip(labels) {
            subfield.tag = Some(label);
        }
    } else if !labels.is_empty() {
        trace!(
            "Field at offset {}: {} labels for {} subfields, leaving subfields unlabeled",
            offset,
            labels.len(),
            subfields.len()
        );
    }

    debug!(
        "Field description at offset {}: {:?}, name {:?}, {} subfields",
        offset,
        control.structure,
        name,
        subfields.len()
    );
    Ok(FieldDescription {
        structure: control.structure,
        type_code: control.type_code,
        lexical_level: control.lexical_level,
        name,
        subfields,
    })
}

/// Split an array descriptor into labels, dropping the leading cartesian
/// marker (`*`) if present.
fn parse_labels(bytes: &[u8]) -> Vec<String> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let text = codec::ascii_str(bytes);
    let text = text.strip_prefix('*').unwrap_or(&text);
    text.split('!').map(str::to_string).collect()
}

/// Rebase a structure-code error onto its record offset.
fn relocate(err: Iso8211Error, offset: usize) -> Iso8211Error {
    match err {
        Iso8211Error::MalformedRecord { detail, .. } => {
            Iso8211Error::MalformedRecord { offset, detail }
        }
        other => other,
    }
}
