//! Low-level byte decoding utilities
//!
//! Pure, side-effect-free functions over read-only buffers. ISO 8211 mixes
//! two conventions: binary subfields are little-endian fixed-width values,
//! while leader attributes and `A/I/R/S` subfields are ASCII text, possibly
//! blank-padded or delimiter-bounded. Safe for concurrent callers.

use byteorder::{ByteOrder, LittleEndian};

use super::error::{Iso8211Error, Result};

fn checked_slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset.checked_add(len).ok_or(Iso8211Error::TruncatedRecord {
        offset,
        needed: len,
        available: 0,
    })?;
    if end > buf.len() {
        return Err(Iso8211Error::TruncatedRecord {
            offset,
            needed: len,
            available: buf.len().saturating_sub(offset),
        });
    }
    Ok(&buf[offset..end])
}

/// Read a little-endian unsigned integer of 1, 2, 4, or 8 bytes.
pub fn read_unsigned(buf: &[u8], offset: usize, width: usize) -> Result<u64> {
    let bytes = checked_slice(buf, offset, width)?;
    match width {
        1 => Ok(bytes[0] as u64),
        2 => Ok(LittleEndian::read_u16(bytes) as u64),
        4 => Ok(LittleEndian::read_u32(bytes) as u64),
        8 => Ok(LittleEndian::read_u64(bytes)),
        other => Err(Iso8211Error::MalformedRecord {
            offset,
            detail: format!("invalid integer width: {}", other),
        }),
    }
}

/// Read a little-endian two's-complement signed integer of 1, 2, 4, or 8 bytes.
pub fn read_signed(buf: &[u8], offset: usize, width: usize) -> Result<i64> {
    let bytes = checked_slice(buf, offset, width)?;
    match width {
        1 => Ok(bytes[0] as i8 as i64),
        2 => Ok(LittleEndian::read_i16(bytes) as i64),
        4 => Ok(LittleEndian::read_i32(bytes) as i64),
        8 => Ok(LittleEndian::read_i64(bytes)),
        other => Err(Iso8211Error::MalformedRecord {
            offset,
            detail: format!("invalid integer width: {}", other),
        }),
    }
}

/// Read a little-endian IEEE-754 float of 4 or 8 bytes, widened to `f64`.
pub fn read_float(buf: &[u8], offset: usize, width: usize) -> Result<f64> {
    let bytes = checked_slice(buf, offset, width)?;
    match width {
        4 => Ok(LittleEndian::read_f32(bytes) as f64),
        8 => Ok(LittleEndian::read_f64(bytes)),
        other => Err(Iso8211Error::MalformedRecord {
            offset,
            detail: format!("invalid float width: {}", other),
        }),
    }
}

/// Slice from `offset` up to (excluding) a mandatory delimiter byte.
///
/// The delimiter must appear before the end of the buffer; a field whose
/// terminator never arrives means an upstream length was misread.
pub fn read_until(buf: &[u8], offset: usize, delim: u8) -> Result<&[u8]> {
    if offset > buf.len() {
        return Err(Iso8211Error::TruncatedRecord {
            offset,
            needed: 1,
            available: 0,
        });
    }
    let rel = buf[offset..].iter().position(|&b| b == delim).ok_or_else(|| {
        Iso8211Error::MalformedRecord {
            offset,
            detail: format!("delimiter {:#04x} not found before end of buffer", delim),
        }
    })?;
    Ok(&buf[offset..offset + rel])
}

/// Slice from `offset` up to a delimiter byte, or to the end of the buffer
/// if the delimiter never appears.
pub fn read_until_or_end(buf: &[u8], offset: usize, delim: u8) -> &[u8] {
    let tail = &buf[offset.min(buf.len())..];
    match tail.iter().position(|&b| b == delim) {
        Some(rel) => &tail[..rel],
        None => tail,
    }
}

/// Parse an ASCII digit group as an unsigned integer.
///
/// Leading blanks are tolerated (data-record leaders pad unused numeric
/// attributes with spaces); an all-blank group decodes as 0.
pub fn ascii_uint(bytes: &[u8], offset: usize) -> Result<usize> {
    let mut value: usize = 0;
    for &b in bytes.iter().skip_while(|&&b| b == b' ') {
        if !b.is_ascii_digit() {
            return Err(Iso8211Error::MalformedRecord {
                offset,
                detail: format!("non-digit byte {:#04x} in ASCII numeric group", b),
            });
        }
        value = value * 10 + (b - b'0') as usize;
    }
    Ok(value)
}

/// Parse ASCII text as a (possibly signed) decimal integer.
pub fn ascii_int(bytes: &[u8], offset: usize) -> Result<i64> {
    let text = ascii_str(bytes);
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| Iso8211Error::MalformedRecord {
            offset,
            detail: format!("unparsable ASCII integer {:?}", trimmed),
        })
}

/// Parse ASCII text as a decimal real number (fixed or floating notation).
pub fn ascii_real(bytes: &[u8], offset: usize) -> Result<f64> {
    let text = ascii_str(bytes);
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| Iso8211Error::MalformedRecord {
            offset,
            detail: format!("unparsable ASCII real {:?}", trimmed),
        })
}

/// Decode raw bytes as text, replacing anything outside ASCII.
pub fn ascii_str(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
