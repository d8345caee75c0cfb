//! Data record decoding against a previously-read DDR
//!
//! A data record repeats the leader/directory layout of the DDR but its
//! field areas carry payload bytes instead of descriptions. Payloads are
//! sliced eagerly; subfield values are extracted lazily against the
//! matching DDR description, accumulating byte offsets left-to-right.

use log::{debug, trace};

use super::codec;
use super::directory;
use super::error::{Iso8211Error, Result};
use super::models::{
    DataDescriptiveRecord, DataField, DataRecord, FieldDataType, FieldDescription,
    LeaderIdentifier, SubfieldValue, FIELD_TERMINATOR, UNIT_TERMINATOR,
};

/// Decode a full data record buffer (leader included) into sliced fields.
pub fn parse_data_record(record: &[u8]) -> Result<DataRecord> {
    let leader = directory::parse_leader(record)?;
    if leader.identifier != LeaderIdentifier::Data {
        return Err(Iso8211Error::MalformedRecord {
            offset: 6,
            detail: format!("expected a data record leader, found {:?}", leader.identifier),
        });
    }

    let entries = directory::parse_directory(record, &leader)?;
    let mut fields = Vec::with_capacity(entries.len());
    for entry in &entries {
        let bytes = directory::field_bytes(record, &leader, entry)?;
        fields.push(DataField {
            tag: entry.tag.clone(),
            bytes: bytes.to_vec(),
        });
    }

    debug!("Data record: {} fields, {} bytes", fields.len(), leader.record_length);
    Ok(DataRecord { leader, fields })
}

impl DataRecord {
    /// Decode one field's payload into rows of typed subfield values.
    ///
    /// The subfield sequence repeats while payload remains before the
    /// trailing field terminator, which is how repeating vector fields
    /// are laid out.
    pub fn decode_field(
        &self,
        ddr: &DataDescriptiveRecord,
        tag: &str,
    ) -> Result<Vec<Vec<SubfieldValue>>> {
        let field = self.field(tag).ok_or_else(|| Iso8211Error::MalformedRecord {
            offset: 0,
            detail: format!("data record has no field tagged {:?}", tag),
        })?;
        let description = ddr
            .field(tag)
            .and_then(|f| f.description.as_ref())
            .ok_or_else(|| Iso8211Error::MalformedRecord {
                offset: 0,
                detail: format!("DDR declares no description for field {:?}", tag),
            })?;
        decode_subfields(&field.bytes, description)
    }
}

/// Walk a field payload against its subfield descriptions.
pub fn decode_subfields(
    bytes: &[u8],
    description: &FieldDescription,
) -> Result<Vec<Vec<SubfieldValue>>> {
    let payload = match bytes.last() {
        Some(&FIELD_TERMINATOR) => &bytes[..bytes.len() - 1],
        _ => bytes,
    };
    if description.subfields.is_empty() {
        return Ok(Vec::new());
    }

    let mut rows = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        let row_start = offset;
        let mut row = Vec::with_capacity(description.subfields.len());
        for subfield in &description.subfields {
            let (value, next) = decode_one(payload, offset, subfield.kind, subfield.length)?;
            trace!("Subfield {:?} at {}: {:?}", subfield.tag, offset, value);
            row.push(value);
            offset = next;
        }
        rows.push(row);
        if offset == row_start {
            // A row of zero-length subfields cannot consume the payload.
            return Err(Iso8211Error::MalformedRecord {
                offset,
                detail: "subfield row consumed no bytes".to_string(),
            });
        }
    }
    Ok(rows)
}

fn decode_one(
    payload: &[u8],
    offset: usize,
    kind: FieldDataType,
    length: Option<usize>,
) -> Result<(SubfieldValue, usize)> {
    match kind {
        FieldDataType::Text
        | FieldDataType::Integer
        | FieldDataType::RealFixed
        | FieldDataType::RealFloat => {
            let (bytes, next) = ascii_slice(payload, offset, length)?;
            let value = match kind {
                FieldDataType::Text => SubfieldValue::Text(codec::ascii_str(bytes)),
                FieldDataType::Integer => SubfieldValue::Integer(codec::ascii_int(bytes, offset)?),
                _ => SubfieldValue::Real(codec::ascii_real(bytes, offset)?),
            };
            Ok((value, next))
        }
        FieldDataType::Logical => {
            // A `C` value is a single indicator byte; a wider declared
            // length only pads the slot, so the cursor skips the rest.
            let width = length.unwrap_or(1);
            bounds_check(payload, offset, width)?;
            Ok((SubfieldValue::Logical(payload[offset]), offset + width))
        }
        FieldDataType::IntegerUnsigned => {
            let width = binary_width(offset, length)?;
            let value = codec::read_unsigned(payload, offset, width)?;
            Ok((SubfieldValue::Unsigned(value), offset + width))
        }
        FieldDataType::IntegerSigned => {
            let width = binary_width(offset, length)?;
            let value = codec::read_signed(payload, offset, width)?;
            Ok((SubfieldValue::Integer(value), offset + width))
        }
        FieldDataType::Real => {
            let width = binary_width(offset, length)?;
            let value = codec::read_float(payload, offset, width)?;
            Ok((SubfieldValue::Real(value), offset + width))
        }
        FieldDataType::Binary => {
            let width = binary_width(offset, length)?;
            bounds_check(payload, offset, width)?;
            let bytes = payload[offset..offset + width].to_vec();
            Ok((SubfieldValue::Bytes(bytes), offset + width))
        }
    }
}

/// Fixed-length ASCII subfields slice exactly; unspecified ones scan to the
/// unit terminator (or end of payload) and consume it.
fn ascii_slice(payload: &[u8], offset: usize, length: Option<usize>) -> Result<(&[u8], usize)> {
    match length {
        Some(width) => {
            bounds_check(payload, offset, width)?;
            Ok((&payload[offset..offset + width], offset + width))
        }
        None => {
            let bytes = codec::read_until_or_end(payload, offset, UNIT_TERMINATOR);
            let mut next = offset + bytes.len();
            if next < payload.len() {
                next += 1; // consume the terminator
            }
            Ok((bytes, next))
        }
    }
}

fn binary_width(offset: usize, length: Option<usize>) -> Result<usize> {
    length.ok_or_else(|| Iso8211Error::MalformedRecord {
        offset,
        detail: "binary subfield requires an explicit width".to_string(),
    })
}

fn bounds_check(payload: &[u8], offset: usize, width: usize) -> Result<()> {
    if offset + width > payload.len() {
        return Err(Iso8211Error::TruncatedRecord {
            offset,
            needed: width,
            available: payload.len().saturating_sub(offset),
        });
    }
    Ok(())
}
