//! Leader and directory decoding
//!
//! Leader structure (24 bytes, mixed ASCII/raw convention):
//! - Bytes 0-4:   Record length (ASCII digits)
//! - Byte 5:      Interchange level
//! - Byte 6:      Leader identifier (`'L'` DDR, `'D'` DR)
//! - Byte 7:      Inline extension indicator
//! - Byte 8:      Version number
//! - Byte 9:      Application indicator
//! - Bytes 10-11: Field control length (ASCII digits)
//! - Bytes 12-16: Base address of the field area (ASCII digits)
//! - Bytes 17-19: Extended character set indicator (raw)
//! - Bytes 20-23: Directory entry sizes, one ASCII digit each:
//!                length, position, reserved, tag
//!
//! The directory follows immediately: `directory_count` entries of
//! `tag_size + length_size + position_size` bytes, then one field
//! terminator.

use log::{debug, info, trace};

use super::codec;
use super::error::{Iso8211Error, Result};
use super::models::{
    DirectoryEntry, EntrySizes, Leader, LeaderIdentifier, FIELD_TERMINATOR,
};

/// Fixed size of every record leader.
pub const LEADER_LEN: usize = 24;

/// Decode the 24-byte leader at the start of a record buffer.
pub fn parse_leader(buf: &[u8]) -> Result<Leader> {
    if buf.len() < LEADER_LEN {
        return Err(Iso8211Error::TruncatedRecord {
            offset: 0,
            needed: LEADER_LEN,
            available: buf.len(),
        });
    }

    let record_length = codec::ascii_uint(&buf[0..5], 0)?;
    let interchange_level = buf[5];
    let identifier = LeaderIdentifier::try_from(buf[6])?;
    let extension_indicator = buf[7];
    let version = buf[8];
    let application_indicator = buf[9];
    let field_control_length = codec::ascii_uint(&buf[10..12], 10)?;
    let base_address = codec::ascii_uint(&buf[12..17], 12)?;
    let charset_indicator: [u8; 3] = buf[17..20].try_into().unwrap();

    let entry_sizes = EntrySizes {
        length_size: codec::ascii_uint(&buf[20..21], 20)?,
        position_size: codec::ascii_uint(&buf[21..22], 21)?,
        reserved_size: codec::ascii_uint(&buf[22..23], 22)?,
        tag_size: codec::ascii_uint(&buf[23..24], 23)?,
    };

    if record_length < LEADER_LEN || base_address < LEADER_LEN || base_address > record_length {
        return Err(Iso8211Error::MalformedRecord {
            offset: 0,
            detail: format!(
                "leader declares record length {} with base address {}",
                record_length, base_address
            ),
        });
    }
    if entry_sizes.tag_size == 0 || entry_sizes.length_size == 0 || entry_sizes.position_size == 0 {
        return Err(Iso8211Error::MalformedRecord {
            offset: 20,
            detail: format!("zero directory entry size digits {:?}", entry_sizes),
        });
    }

    let leader = Leader {
        record_length,
        interchange_level,
        identifier,
        extension_indicator,
        version,
        application_indicator,
        field_control_length,
        base_address,
        charset_indicator,
        entry_sizes,
    };
    info!(
        "Leader: {:?}, record {} bytes, field area at {}, {} directory entries",
        leader.identifier,
        leader.record_length,
        leader.base_address,
        leader.directory_count()
    );
    Ok(leader)
}

/// Decode the directory entries between the leader and the field area.
///
/// `record` is the full record buffer, leader included, so entry offsets
/// in errors are absolute.
pub fn parse_directory(record: &[u8], leader: &Leader) -> Result<Vec<DirectoryEntry>> {
    let sizes = &leader.entry_sizes;
    let entry_size = sizes.entry_size();
    let count = leader.directory_count();
    let needed = count * entry_size + 1;

    let available = record
        .len()
        .min(leader.base_address)
        .saturating_sub(LEADER_LEN);
    if available < needed {
        return Err(Iso8211Error::TruncatedDirectory {
            offset: LEADER_LEN,
            needed,
            available,
        });
    }

    debug!(
        "Directory: {} entries of {} bytes (tag {}, length {}, position {})",
        count, entry_size, sizes.tag_size, sizes.length_size, sizes.position_size
    );

    let mut entries = Vec::with_capacity(count);
    let mut cursor = LEADER_LEN;
    for _ in 0..count {
        let tag_end = cursor + sizes.tag_size;
        let length_end = tag_end + sizes.length_size;
        let position_end = length_end + sizes.position_size;

        let tag = codec::ascii_str(&record[cursor..tag_end]);
        let length = codec::ascii_uint(&record[tag_end..length_end], tag_end)?;
        let position = codec::ascii_uint(&record[length_end..position_end], length_end)?;

        trace!("Directory entry {:?}: length {}, position {}", tag, length, position);
        entries.push(DirectoryEntry {
            tag,
            length,
            position,
        });
        cursor = position_end;
    }

    let terminator = record[cursor];
    if terminator != FIELD_TERMINATOR {
        return Err(Iso8211Error::UnexpectedTerminator {
            offset: cursor,
            expected: FIELD_TERMINATOR,
            found: terminator,
        });
    }

    Ok(entries)
}

/// Slice one field's data area out of the record buffer.
///
/// `position` is relative to the leader's base address; the slice must sit
/// inside the declared record length.
pub fn field_bytes<'a>(
    record: &'a [u8],
    leader: &Leader,
    entry: &DirectoryEntry,
) -> Result<&'a [u8]> {
    let start = leader.base_address + entry.position;
    let end = start + entry.length;
    if end > leader.record_length || end > record.len() {
        return Err(Iso8211Error::TruncatedRecord {
            offset: start,
            needed: entry.length,
            available: record.len().min(leader.record_length).saturating_sub(start),
        });
    }
    Ok(&record[start..end])
}
