//! Core ISO/IEC 8211 reader module

pub mod codec;
pub mod data_record;
pub mod description;
pub mod directory;
pub mod error;
pub mod format;
pub mod hierarchy;
pub mod models;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, info};

pub use error::{Iso8211Error, Result};
use models::{
    DataDescriptiveRecord, DataRecord, Field, LeaderIdentifier, FIELD_CONTROL_TAG,
};

/// The main reader for ISO/IEC 8211 interchange files.
///
/// Decodes the Data Descriptive Record once and caches it, then pulls data
/// records sequentially. One instance drives one stream from one thread;
/// independent readers share no state. A caller that wants to keep
/// ownership of its stream can pass `&mut R` (any `Read` works); an owned
/// source, such as the `File` opened by [`Iso8211Reader::open`], is
/// released when the reader is dropped, whatever the decode outcome.
pub struct Iso8211Reader<R: Read> {
    source: R,
    ddr: Option<DataDescriptiveRecord>,
}

impl Iso8211Reader<File> {
    /// Open a file and own the handle for the reader's lifetime.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening ISO 8211 file: {}", path.display());
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> Iso8211Reader<R> {
    /// Wrap an already-open byte source.
    pub fn new(source: R) -> Self {
        Self { source, ddr: None }
    }

    /// Replace the input source, discarding all cached state.
    ///
    /// Must precede the first read after a source change.
    pub fn set_input(&mut self, source: R) {
        self.source = source;
        self.ddr = None;
    }

    /// Release the reader and hand back its source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Decode (once) and return the Data Descriptive Record.
    ///
    /// Idempotent: the first call reads leader, directory, hierarchy, and
    /// field descriptions; later calls return the cache without touching
    /// the source. A failed decode caches nothing, so no partially-built
    /// DDR is ever exposed.
    pub fn ddr(&mut self) -> Result<&DataDescriptiveRecord> {
        let ddr = match self.ddr.take() {
            Some(cached) => cached,
            None => {
                let record =
                    read_record(&mut self.source)?.ok_or(Iso8211Error::TruncatedRecord {
                        offset: 0,
                        needed: directory::LEADER_LEN,
                        available: 0,
                    })?;
                decode_ddr(&record)?
            }
        };
        Ok(self.ddr.insert(ddr))
    }

    /// Decode the next data record, or `None` at a clean end of input.
    ///
    /// Decodes the DDR first if it has not been read yet, so the stream
    /// position is always at a record boundary.
    pub fn next_record(&mut self) -> Result<Option<DataRecord>> {
        if self.ddr.is_none() {
            self.ddr()?;
        }
        match read_record(&mut self.source)? {
            Some(record) => Ok(Some(data_record::parse_data_record(&record)?)),
            None => Ok(None),
        }
    }
}

/// Read one full record (leader plus body) from the source.
///
/// Clean end of input at a record boundary yields `None`; end of input
/// inside a record is a truncation error. All reads are bounded by the
/// leader's declared record length.
fn read_record<R: Read>(source: &mut R) -> Result<Option<Vec<u8>>> {
    let mut leader = [0u8; directory::LEADER_LEN];
    let filled = fill(source, &mut leader)?;
    if filled == 0 {
        return Ok(None);
    }
    if filled < leader.len() {
        return Err(Iso8211Error::TruncatedRecord {
            offset: 0,
            needed: leader.len(),
            available: filled,
        });
    }

    let record_length = codec::ascii_uint(&leader[0..5], 0)?;
    if record_length < leader.len() {
        return Err(Iso8211Error::MalformedRecord {
            offset: 0,
            detail: format!("leader declares impossible record length {}", record_length),
        });
    }

    let mut record = vec![0u8; record_length];
    record[..leader.len()].copy_from_slice(&leader);
    let body_len = record_length - leader.len();
    let filled = fill(source, &mut record[leader.len()..])?;
    if filled < body_len {
        return Err(Iso8211Error::TruncatedRecord {
            offset: leader.len(),
            needed: body_len,
            available: filled,
        });
    }
    Ok(Some(record))
}

/// Read until the buffer is full or the source ends; returns bytes read.
fn fill<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Decode a complete DDR buffer: leader, directory, hierarchy, descriptions.
pub fn decode_ddr(record: &[u8]) -> Result<DataDescriptiveRecord> {
    let leader = directory::parse_leader(record)?;
    if leader.identifier != LeaderIdentifier::DataDescriptive {
        return Err(Iso8211Error::MalformedRecord {
            offset: 6,
            detail: format!(
                "expected a data descriptive leader, found {:?}",
                leader.identifier
            ),
        });
    }

    let entries = directory::parse_directory(record, &leader)?;
    let mut fields: Vec<Field> = entries
        .iter()
        .map(|entry| Field::bare(entry.tag.clone()))
        .collect();

    match entries.iter().find(|e| e.tag == FIELD_CONTROL_TAG) {
        Some(control_entry) => {
            hierarchy::link_fields(record, &leader, control_entry, &mut fields)?;
        }
        None => {
            // Degenerate single-field records have no pairs to thread, but
            // the unique-root invariant still holds.
            debug!("DDR has no field control field");
            hierarchy::resolve_root(&fields)?;
        }
    }

    for (entry, field) in entries.iter().zip(fields.iter_mut()) {
        if entry.tag == FIELD_CONTROL_TAG {
            continue;
        }
        let offset = leader.base_address + entry.position;
        field.description = Some(description::parse_description(record, offset, entry.length)?);
    }

    info!("DDR decoded: {} fields", fields.len());
    Ok(DataDescriptiveRecord::new(leader, fields))
}
