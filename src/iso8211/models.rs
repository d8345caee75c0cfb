//! Data structures representing ISO/IEC 8211 record components

use std::collections::HashMap;

use super::error::{Iso8211Error, Result};

/// Separator ending every field's data area (ISO/IEC 8211 FT, 0x1E).
pub const FIELD_TERMINATOR: u8 = 0x1E;
/// Separator between sub-records inside a field's data area (ISO/IEC 8211 UT, 0x1F).
pub const UNIT_TERMINATOR: u8 = 0x1F;

/// Tag of the field control field carrying the parent/child tag pairs.
pub const FIELD_CONTROL_TAG: &str = "0000";

/// Widths (in bytes) of the slices making up one directory entry,
/// declared by the last four digits of the leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySizes {
    pub length_size: usize,
    pub position_size: usize,
    pub reserved_size: usize,
    pub tag_size: usize,
}

impl EntrySizes {
    /// Total width of one directory entry: tag + length + position.
    ///
    /// The reserved digit is carried in the leader but occupies no bytes
    /// in the directory itself.
    pub fn entry_size(&self) -> usize {
        self.tag_size + self.length_size + self.position_size
    }
}

/// Which kind of record a leader introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderIdentifier {
    /// `'L'` — Data Descriptive Record (the embedded schema).
    DataDescriptive,
    /// `'D'` — Data Record (decoded against a previously-read DDR).
    Data,
}

impl TryFrom<u8> for LeaderIdentifier {
    type Error = Iso8211Error;
    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            b'L' => Ok(Self::DataDescriptive),
            b'D' => Ok(Self::Data),
            other => Err(Iso8211Error::MalformedRecord {
                offset: 6,
                detail: format!("unknown leader identifier {:?}", other as char),
            }),
        }
    }
}

/// Parsed 24-byte record leader.
///
/// Numeric attributes are ASCII digit groups in the file (blank-padded in
/// data records); single-byte indicators are carried through as raw bytes.
#[derive(Debug, Clone)]
pub struct Leader {
    pub record_length: usize,
    pub interchange_level: u8,
    pub identifier: LeaderIdentifier,
    pub extension_indicator: u8,
    pub version: u8,
    pub application_indicator: u8,
    /// Length of the field controls in each field description (leader bytes 10-11).
    pub field_control_length: usize,
    /// Byte offset where the field data area begins.
    pub base_address: usize,
    /// Extended character set indicator, carried through uninterpreted.
    pub charset_indicator: [u8; 3],
    pub entry_sizes: EntrySizes,
}

impl Leader {
    /// Number of directory entries implied by the base address.
    pub fn directory_count(&self) -> usize {
        let entry_size = self.entry_sizes.entry_size();
        if entry_size == 0 || self.base_address < 24 {
            return 0;
        }
        (self.base_address - 24) / entry_size
    }
}

/// One `(tag, length, position)` triple from the directory.
///
/// `position` is relative to the leader's base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub tag: String,
    pub length: usize,
    pub position: usize,
}

/// Data structure code of a field (first byte of its control sub-record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDataStructure {
    Elementary,
    Vector,
    Array,
    Concatenated,
}

impl TryFrom<u8> for FieldDataStructure {
    type Error = Iso8211Error;
    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            b'0' => Ok(Self::Elementary),
            b'1' => Ok(Self::Vector),
            b'2' => Ok(Self::Array),
            b'3' => Ok(Self::Concatenated),
            other => Err(Iso8211Error::MalformedRecord {
                offset: 0,
                detail: format!("unknown data structure code {:?}", other as char),
            }),
        }
    }
}

/// Subfield value type, as declared by the format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDataType {
    Text,
    Integer,
    RealFixed,
    RealFloat,
    Logical,
    IntegerUnsigned,
    IntegerSigned,
    Real,
    Binary,
}

impl FieldDataType {
    /// Canonical format-string code for this type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Text => "A",
            Self::Integer => "I",
            Self::RealFixed => "R",
            Self::RealFloat => "S",
            Self::Logical => "C",
            Self::IntegerUnsigned => "B1",
            Self::IntegerSigned => "B2",
            Self::Real => "B4",
            Self::Binary => "B",
        }
    }
}

/// One atomic typed value slot inside a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubFieldDescription {
    /// Label from the field's array descriptor, when one was declared.
    pub tag: Option<String>,
    pub kind: FieldDataType,
    /// Fixed byte length; `None` means delimiter-bounded.
    pub length: Option<usize>,
    pub mandatory: bool,
}

/// Decoded control sub-record and subfield layout of one DDR field.
#[derive(Debug, Clone)]
pub struct FieldDescription {
    pub structure: FieldDataStructure,
    /// Data type code byte, carried through uninterpreted.
    pub type_code: u8,
    /// Lexical level escape bytes, carried through uninterpreted.
    pub lexical_level: [u8; 3],
    pub name: String,
    pub subfields: Vec<SubFieldDescription>,
}

/// One schema node of the DDR: its tag, description, and child links.
///
/// Fields live in the record's arena; children are arena indices rather
/// than owning references, so the field list stays the sole owner.
#[derive(Debug, Clone)]
pub struct Field {
    pub tag: String,
    pub description: Option<FieldDescription>,
    pub children: Vec<usize>,
}

impl Field {
    pub(crate) fn bare(tag: String) -> Self {
        Self {
            tag,
            description: None,
            children: Vec::new(),
        }
    }
}

/// The embedded schema record: leader plus the ordered field arena.
#[derive(Debug, Clone)]
pub struct DataDescriptiveRecord {
    pub leader: Leader,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl DataDescriptiveRecord {
    pub(crate) fn new(leader: Leader, fields: Vec<Field>) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.tag.clone(), i))
            .collect();
        Self {
            leader,
            fields,
            index,
        }
    }

    /// All fields in directory order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by its directory tag.
    pub fn field(&self, tag: &str) -> Option<&Field> {
        self.index.get(tag).map(|&i| &self.fields[i])
    }

    /// Arena index of a field tag.
    pub fn field_index(&self, tag: &str) -> Option<usize> {
        self.index.get(tag).copied()
    }

    /// The unique root of the field hierarchy.
    ///
    /// Recomputed from the child links on each call; validated once at
    /// decode time, so a successfully decoded DDR always has one.
    pub fn root(&self) -> Result<&Field> {
        let root = super::hierarchy::resolve_root(&self.fields)?;
        Ok(&self.fields[root])
    }
}

/// Raw payload of one field inside a data record.
#[derive(Debug, Clone)]
pub struct DataField {
    pub tag: String,
    pub bytes: Vec<u8>,
}

/// A data-bearing record sliced against its own leader and directory.
///
/// Transient: constructed per read, discarded after consumption. Subfield
/// values are extracted lazily against the matching DDR description.
#[derive(Debug, Clone)]
pub struct DataRecord {
    pub leader: Leader,
    pub fields: Vec<DataField>,
}

impl DataRecord {
    /// Raw bytes of a field by tag, if the record carries it.
    pub fn field(&self, tag: &str) -> Option<&DataField> {
        self.fields.iter().find(|f| f.tag == tag)
    }
}

/// One decoded subfield scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum SubfieldValue {
    Text(String),
    Integer(i64),
    Unsigned(u64),
    Real(f64),
    Logical(u8),
    Bytes(Vec<u8>),
}
