//! Custom error types for the iso8211-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Every structural failure carries the byte offset (within the current
/// record buffer, unless noted otherwise) where the inconsistency was found.
/// ISO 8211 offers no safe resynchronization point once a length or offset
/// has been misread, so all of these abort the current record.
#[derive(Debug, Error)]
pub enum Iso8211Error {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// A numeric group, length code, or value that cannot be decoded.
    #[error("Malformed record at offset {offset}: {detail}")]
    MalformedRecord { offset: usize, detail: String },

    /// A subfield format string that does not follow the type grammar.
    ///
    /// `offset` is where the format string sits in the record; the grammar
    /// parser itself reports 0 and the field description decoder rebases it.
    #[error("Malformed type grammar at offset {offset} in {format:?}: {detail}")]
    MalformedTypeGrammar {
        offset: usize,
        format: String,
        detail: String,
    },

    /// The 4-byte field-control sentinel was not found where expected,
    /// indicating corrupted input or a miscomputed cursor upstream.
    #[error("Unexpected control literal at offset {offset}: expected \"00;&\", found {found:?}")]
    UnexpectedControlLiteral { offset: usize, found: [u8; 4] },

    /// A separator byte differs from the one the format requires.
    #[error("Unexpected terminator at offset {offset}: expected {expected:#04x}, found {found:#04x}")]
    UnexpectedTerminator {
        offset: usize,
        expected: u8,
        found: u8,
    },

    /// The directory area holds fewer bytes than the leader promises.
    #[error("Truncated directory at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedDirectory {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The record buffer holds fewer bytes than the leader promises.
    #[error("Truncated record at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedRecord {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The parent/child mapping does not yield exactly one root field.
    ///
    /// A whole-record invariant violation rather than a point corruption,
    /// so this is the one variant that carries no byte offset.
    #[error("Ambiguous field hierarchy: {candidates} root candidates (expected exactly 1)")]
    AmbiguousRoot { candidates: usize },
}

/// A convenience `Result` type alias using the crate's `Iso8211Error` type.
pub type Result<T> = std::result::Result<T, Iso8211Error>;
