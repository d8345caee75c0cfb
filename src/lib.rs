//! # iso8211-reader
//!
//! A decoder for the ISO/IEC 8211 generic binary interchange format, the
//! self-describing tagged-record layout used by geospatial interchange
//! standards such as nautical-chart exchange sets.
//!
//! The first record of a file is the Data Descriptive Record (DDR), an
//! embedded schema declaring every field's tag, subfield type grammar, and
//! parent/child nesting. Subsequent Data Records are sliced and typed
//! against that schema. This crate decodes both; mapping decoded fields
//! into domain objects is the caller's business.
pub mod iso8211;

// Re-export the main types for convenience
pub use iso8211::{
    models::{
        DataDescriptiveRecord, DataRecord, DirectoryEntry, Field, FieldDataStructure,
        FieldDataType, FieldDescription, Leader, LeaderIdentifier, SubFieldDescription,
        SubfieldValue,
    },
    Iso8211Error, Iso8211Reader, Result,
};
