//! Field hierarchy reconstruction from the field control field
//!
//! The field tagged `"0000"` stores the DDR's nesting as a flat run of
//! `(parent_tag, child_tag)` pairs: control sub-record, unit terminator,
//! pairs, field terminator. Threading the pairs through the field arena
//! yields a tree whose unique root is the record's top-level field.

use std::collections::HashMap;

use log::{debug, info, trace};

use super::description;
use super::error::{Iso8211Error, Result};
use super::models::{
    DirectoryEntry, Field, FieldDescription, Leader, FIELD_CONTROL_TAG, FIELD_TERMINATOR,
    UNIT_TERMINATOR,
};

/// Decode the field control field and link parent/child edges in the arena.
pub fn link_fields(
    record: &[u8],
    leader: &Leader,
    control_entry: &DirectoryEntry,
    fields: &mut [Field],
) -> Result<()> {
    let tag_size = leader.entry_sizes.tag_size;
    let offset = leader.base_address + control_entry.position;
    let end = offset + control_entry.length;
    if end > record.len() || end > leader.record_length {
        return Err(Iso8211Error::TruncatedRecord {
            offset,
            needed: control_entry.length,
            available: record.len().min(leader.record_length).saturating_sub(offset),
        });
    }

    // Control sub-record (9) + unit terminator + field terminator = 11
    // bytes of framing; everything between is tag pairs.
    if control_entry.length < 11 {
        return Err(Iso8211Error::MalformedRecord {
            offset,
            detail: format!(
                "field control field of {} bytes cannot hold its framing",
                control_entry.length
            ),
        });
    }

    let control = description::parse_control(record, offset)?;
    let mut cursor = offset + description::CONTROL_LEN;

    let separator = record[cursor];
    if separator != UNIT_TERMINATOR {
        return Err(Iso8211Error::UnexpectedTerminator {
            offset: cursor,
            expected: UNIT_TERMINATOR,
            found: separator,
        });
    }
    cursor += 1;

    let pair_count = (control_entry.length - 11) / (2 * tag_size);
    debug!("Field control field: {} parent/child pairs", pair_count);

    let index: HashMap<&str, usize> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.tag.as_str(), i))
        .collect();

    let mut edges = Vec::with_capacity(pair_count);
    for _ in 0..pair_count {
        let parent = read_tag(record, cursor, tag_size, &index)?;
        let child = read_tag(record, cursor + tag_size, tag_size, &index)?;
        trace!(
            "Hierarchy pair: {:?} -> {:?}",
            fields[parent].tag,
            fields[child].tag
        );
        edges.push((parent, child));
        cursor += 2 * tag_size;
    }

    let terminator = record[cursor];
    if terminator != FIELD_TERMINATOR {
        return Err(Iso8211Error::UnexpectedTerminator {
            offset: cursor,
            expected: FIELD_TERMINATOR,
            found: terminator,
        });
    }

    for (parent, child) in edges {
        fields[parent].children.push(child);
    }

    // The field control field's own description is just its control
    // sub-record; it declares no subfields of its own.
    if let Some(control_field) = fields.iter_mut().find(|f| f.tag == FIELD_CONTROL_TAG) {
        control_field.description = Some(FieldDescription {
            structure: control.structure,
            type_code: control.type_code,
            lexical_level: control.lexical_level,
            name: String::new(),
            subfields: Vec::new(),
        });
    }

    let root = resolve_root(fields)?;
    info!("Field hierarchy root: {:?}", fields[root].tag);
    Ok(())
}

fn read_tag(
    record: &[u8],
    offset: usize,
    tag_size: usize,
    index: &HashMap<&str, usize>,
) -> Result<usize> {
    let bytes = &record[offset..offset + tag_size];
    let tag = String::from_utf8_lossy(bytes);
    index
        .get(tag.as_ref())
        .copied()
        .ok_or_else(|| Iso8211Error::MalformedRecord {
            offset,
            detail: format!("hierarchy pair references unknown field tag {:?}", tag),
        })
}

/// Find the unique root of the field tree.
///
/// Edges whose parent is the field control field itself only anchor the
/// tree; they do not make their target an interior node. Zero or several
/// candidates mean the mapping holds disjoint trees or a cycle.
pub fn resolve_root(fields: &[Field]) -> Result<usize> {
    let mut incoming = vec![false; fields.len()];
    for field in fields {
        if field.tag == FIELD_CONTROL_TAG {
            continue;
        }
        for &child in &field.children {
            incoming[child] = true;
        }
    }

    let mut candidates = fields
        .iter()
        .enumerate()
        .filter(|(i, f)| f.tag != FIELD_CONTROL_TAG && !incoming[*i])
        .map(|(i, _)| i);

    match (candidates.next(), candidates.next()) {
        (Some(root), None) => Ok(root),
        (first, _) => {
            let total = fields
                .iter()
                .enumerate()
                .filter(|(i, f)| f.tag != FIELD_CONTROL_TAG && !incoming[*i])
                .count();
            debug!(
                "Root resolution failed: {} candidates, first {:?}",
                total,
                first.map(|i| &fields[i].tag)
            );
            Err(Iso8211Error::AmbiguousRoot { candidates: total })
        }
    }
}
