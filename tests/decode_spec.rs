use std::io::Cursor;

use iso8211_reader::iso8211::{codec, data_record, decode_ddr, format};
use iso8211_reader::{FieldDataType, Iso8211Error, Iso8211Reader, SubfieldValue};

const FT: u8 = 0x1E;
const UT: u8 = 0x1F;

/// Directory entry widths used by every synthetic record below:
/// tag 4, length 3, position 3 (leader digits "3304").
const ENTRY_SIZE: usize = 10;

/// Body of a field control field: control sub-record, unit terminator,
/// parent/child tag pairs, field terminator.
fn control_body(pairs: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"00");
    body.extend_from_slice(b"00;&");
    body.extend_from_slice(b"   ");
    body.push(UT);
    for (parent, child) in pairs {
        body.extend_from_slice(parent.as_bytes());
        body.extend_from_slice(child.as_bytes());
    }
    body.push(FT);
    body
}

/// Body of a regular DDR field description.
fn description_body(name: &str, labels: &str, format: &str) -> Vec<u8> {
    let mut body = vec![b'1', b'6'];
    body.extend_from_slice(b"00;&");
    body.extend_from_slice(b"   ");
    body.extend_from_slice(name.as_bytes());
    body.push(UT);
    body.extend_from_slice(labels.as_bytes());
    body.push(UT);
    body.extend_from_slice(format.as_bytes());
    body.push(FT);
    body
}

/// Assemble a full record: leader, directory, field area.
fn build_record(identifier: u8, fields: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let base = 24 + fields.len() * ENTRY_SIZE + 1;
    let mut directory = Vec::new();
    let mut area = Vec::new();
    for (tag, body) in fields {
        assert_eq!(tag.len(), 4, "test tags are 4 characters");
        directory.extend_from_slice(tag.as_bytes());
        directory.extend_from_slice(format!("{:03}", body.len()).as_bytes());
        directory.extend_from_slice(format!("{:03}", area.len()).as_bytes());
        area.extend_from_slice(body);
    }
    directory.push(FT);

    let record_length = base + area.len();
    let mut record = Vec::with_capacity(record_length);
    record.extend_from_slice(format!("{:05}", record_length).as_bytes());
    record.push(b'3');
    record.push(identifier);
    record.push(b'E');
    record.push(b'1');
    record.push(b' ');
    record.extend_from_slice(b"09");
    record.extend_from_slice(format!("{:05}", base).as_bytes());
    record.extend_from_slice(b" ! ");
    record.extend_from_slice(b"3304");
    record.extend_from_slice(&directory);
    record.extend_from_slice(&area);
    assert_eq!(record.len(), record_length);
    record
}

/// Minimal two-field DDR: a field control field linking
/// "AAAA" as root, and "AAAA" declaring a text and an integer subfield.
fn two_field_ddr() -> Vec<u8> {
    build_record(
        b'L',
        &[
            ("0000", control_body(&[("0000", "AAAA")])),
            ("AAAA", description_body("Feature", "NAM!VAL", "(A(3),I(2))")),
        ],
    )
}

#[test]
fn codec_decodes_little_endian_exactly() {
    assert_eq!(codec::read_float(&[0x00, 0x00, 0x80, 0x3F], 0, 4).unwrap(), 1.0);
    assert_eq!(codec::read_unsigned(&[0xFF, 0xFF], 0, 2).unwrap(), 65535);
    assert_eq!(codec::read_signed(&[0xFF, 0xFF], 0, 2).unwrap(), -1);
    assert_eq!(codec::read_signed(&[0x00, 0x80], 0, 2).unwrap(), -32768);
    assert_eq!(codec::read_unsigned(&[0x2A], 0, 1).unwrap(), 42);
    assert_eq!(
        codec::read_float(&[0, 0, 0, 0, 0, 0, 0xF0, 0x3F], 0, 8).unwrap(),
        1.0
    );
}

#[test]
fn codec_rejects_bad_widths_and_missing_delimiters() {
    assert!(matches!(
        codec::read_unsigned(&[0, 0, 0], 0, 3),
        Err(Iso8211Error::MalformedRecord { .. })
    ));
    assert!(matches!(
        codec::read_float(&[0, 0], 0, 2),
        Err(Iso8211Error::MalformedRecord { .. })
    ));
    assert!(matches!(
        codec::read_unsigned(&[0xFF], 0, 2),
        Err(Iso8211Error::TruncatedRecord { .. })
    ));
    assert!(matches!(
        codec::read_until(b"no terminator here", 0, UT),
        Err(Iso8211Error::MalformedRecord { .. })
    ));
    assert_eq!(codec::read_until(b"abc\x1fdef", 0, UT).unwrap(), b"abc");
}

#[test]
fn codec_parses_blank_padded_ascii_numbers() {
    assert_eq!(codec::ascii_uint(b"00042", 0).unwrap(), 42);
    assert_eq!(codec::ascii_uint(b"   7", 0).unwrap(), 7);
    assert_eq!(codec::ascii_uint(b"    ", 0).unwrap(), 0);
    assert!(codec::ascii_uint(b"12x4", 0).is_err());
    assert_eq!(codec::ascii_int(b" -15 ", 0).unwrap(), -15);
    assert_eq!(codec::ascii_real(b"2.5", 0).unwrap(), 2.5);
}

#[test]
fn format_grammar_expands_repetition() {
    let subfields = format::parse_format("(3A(5))").unwrap();
    assert_eq!(subfields.len(), 3);
    for subfield in &subfields {
        assert_eq!(subfield.kind, FieldDataType::Text);
        assert_eq!(subfield.length, Some(5));
        assert!(subfield.mandatory);
    }
}

#[test]
fn format_grammar_prefers_two_character_binary_codes() {
    // "B12" must resolve through the two-character code family, never the
    // bare bitfield fallback, and the parenthesized length wins over the
    // width digit.
    let subfields = format::parse_format("(B12(4))").unwrap();
    assert_eq!(subfields.len(), 1);
    assert_ne!(subfields[0].kind, FieldDataType::Binary);
    assert_eq!(subfields[0].kind, FieldDataType::IntegerUnsigned);
    assert_eq!(subfields[0].length, Some(4));

    let signed = format::parse_format("(B24)").unwrap();
    assert_eq!(signed[0].kind, FieldDataType::IntegerSigned);
    assert_eq!(signed[0].length, Some(4));
}

#[test]
fn format_grammar_handles_mixed_tokens() {
    let subfields = format::parse_format("(A,3I(2),B11)").unwrap();
    assert_eq!(subfields.len(), 5);
    assert_eq!(subfields[0].kind, FieldDataType::Text);
    assert_eq!(subfields[0].length, None);
    for subfield in &subfields[1..4] {
        assert_eq!(subfield.kind, FieldDataType::Integer);
        assert_eq!(subfield.length, Some(2));
    }
    assert_eq!(subfields[4].kind, FieldDataType::IntegerUnsigned);
    assert_eq!(subfields[4].length, Some(1));
}

#[test]
fn format_grammar_rejects_malformed_input() {
    for bad in ["A(3)", "(A(3)", "(Q)", "()", "(A,,I)", "(A(x))", "(0A)", "(A(3)junk)"] {
        assert!(
            matches!(
                format::parse_format(bad),
                Err(Iso8211Error::MalformedTypeGrammar { .. })
            ),
            "expected grammar error for {:?}",
            bad
        );
    }
}

#[test]
fn directory_consumes_exactly_the_declared_bytes() {
    let record = two_field_ddr();
    let ddr = decode_ddr(&record).unwrap();

    // 24-byte leader + n entries + one terminator before the field area.
    assert_eq!(ddr.leader.base_address, 24 + 2 * ENTRY_SIZE + 1);
    assert_eq!(ddr.leader.directory_count(), 2);
    assert_eq!(ddr.leader.entry_sizes.tag_size, 4);
    assert_eq!(ddr.leader.entry_sizes.length_size, 3);
    assert_eq!(ddr.leader.entry_sizes.position_size, 3);
    assert_eq!(ddr.fields().len(), 2);
    assert!(ddr.field("0000").is_some());
    assert!(ddr.field("AAAA").is_some());
}

#[test]
fn truncated_directory_is_rejected_not_silently_shortened() {
    let record = two_field_ddr();
    // One byte short of the second directory entry's boundary.
    let cut = 24 + 2 * ENTRY_SIZE - 1;
    assert!(matches!(
        decode_ddr(&record[..cut]),
        Err(Iso8211Error::TruncatedDirectory { .. })
    ));
    // Boundary intact but terminator missing.
    assert!(matches!(
        decode_ddr(&record[..24 + 2 * ENTRY_SIZE]),
        Err(Iso8211Error::TruncatedDirectory { .. })
    ));
}

#[test]
fn wrong_directory_terminator_is_rejected() {
    let mut record = two_field_ddr();
    record[24 + 2 * ENTRY_SIZE] = b'X';
    assert!(matches!(
        decode_ddr(&record),
        Err(Iso8211Error::UnexpectedTerminator { expected: FT, .. })
    ));
}

#[test]
fn corrupted_control_literal_is_rejected() {
    let mut record = two_field_ddr();
    let base = 24 + 2 * ENTRY_SIZE + 1;
    // The sentinel of the "AAAA" description sits after the 19-byte
    // control field, 2 bytes into its own body.
    let sentinel = base + 19 + 2;
    assert_eq!(&record[sentinel..sentinel + 4], b"00;&");
    record[sentinel] = b'X';
    assert!(matches!(
        decode_ddr(&record),
        Err(Iso8211Error::UnexpectedControlLiteral { .. })
    ));
}

#[test]
fn end_to_end_ddr_resolves_root_and_subfields() {
    let ddr = decode_ddr(&two_field_ddr()).unwrap();

    let root = ddr.root().unwrap();
    assert_eq!(root.tag, "AAAA");

    let description = root.description.as_ref().unwrap();
    assert_eq!(description.name, "Feature");
    assert_eq!(description.subfields.len(), 2);
    assert_eq!(description.subfields[0].tag.as_deref(), Some("NAM"));
    assert_eq!(description.subfields[0].kind, FieldDataType::Text);
    assert_eq!(description.subfields[0].length, Some(3));
    assert_eq!(description.subfields[1].tag.as_deref(), Some("VAL"));
    assert_eq!(description.subfields[1].kind, FieldDataType::Integer);
    assert_eq!(description.subfields[1].length, Some(2));
}

#[test]
fn nested_hierarchy_threads_children() {
    let record = build_record(
        b'L',
        &[
            (
                "0000",
                control_body(&[("0000", "AAAA"), ("AAAA", "BBBB"), ("AAAA", "CCCC")]),
            ),
            ("AAAA", description_body("Top", "", "(A)")),
            ("BBBB", description_body("Left", "", "(I(4))")),
            ("CCCC", description_body("Right", "", "(R(8))")),
        ],
    );
    let ddr = decode_ddr(&record).unwrap();

    let root = ddr.root().unwrap();
    assert_eq!(root.tag, "AAAA");
    let child_tags: Vec<&str> = root
        .children
        .iter()
        .map(|&i| ddr.fields()[i].tag.as_str())
        .collect();
    assert_eq!(child_tags, ["BBBB", "CCCC"]);
}

#[test]
fn disjoint_trees_are_ambiguous() {
    let record = build_record(
        b'L',
        &[
            ("0000", control_body(&[("AAAA", "BBBB")])),
            ("AAAA", description_body("One", "", "(A)")),
            ("BBBB", description_body("Two", "", "(A)")),
            ("CCCC", description_body("Stray", "", "(A)")),
        ],
    );
    assert!(matches!(
        decode_ddr(&record),
        Err(Iso8211Error::AmbiguousRoot { candidates: 2 })
    ));
}

#[test]
fn cyclic_hierarchy_is_ambiguous() {
    let record = build_record(
        b'L',
        &[
            ("0000", control_body(&[("AAAA", "BBBB"), ("BBBB", "AAAA")])),
            ("AAAA", description_body("One", "", "(A)")),
            ("BBBB", description_body("Two", "", "(A)")),
        ],
    );
    assert!(matches!(
        decode_ddr(&record),
        Err(Iso8211Error::AmbiguousRoot { candidates: 0 })
    ));
}

#[test]
fn hierarchy_pair_with_unknown_tag_is_rejected() {
    let record = build_record(
        b'L',
        &[
            ("0000", control_body(&[("AAAA", "ZZZZ")])),
            ("AAAA", description_body("One", "", "(A)")),
        ],
    );
    assert!(matches!(
        decode_ddr(&record),
        Err(Iso8211Error::MalformedRecord { .. })
    ));
}

#[test]
fn reader_caches_the_ddr_and_pulls_data_records() {
    let mut stream = two_field_ddr();
    let mut payload = b"abc01".to_vec();
    payload.push(FT);
    stream.extend_from_slice(&build_record(b'D', &[("AAAA", payload)]));

    let mut reader = Iso8211Reader::new(Cursor::new(stream));
    assert_eq!(reader.ddr().unwrap().root().unwrap().tag, "AAAA");
    // Second call must come from the cache, leaving the stream at the
    // data-record boundary.
    let ddr = reader.ddr().unwrap().clone();

    let record = reader.next_record().unwrap().expect("one data record");
    assert_eq!(record.fields.len(), 1);
    let rows = record.decode_field(&ddr, "AAAA").unwrap();
    assert_eq!(
        rows,
        vec![vec![
            SubfieldValue::Text("abc".to_string()),
            SubfieldValue::Integer(1),
        ]]
    );

    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn reader_reports_truncation_inside_a_record() {
    let ddr_bytes = two_field_ddr();
    let mut stream = ddr_bytes.clone();
    stream.truncate(ddr_bytes.len() - 5);

    let mut reader = Iso8211Reader::new(Cursor::new(stream));
    assert!(matches!(
        reader.ddr(),
        Err(Iso8211Error::TruncatedRecord { .. })
    ));
    // A failed decode must not leave a partial DDR in the cache.
    assert!(reader.ddr().is_err());
}

#[test]
fn set_input_discards_cached_state() {
    let mut reader = Iso8211Reader::new(Cursor::new(two_field_ddr()));
    assert!(reader.ddr().is_ok());

    let record = build_record(
        b'L',
        &[
            ("0000", control_body(&[("0000", "BBBB")])),
            ("BBBB", description_body("Other", "", "(I(4))")),
        ],
    );
    reader.set_input(Cursor::new(record));
    assert_eq!(reader.ddr().unwrap().root().unwrap().tag, "BBBB");
}

#[test]
fn repeating_subfield_rows_decode_until_the_terminator() {
    let ddr = decode_ddr(&build_record(
        b'L',
        &[
            ("0000", control_body(&[("0000", "AAAA")])),
            ("AAAA", description_body("Pairs", "", "(A,B11)")),
        ],
    ))
    .unwrap();

    let mut payload = Vec::new();
    payload.extend_from_slice(b"hi");
    payload.push(UT);
    payload.push(0x05);
    payload.extend_from_slice(b"yo");
    payload.push(UT);
    payload.push(0x07);
    payload.push(FT);
    let record = build_record(b'D', &[("AAAA", payload)]);

    let data = data_record::parse_data_record(&record).unwrap();
    let rows = data.decode_field(&ddr, "AAAA").unwrap();
    assert_eq!(
        rows,
        vec![
            vec![SubfieldValue::Text("hi".to_string()), SubfieldValue::Unsigned(5)],
            vec![SubfieldValue::Text("yo".to_string()), SubfieldValue::Unsigned(7)],
        ]
    );
}

#[test]
fn binary_subfields_decode_little_endian() {
    let ddr = decode_ddr(&build_record(
        b'L',
        &[
            ("0000", control_body(&[("0000", "AAAA")])),
            ("AAAA", description_body("Bin", "", "(B12,B24,B44)")),
        ],
    ))
    .unwrap();

    let mut payload = Vec::new();
    payload.extend_from_slice(&[0xFF, 0xFF]); // u16 65535
    payload.extend_from_slice(&[0xFE, 0xFF, 0xFF, 0xFF]); // i32 -2
    payload.extend_from_slice(&[0x00, 0x00, 0x80, 0x3F]); // f32 1.0
    payload.push(FT);
    let record = build_record(b'D', &[("AAAA", payload)]);

    let data = data_record::parse_data_record(&record).unwrap();
    let rows = data.decode_field(&ddr, "AAAA").unwrap();
    assert_eq!(
        rows,
        vec![vec![
            SubfieldValue::Unsigned(65535),
            SubfieldValue::Integer(-2),
            SubfieldValue::Real(1.0),
        ]]
    );
}

#[test]
fn grammar_errors_carry_the_format_string_record_offset() {
    let name = "Feature";
    let record = build_record(
        b'L',
        &[
            ("0000", control_body(&[("0000", "AAAA")])),
            ("AAAA", description_body(name, "", "(Q)")),
        ],
    );

    // Control sub-record (9), name + unit terminator, empty labels +
    // unit terminator, then the format string.
    let base = 24 + 2 * ENTRY_SIZE + 1;
    let format_offset = base + 19 + 9 + name.len() + 1 + 1;
    match decode_ddr(&record) {
        Err(Iso8211Error::MalformedTypeGrammar { offset, .. }) => {
            assert_eq!(offset, format_offset);
        }
        other => panic!("expected a grammar error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn logical_subfields_take_one_byte_and_skip_declared_padding() {
    let ddr = decode_ddr(&build_record(
        b'L',
        &[
            ("0000", control_body(&[("0000", "AAAA")])),
            ("AAAA", description_body("Flags", "", "(C(2),B11)")),
        ],
    ))
    .unwrap();

    let mut payload = Vec::new();
    payload.extend_from_slice(b"Y ");
    payload.push(0x03);
    payload.push(FT);
    let record = build_record(b'D', &[("AAAA", payload)]);

    let data = data_record::parse_data_record(&record).unwrap();
    let rows = data.decode_field(&ddr, "AAAA").unwrap();
    assert_eq!(
        rows,
        vec![vec![
            SubfieldValue::Logical(b'Y'),
            SubfieldValue::Unsigned(3),
        ]]
    );
}

#[test]
fn data_record_with_wrong_identifier_is_rejected() {
    let record = two_field_ddr();
    assert!(matches!(
        data_record::parse_data_record(&record),
        Err(Iso8211Error::MalformedRecord { .. })
    ));
}
