#![forbid(unsafe_code)]

use improto_core::{DescriptorError, FieldType};
use improto_descriptor::{decode_fields, decode_oneofs, encode_fields, encode_oneofs, Modifiers, RawField};

fn round_trip(fields: &[RawField]) -> Vec<RawField> {
    let encoded = encode_fields(fields).expect("encode");
    decode_fields(&encoded).expect("decode")
}

#[test]
fn every_field_type_singular_and_repeated() {
    let mut fields = Vec::new();
    let mut n = 1;
    for ty in FieldType::ALL {
        fields.push(RawField::new(n, ty));
        fields.push(RawField::new(n + 1, ty).repeated());
        n += 2;
    }
    assert_eq!(round_trip(&fields), fields);
}

#[test]
fn skips_of_varied_width() {
    for k in [2u32, 31, 32, 1_000_000] {
        let fields = [RawField::new(1, FieldType::Int32), RawField::new(1 + k, FieldType::String)];
        let decoded = round_trip(&fields);
        assert_eq!(decoded[1].number, 1 + k, "skip {k}");
        assert_eq!(decoded[1].field_type, FieldType::String);
    }
}

#[test]
fn largest_field_number() {
    let fields = [RawField::new(improto_core::MAX_FIELD_NUMBER, FieldType::Bool)];
    assert_eq!(round_trip(&fields), fields);
}

#[test]
fn modifier_bits_alone_and_combined() {
    let sets = [
        Modifiers::UNPACKED,
        Modifiers::EXTENSION,
        Modifiers::INT64_AS_STRING,
        Modifiers::UNPACKED | Modifiers::INT64_AS_STRING,
        Modifiers::UNPACKED | Modifiers::EXTENSION | Modifiers::INT64_AS_STRING,
    ];
    for m in sets {
        let fields = [RawField::new(3, FieldType::Int64).repeated().with_modifiers(m)];
        let decoded = round_trip(&fields);
        assert_eq!(decoded[0].modifiers, m);
        assert_eq!(decoded[0].unpacked(), m.contains(Modifiers::UNPACKED));
        assert_eq!(decoded[0].extension(), m.contains(Modifiers::EXTENSION));
        assert_eq!(decoded[0].int64_as_string(), m.contains(Modifiers::INT64_AS_STRING));
    }
}

#[test]
fn map_fields_keep_their_marker() {
    let fields = [RawField::new(2, FieldType::Message).map(), RawField::new(3, FieldType::Message).repeated()];
    let decoded = round_trip(&fields);
    assert!(decoded[0].map);
    assert!(!decoded[1].map && decoded[1].repeated);
}

#[test]
fn oneof_groups_round_trip() {
    let groups = vec![vec![1u32, 2], vec![7, 4096, 100_000]];
    let decoded = decode_oneofs(&encode_oneofs(&groups).unwrap()).unwrap();
    let back: Vec<Vec<u32>> = decoded.iter().map(|g| g.to_vec()).collect();
    assert_eq!(back, groups);
}

#[test]
fn malformed_inputs_fail_cleanly() {
    let cases: &[&str] = &["^", "(", "(M", "a", "(^\"^", "(^^", "`^"];
    for case in cases {
        assert!(decode_fields(case).is_err(), "{case:?} should be rejected");
    }
    assert!(matches!(decode_fields("(\\"), Err(DescriptorError::InvalidCharacter { offset: 1, ch: '\\' })));
    assert!(matches!(decode_oneofs("!\u{e9}"), Err(DescriptorError::InvalidCharacter { offset: 1, .. })));
}
