//! Decoder for encoded field descriptors.
//!
//! ```text
//! fields := field*
//! field  := skip* type modifier* END
//! type   := SINGULAR | REPEATED | MAP
//! ```
//!
//! Field numbers are implicit: each field takes `previous + 1`, or `previous + k` when preceded
//! by a skip run decoding to `k`.

use improto_core::base92::{field_tokens, Base92Reader, FieldToken};
use improto_core::{DescriptorError, FieldType, RunKind, MAX_FIELD_NUMBER};
use serde::Serialize;
use tracing::warn;

use crate::field::Modifiers;

/// One field as it appears in the token stream, before submessage ids are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawField {
    pub number: u32,
    pub field_type: FieldType,
    pub repeated: bool,
    pub map: bool,
    pub modifiers: Modifiers,
}

impl RawField {
    pub fn unpacked(&self) -> bool { self.modifiers.contains(Modifiers::UNPACKED) }
    pub fn extension(&self) -> bool { self.modifiers.contains(Modifiers::EXTENSION) }
    pub fn int64_as_string(&self) -> bool { self.modifiers.contains(Modifiers::INT64_AS_STRING) }
}

/// Decode a full field descriptor string in stream order.
pub fn decode_fields(encoded: &str) -> Result<Vec<RawField>, DescriptorError> {
    let mut reader = Base92Reader::new(encoded);
    let mut fields = Vec::new();
    let mut previous: u32 = 0;
    while !reader.is_empty() {
        let skip = read_skip(&mut reader)?;
        let number = next_field_number(previous, skip)?;
        let field = read_field(&mut reader, number)?;
        expect_end(&mut reader)?;
        fields.push(field);
        previous = number;
    }
    Ok(fields)
}

/// Decode the descriptor of a single field (extension registry entries). The end marker is
/// optional; skips are not allowed since the number comes from the registry.
pub fn decode_single_field(encoded: &str, number: u32) -> Result<RawField, DescriptorError> {
    check_field_number(number as u64)?;
    let mut reader = Base92Reader::new(encoded);
    let field = read_field(&mut reader, number)?;
    let offset = reader.offset();
    match reader.next_value()? {
        None => {}
        Some(field_tokens::END_OF_FIELD) => {
            if let Some(value) = reader.peek()? {
                return Err(DescriptorError::UnexpectedToken { offset: reader.offset(), value, expected: "end of input" });
            }
        }
        Some(value) => return Err(DescriptorError::UnexpectedToken { offset, value, expected: "end of field descriptor" }),
    }
    Ok(field)
}

/// A skip run decoding to zero advances by one, like no skip at all.
fn next_field_number(previous: u32, skip: Option<u64>) -> Result<u32, DescriptorError> {
    let next = previous as u64 + skip.filter(|k| *k != 0).unwrap_or(1);
    check_field_number(next)?;
    Ok(next as u32)
}

fn check_field_number(number: u64) -> Result<(), DescriptorError> {
    if number == 0 || number > MAX_FIELD_NUMBER as u64 {
        return Err(DescriptorError::FieldNumberOutOfRange { number });
    }
    Ok(())
}

/// Little-token-first run of 5-bit skip payloads. `None` when no skip precedes the field.
fn read_skip(reader: &mut Base92Reader<'_>) -> Result<Option<u64>, DescriptorError> {
    let start = reader.offset();
    let mut amount: u64 = 0;
    let mut tokens = 0usize;
    while let Some(FieldToken::Skip(payload)) = reader.peek()?.and_then(FieldToken::classify) {
        if tokens == field_tokens::MAX_SKIP_TOKENS {
            return Err(DescriptorError::RunTooLong { offset: start, run: RunKind::Skip, max: field_tokens::MAX_SKIP_TOKENS });
        }
        reader.next_value()?;
        amount |= (payload as u64 & field_tokens::SKIP_MASK) << (field_tokens::SKIP_SHIFT * tokens as u32);
        tokens += 1;
    }
    if tokens == 0 {
        return Ok(None);
    }
    if reader.is_empty() {
        return Err(DescriptorError::UnterminatedRun { offset: start, run: RunKind::Skip });
    }
    Ok(Some(amount))
}

fn read_field(reader: &mut Base92Reader<'_>, number: u32) -> Result<RawField, DescriptorError> {
    let offset = reader.offset();
    let value = reader.next_value()?.ok_or(DescriptorError::UnterminatedField { offset })?;
    let (field_type, repeated, map) = match FieldToken::classify(value) {
        Some(FieldToken::Type { ordinal, repeated }) => {
            let ty = FieldType::from_ordinal(ordinal).ok_or(DescriptorError::UnknownFieldType { offset, ordinal })?;
            (ty, repeated, false)
        }
        Some(FieldToken::Map) => (FieldType::Message, true, true),
        Some(FieldToken::End) => return Err(DescriptorError::EndWithoutField { offset }),
        _ => return Err(DescriptorError::UnexpectedToken { offset, value, expected: "field type" }),
    };
    let modifiers = read_modifiers(reader)?;
    if modifiers.reserved() != 0 {
        warn!(field = number, bits = modifiers.reserved(), "descriptor sets reserved modifier bits; ignoring");
    }
    Ok(RawField { number, field_type, repeated, map, modifiers })
}

/// Little-token-first run of 4-bit modifier payloads.
fn read_modifiers(reader: &mut Base92Reader<'_>) -> Result<Modifiers, DescriptorError> {
    let start = reader.offset();
    let mut bits: u32 = 0;
    let mut tokens = 0usize;
    while let Some(FieldToken::Modifier(payload)) = reader.peek()?.and_then(FieldToken::classify) {
        if tokens == field_tokens::MAX_MODIFIER_TOKENS {
            return Err(DescriptorError::RunTooLong { offset: start, run: RunKind::Modifier, max: field_tokens::MAX_MODIFIER_TOKENS });
        }
        reader.next_value()?;
        bits |= (payload as u32 & field_tokens::MODIFIER_MASK) << (field_tokens::MODIFIER_SHIFT * tokens as u32);
        tokens += 1;
    }
    if tokens > 0 && reader.is_empty() {
        return Err(DescriptorError::UnterminatedRun { offset: start, run: RunKind::Modifier });
    }
    Ok(Modifiers::from_bits(bits))
}

fn expect_end(reader: &mut Base92Reader<'_>) -> Result<(), DescriptorError> {
    let offset = reader.offset();
    match reader.next_value()? {
        Some(field_tokens::END_OF_FIELD) => Ok(()),
        Some(value) => Err(DescriptorError::UnexpectedToken { offset, value, expected: "end of field descriptor" }),
        None => Err(DescriptorError::UnterminatedField { offset }),
    }
}
