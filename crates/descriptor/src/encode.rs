//! Encoder producing the strings `decode` reads. Used by tooling and tests.

use improto_core::base92::{self, field_tokens, oneof_tokens};
use improto_core::{DescriptorError, FieldType, Result, MAX_FIELD_NUMBER};

use crate::decode::RawField;
use crate::field::{FieldDescriptor, Modifiers};
use crate::message::MessageDescriptor;

impl RawField {
    pub fn new(number: u32, field_type: FieldType) -> Self {
        Self { number, field_type, repeated: false, map: false, modifiers: Modifiers::NONE }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn map(mut self) -> Self {
        self.field_type = FieldType::Message;
        self.repeated = true;
        self.map = true;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

impl From<&FieldDescriptor> for RawField {
    fn from(f: &FieldDescriptor) -> Self {
        Self { number: f.number, field_type: f.field_type, repeated: f.repeated, map: f.map, modifiers: f.modifiers() }
    }
}

/// Encode `fields` in ascending number order. Numbers must be unique and in range.
pub fn encode_fields(fields: &[RawField]) -> Result<String> {
    let mut sorted: Vec<&RawField> = fields.iter().collect();
    sorted.sort_by_key(|f| f.number);
    let mut out = Vec::with_capacity(sorted.len() * 2);
    let mut previous = 0u32;
    for f in sorted {
        check_number(f.number)?;
        if f.number == previous {
            return Err(DescriptorError::DuplicateField { number: f.number }.into());
        }
        let gap = f.number - previous;
        if gap != 1 {
            push_run(&mut out, gap, field_tokens::SKIP_SHIFT, field_tokens::SKIP_MASK as u32, field_tokens::SKIPS_START);
        }
        push_field(&mut out, f);
        out.push(field_tokens::END_OF_FIELD);
        previous = f.number;
    }
    to_string(&out)
}

/// Encode a single field without its number, as stored in the extension registry.
pub fn encode_single_field(field: &RawField) -> Result<String> {
    check_number(field.number)?;
    let mut out = Vec::with_capacity(2);
    push_field(&mut out, field);
    out.push(field_tokens::END_OF_FIELD);
    to_string(&out)
}

/// Encode the non-extension fields of a decoded descriptor.
pub fn encode_descriptor(desc: &MessageDescriptor) -> Result<String> {
    let fields: Vec<RawField> =
        desc.fields().values().filter(|f| !f.extension).map(RawField::from).collect();
    encode_fields(&fields)
}

pub fn encode_oneofs<G: AsRef<[u32]>>(groups: &[G]) -> Result<String> {
    let mut out = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            out.push(oneof_tokens::GROUP_SEPARATOR);
        }
        for (j, &number) in group.as_ref().iter().enumerate() {
            check_number(number)?;
            if j > 0 {
                out.push(oneof_tokens::FIELD_SEPARATOR);
            }
            push_run(&mut out, number, oneof_tokens::SHIFT, oneof_tokens::MASK, oneof_tokens::FIELD_NUMBER_START);
        }
    }
    to_string(&out)
}

fn push_field(out: &mut Vec<u8>, f: &RawField) {
    let token = match (f.map, f.repeated) {
        (true, _) => field_tokens::MAP_FIELD,
        (false, true) => field_tokens::REPEATED_START + f.field_type.ordinal(),
        (false, false) => field_tokens::SINGULAR_START + f.field_type.ordinal(),
    };
    out.push(token);
    let bits = f.modifiers.bits();
    if bits != 0 {
        push_run(out, bits, field_tokens::MODIFIER_SHIFT, field_tokens::MODIFIER_MASK, field_tokens::MODIFIERS_START);
    }
}

/// Little-token-first chunks of `value`, `shift` bits each, until nothing is left.
fn push_run(out: &mut Vec<u8>, mut value: u32, shift: u32, mask: u32, base: u8) {
    loop {
        out.push(base + (value & mask) as u8);
        value >>= shift;
        if value == 0 {
            break;
        }
    }
}

fn check_number(number: u32) -> std::result::Result<(), DescriptorError> {
    if number == 0 || number > MAX_FIELD_NUMBER {
        return Err(DescriptorError::FieldNumberOutOfRange { number: number as u64 });
    }
    Ok(())
}

fn to_string(values: &[u8]) -> Result<String> { Ok(base92::encode_values(values)?) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_fields;
    use crate::oneof::decode_oneofs;

    #[test]
    fn encodes_literal_descriptor() {
        let fields = [
            RawField::new(1, FieldType::Int32),
            RawField::new(2, FieldType::String),
            RawField::new(5, FieldType::Int32).repeated(),
        ];
        assert_eq!(encode_fields(&fields).unwrap(), "(^1^b=^");
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = [RawField::new(3, FieldType::Bool), RawField::new(1, FieldType::Bytes)];
        let b = [RawField::new(1, FieldType::Bytes), RawField::new(3, FieldType::Bool)];
        assert_eq!(encode_fields(&a).unwrap(), encode_fields(&b).unwrap());
    }

    #[test]
    fn rejects_duplicates_and_zero() {
        let dup = [RawField::new(4, FieldType::Bool), RawField::new(4, FieldType::Int64)];
        assert_eq!(encode_fields(&dup), Err(DescriptorError::DuplicateField { number: 4 }.into()));
        assert_eq!(
            encode_fields(&[RawField::new(0, FieldType::Bool)]),
            Err(DescriptorError::FieldNumberOutOfRange { number: 0 }.into())
        );
    }

    #[test]
    fn modifiers_survive() {
        let f = RawField::new(9, FieldType::Int64).repeated().with_modifiers(Modifiers::UNPACKED | Modifiers::INT64_AS_STRING);
        let decoded = decode_fields(&encode_fields(&[f]).unwrap()).unwrap();
        assert_eq!(decoded, vec![f]);
    }

    #[test]
    fn oneofs_encode_to_decoder_input() {
        let s = encode_oneofs(&[vec![1, 3, 5], vec![2, 64]]).unwrap();
        assert_eq!(s, "!|$|&~#| !");
        assert_eq!(decode_oneofs(&s).unwrap().get(1).unwrap(), &[2, 64]);
    }
}
