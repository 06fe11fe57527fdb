//! Decoder for the oneof-groups string.
//!
//! Tokens `0..=63` contribute 6 bits each (little-token-first) to a field number, `89` closes
//! the field number and `91` closes the group.

use improto_core::base92::{oneof_tokens, Base92Reader};
use improto_core::{DescriptorError, RunKind, MAX_FIELD_NUMBER};
use serde::Serialize;
use smallvec::SmallVec;

pub type OneofGroup = SmallVec<[u32; 4]>;

/// Groups of mutually exclusive field numbers, in encoded order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OneofGroups {
    groups: Vec<OneofGroup>,
}

impl OneofGroups {
    pub fn new(groups: Vec<OneofGroup>) -> Self { Self { groups } }

    pub fn len(&self) -> usize { self.groups.len() }

    pub fn is_empty(&self) -> bool { self.groups.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &[u32]> + '_ { self.groups.iter().map(|g| g.as_slice()) }

    pub fn get(&self, index: usize) -> Option<&[u32]> { self.groups.get(index).map(|g| g.as_slice()) }

    /// The group containing `number`, if any.
    pub fn group_of(&self, number: u32) -> Option<&[u32]> {
        self.groups.iter().find(|g| g.contains(&number)).map(|g| g.as_slice())
    }
}

struct PendingNumber {
    offset: usize,
    value: u32,
    tokens: usize,
}

pub fn decode_oneofs(encoded: &str) -> Result<OneofGroups, DescriptorError> {
    let mut reader = Base92Reader::new(encoded);
    let mut groups: Vec<OneofGroup> = Vec::new();
    let mut group = OneofGroup::new();
    let mut pending: Option<PendingNumber> = None;

    while let Some(value) = reader.peek()? {
        let offset = reader.offset();
        reader.next_value()?;
        match value {
            oneof_tokens::FIELD_NUMBER_START..=oneof_tokens::FIELD_NUMBER_END => {
                let p = pending.get_or_insert(PendingNumber { offset, value: 0, tokens: 0 });
                if p.tokens == oneof_tokens::MAX_TOKENS {
                    return Err(DescriptorError::RunTooLong {
                        offset: p.offset,
                        run: RunKind::OneofFieldNumber,
                        max: oneof_tokens::MAX_TOKENS,
                    });
                }
                p.value |= (value as u32 & oneof_tokens::MASK) << (oneof_tokens::SHIFT * p.tokens as u32);
                p.tokens += 1;
            }
            oneof_tokens::FIELD_SEPARATOR => {
                let p = pending.take().ok_or(DescriptorError::UnexpectedToken { offset, value, expected: "oneof field number" })?;
                group.push(close_number(p)?);
            }
            oneof_tokens::GROUP_SEPARATOR => {
                if let Some(p) = pending.take() {
                    group.push(close_number(p)?);
                }
                groups.push(std::mem::take(&mut group));
            }
            _ => {
                return Err(DescriptorError::UnexpectedToken { offset, value, expected: "oneof field number or separator" });
            }
        }
    }
    if let Some(p) = pending.take() {
        group.push(close_number(p)?);
    }
    if !group.is_empty() {
        groups.push(group);
    }
    Ok(OneofGroups { groups })
}

fn close_number(p: PendingNumber) -> Result<u32, DescriptorError> {
    if p.value == 0 || p.value > MAX_FIELD_NUMBER {
        return Err(DescriptorError::FieldNumberOutOfRange { number: p.value as u64 });
    }
    Ok(p.value)
}
