//! Base-92 alphabet used by encoded descriptors.
//!
//! Values `[0, 92)` map onto printable ASCII starting at `' '`, skipping `"`, `'` and `\` so the
//! encoded strings never need escaping in generated source. Token values are partitioned into
//! disjoint roles (see [`field_tokens`] and [`oneof_tokens`]) so a decoder can tell tokens apart by
//! value alone.

use crate::error::{AlphabetError, DescriptorError};

pub const BASE: u8 = 92;

/// Roles of token values inside an encoded field descriptor.
pub mod field_tokens {
    pub const SINGULAR_START: u8 = 0;
    pub const SINGULAR_END: u8 = 20; // inclusive
    pub const REPEATED_START: u8 = 21;
    pub const REPEATED_END: u8 = 41; // inclusive
    pub const MODIFIERS_START: u8 = 42;
    pub const MODIFIERS_END: u8 = 57; // inclusive
    pub const MAP_FIELD: u8 = 58;
    pub const END_OF_FIELD: u8 = 59;
    pub const SKIPS_START: u8 = 60;
    pub const SKIPS_END: u8 = 91; // inclusive

    pub const SKIP_SHIFT: u32 = 5;
    pub const SKIP_MASK: u64 = 0x1F;
    pub const MODIFIER_SHIFT: u32 = 4;
    pub const MODIFIER_MASK: u32 = 0x0F;

    /// 29-bit field numbers fit in 6 skip tokens; one spare.
    pub const MAX_SKIP_TOKENS: usize = 7;
    pub const MAX_MODIFIER_TOKENS: usize = 8;
}

/// Roles of token values inside an encoded oneof string.
pub mod oneof_tokens {
    pub const FIELD_NUMBER_START: u8 = 0;
    pub const FIELD_NUMBER_END: u8 = 63; // inclusive
    pub const FIELD_SEPARATOR: u8 = 89;
    pub const GROUP_SEPARATOR: u8 = 91;

    pub const SHIFT: u32 = 6;
    pub const MASK: u32 = 0x3F;
    pub const MAX_TOKENS: usize = 5;
}

/// Role of a single token value within a field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldToken {
    Type { ordinal: u8, repeated: bool },
    Modifier(u8),
    Map,
    End,
    Skip(u8),
}

impl FieldToken {
    pub fn classify(value: u8) -> Option<Self> {
        use field_tokens::*;
        Some(match value {
            SINGULAR_START..=SINGULAR_END => FieldToken::Type { ordinal: value - SINGULAR_START, repeated: false },
            REPEATED_START..=REPEATED_END => FieldToken::Type { ordinal: value - REPEATED_START, repeated: true },
            MODIFIERS_START..=MODIFIERS_END => FieldToken::Modifier(value - MODIFIERS_START),
            MAP_FIELD => FieldToken::Map,
            END_OF_FIELD => FieldToken::End,
            SKIPS_START..=SKIPS_END => FieldToken::Skip(value - SKIPS_START),
            _ => return None,
        })
    }
}

/// Map a value in `[0, 92)` to its character.
pub fn encode(value: i32) -> Result<char, AlphabetError> {
    let code = match value {
        0..=1 => value + 32,
        2..=5 => value + 33,
        6..=57 => value + 34,
        58..=91 => value + 35,
        _ => return Err(AlphabetError::OutOfRange(value as i64)),
    };
    Ok(code as u8 as char)
}

/// Inverse of [`encode`].
pub fn decode(ch: char) -> Result<u8, AlphabetError> {
    let code = ch as u32;
    let value = match code {
        32..=33 => code - 32,
        35..=38 => code - 33,
        40..=91 => code - 34,
        93..=126 => code - 35,
        _ => return Err(AlphabetError::InvalidChar(ch)),
    };
    Ok(value as u8)
}

pub fn encode_values(values: &[u8]) -> Result<String, AlphabetError> {
    values.iter().map(|v| encode(*v as i32)).collect()
}

pub fn decode_str(encoded: &str) -> Result<Vec<u8>, AlphabetError> {
    encoded.chars().map(decode).collect()
}

/// Cursor over an encoded string. Offsets are byte offsets into the source.
#[derive(Debug, Clone)]
pub struct Base92Reader<'a> {
    src: &'a str,
    cursor: usize,
}

impl<'a> Base92Reader<'a> {
    pub fn new(src: &'a str) -> Self { Self { src, cursor: 0 } }

    pub fn offset(&self) -> usize { self.cursor }

    pub fn is_empty(&self) -> bool { self.cursor >= self.src.len() }

    /// Value at the cursor without advancing; `None` at end of input.
    pub fn peek(&self) -> Result<Option<u8>, DescriptorError> {
        match self.src[self.cursor..].chars().next() {
            None => Ok(None),
            Some(ch) => decode(ch)
                .map(Some)
                .map_err(|_| DescriptorError::InvalidCharacter { offset: self.cursor, ch }),
        }
    }

    pub fn next_value(&mut self) -> Result<Option<u8>, DescriptorError> {
        let value = self.peek()?;
        if value.is_some() {
            // every valid character is single-byte ASCII
            self.cursor += 1;
        }
        Ok(value)
    }
}
