//! improto core types: the base-92 alphabet, protobuf field types and the error taxonomy
//! shared by the descriptor, store and runtime crates.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub mod base92;
pub mod error;

pub use error::{AlphabetError, ConsistencyError, DescriptorError, Error, Result, RunKind};

/// Largest field number protobuf allows (2^29 - 1).
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Wire-level kind of a field. Ordinals are part of the descriptor encoding and must not change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Double = 0,
    Float = 1,
    Fixed32 = 2,
    Fixed64 = 3,
    Sfixed32 = 4,
    Sfixed64 = 5,
    Int32 = 6,
    Uint32 = 7,
    Sint32 = 8,
    Int64 = 9,
    Uint64 = 10,
    Sint64 = 11,
    Enum = 12,
    Bool = 13,
    Bytes = 14,
    String = 15,
    Group = 16,
    Message = 17,
}

impl FieldType {
    pub const ALL: [FieldType; 18] = [
        FieldType::Double,
        FieldType::Float,
        FieldType::Fixed32,
        FieldType::Fixed64,
        FieldType::Sfixed32,
        FieldType::Sfixed64,
        FieldType::Int32,
        FieldType::Uint32,
        FieldType::Sint32,
        FieldType::Int64,
        FieldType::Uint64,
        FieldType::Sint64,
        FieldType::Enum,
        FieldType::Bool,
        FieldType::Bytes,
        FieldType::String,
        FieldType::Group,
        FieldType::Message,
    ];

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    pub fn ordinal(self) -> u8 { self as u8 }

    /// GROUP and MESSAGE fields carry a nested descriptor.
    pub fn is_submessage(self) -> bool { matches!(self, FieldType::Group | FieldType::Message) }

    /// Scalar kinds that may use packed encoding when repeated.
    pub fn is_packable(self) -> bool {
        !matches!(self, FieldType::Bytes | FieldType::String | FieldType::Group | FieldType::Message)
    }

    pub fn is_64_bit_integer(self) -> bool {
        matches!(
            self,
            FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Int64 | FieldType::Uint64 | FieldType::Sint64
        )
    }

    pub fn is_floating_point(self) -> bool { matches!(self, FieldType::Double | FieldType::Float) }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Double => "DOUBLE",
            FieldType::Float => "FLOAT",
            FieldType::Fixed32 => "FIXED32",
            FieldType::Fixed64 => "FIXED64",
            FieldType::Sfixed32 => "SFIXED32",
            FieldType::Sfixed64 => "SFIXED64",
            FieldType::Int32 => "INT32",
            FieldType::Uint32 => "UINT32",
            FieldType::Sint32 => "SINT32",
            FieldType::Int64 => "INT64",
            FieldType::Uint64 => "UINT64",
            FieldType::Sint64 => "SINT64",
            FieldType::Enum => "ENUM",
            FieldType::Bool => "BOOL",
            FieldType::Bytes => "BYTES",
            FieldType::String => "STRING",
            FieldType::Group => "GROUP",
            FieldType::Message => "MESSAGE",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.pad(self.name()) }
}

pub mod prelude {
    pub use super::{ConsistencyError, DescriptorError, Error, FieldType, MAX_FIELD_NUMBER};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_stable() {
        for (i, ty) in FieldType::ALL.iter().enumerate() {
            assert_eq!(ty.ordinal() as usize, i);
            assert_eq!(FieldType::from_ordinal(i as u8), Some(*ty));
        }
        assert_eq!(FieldType::from_ordinal(18), None);
        assert_eq!(FieldType::Message.ordinal(), 17);
    }

    #[test]
    fn classification_helpers() {
        assert!(FieldType::Group.is_submessage());
        assert!(!FieldType::Bytes.is_submessage());
        assert!(FieldType::Enum.is_packable());
        assert!(!FieldType::String.is_packable());
        assert!(FieldType::Sint64.is_64_bit_integer());
        assert!(!FieldType::Int32.is_64_bit_integer());
    }

    #[test]
    fn serializes_with_proto_names() {
        let s = serde_json::to_string(&FieldType::Sfixed64).unwrap();
        assert_eq!(s, "\"SFIXED64\"");
        assert_eq!(FieldType::Uint32.to_string(), "UINT32");
    }
}
