//! Error taxonomy. Every error here is a programming-level failure: a descriptor produced by a
//! mismatched code generator, or storage built by a buggy producer. Nothing is retried.

use crate::MAX_FIELD_NUMBER;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlphabetError {
    #[error("value {0} is out of range for base92")]
    OutOfRange(i64),
    #[error("character {0:?} is not part of the base92 alphabet")]
    InvalidChar(char),
}

/// Multi-token runs in the descriptor encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Skip,
    Modifier,
    OneofFieldNumber,
}

impl std::fmt::Display for RunKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RunKind::Skip => "field skip",
            RunKind::Modifier => "modifier",
            RunKind::OneofFieldNumber => "oneof field number",
        })
    }
}

/// Malformed descriptor or oneof string, or a descriptor that cannot be assembled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("malformed descriptor; invalid character {ch:?} at offset {offset}")]
    InvalidCharacter { offset: usize, ch: char },
    #[error("malformed descriptor; {run} run at offset {offset} is not terminated")]
    UnterminatedRun { offset: usize, run: RunKind },
    #[error("malformed descriptor; {run} run at offset {offset} exceeds {max} tokens")]
    RunTooLong { offset: usize, run: RunKind, max: usize },
    #[error("malformed descriptor; field at offset {offset} is missing its end marker")]
    UnterminatedField { offset: usize },
    #[error("malformed descriptor; end of field descriptor at offset {offset} without a field type")]
    EndWithoutField { offset: usize },
    #[error("malformed descriptor; expected {expected} but got value {value} at offset {offset}")]
    UnexpectedToken { offset: usize, value: u8, expected: &'static str },
    #[error("malformed descriptor; unknown field type ordinal {ordinal} at offset {offset}")]
    UnknownFieldType { offset: usize, ordinal: u8 },
    #[error("malformed descriptor; field numbers should be <= {} and >= 1, but was {number}", MAX_FIELD_NUMBER)]
    FieldNumberOutOfRange { number: u64 },
    #[error("malformed descriptor; field {number} is defined more than once")]
    DuplicateField { number: u32 },
    #[error("malformed descriptor; missing submessage descriptor for field {number}")]
    MissingSubmessage { number: u32 },
    #[error("malformed descriptor; oneof member {number} is not a declared field")]
    UnknownOneofField { number: u32 },
    #[error("malformed descriptor; field {number} belongs to more than one oneof")]
    DuplicateOneofField { number: u32 },
    #[error("no descriptor registered for type {0:?}")]
    UnknownType(String),
    #[error("descriptor for type {0:?} is already registered")]
    DuplicateType(String),
}

/// Storage handed to the runtime does not have a shape it can work with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("unexpected {found} at {path}; expected {expected}")]
    UnexpectedShape { path: String, expected: &'static str, found: &'static str },
    #[error("field numbers should be <= {} and >= 1, but was {0}", MAX_FIELD_NUMBER)]
    FieldNumber(u32),
    #[error("field {number} of type {field_type} holds {found}")]
    TypeMismatch { number: u32, field_type: &'static str, found: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Alphabet(#[from] AlphabetError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

pub type Result<T> = std::result::Result<T, Error>;
