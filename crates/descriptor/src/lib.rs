//! improto descriptors: decoding of the compact field/oneof strings emitted by the code
//! generator, the matching encoder, and the lazily decoding registry of message types.

#![forbid(unsafe_code)]

pub mod decode;
pub mod encode;
pub mod field;
pub mod message;
pub mod oneof;
pub mod registry;

pub use decode::{decode_fields, decode_single_field, RawField};
pub use encode::{encode_descriptor, encode_fields, encode_oneofs, encode_single_field};
pub use field::{FieldDescriptor, Modifiers, SubmessageRef};
pub use message::{DescriptorArgs, ExtensionArgs, MessageDescriptor};
pub use oneof::{decode_oneofs, OneofGroup, OneofGroups};
pub use registry::{DescriptorLookup, DescriptorRegistry};
