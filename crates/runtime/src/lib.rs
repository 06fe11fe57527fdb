//! improto runtime: layout-invariant hashing and equality over message storage, the `Message`
//! wrapper generated code builds on, a debug dump and timestamp helpers.

#![forbid(unsafe_code)]

pub mod dump;
pub mod equivalence;
pub mod hashing;
pub mod message;
pub mod timestamp;

pub use dump::dump;
pub use equivalence::{raw_equal, Equivalence};
pub use hashing::{combine, hash, hash_message, hash_string};
pub use message::Message;
