//! improto store: message storage split into positional slots and a spillover map, the
//! `FieldAccess` read contract, and JSPB JSON conversion.

#![forbid(unsafe_code)]

pub mod access;
pub mod data;
pub mod jspb;
pub mod value;

pub use access::{as_access, FieldAccess, SlotView};
pub use data::{MessageData, Spillover};
pub use jspb::JspbLayout;
pub use value::Value;
