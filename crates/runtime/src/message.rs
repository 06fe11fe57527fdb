use std::sync::Arc;

use improto_core::Error;
use improto_descriptor::{DescriptorLookup, MessageDescriptor};
use improto_store::{FieldAccess, JspbLayout, MessageData, Value};
use once_cell::sync::OnceCell;
use tracing::trace;

use crate::equivalence::Equivalence;
use crate::hashing::hash_message;

/// A message instance: its type's descriptor plus immutable storage.
#[derive(Debug)]
pub struct Message {
    descriptor: Arc<MessageDescriptor>,
    data: MessageData,
    hash: OnceCell<i32>,
}

impl Message {
    pub fn new(descriptor: Arc<MessageDescriptor>, data: MessageData) -> Self {
        Self { descriptor, data, hash: OnceCell::new() }
    }

    /// Parse JSPB JSON. Types carrying a message id expect it in element 0.
    pub fn from_jspb(descriptor: Arc<MessageDescriptor>, json: &serde_json::Value, pivot: Option<u32>) -> Result<Self, Error> {
        let layout = JspbLayout { message_id: descriptor.message_id().is_some(), pivot };
        let mut data = MessageData::from_jspb(json, layout)?;
        if data.message_id().is_none() {
            data.set_message_id(descriptor.message_id().map(str::to_string));
        }
        trace!(type_id = descriptor.type_id(), pivot = data.pivot(), spilled = data.spill().map_or(0, |s| s.len()), "parsed jspb");
        Ok(Self::new(descriptor, data))
    }

    pub fn to_jspb(&self) -> serde_json::Value {
        self.data.to_jspb(JspbLayout { message_id: self.descriptor.message_id().is_some(), pivot: None })
    }

    pub fn descriptor(&self) -> &Arc<MessageDescriptor> { &self.descriptor }

    pub fn data(&self) -> &MessageData { &self.data }

    pub fn type_id(&self) -> &str { self.descriptor.type_id() }

    /// Present value of field `number`.
    pub fn get(&self, number: u32) -> Option<&Value> { FieldAccess::field(&self.data, number) }

    /// Structural hash of the storage, computed once.
    ///
    /// Hashes what is stored, so it is not consistent with [`Message::equals`] for explicit
    /// defaults: a field set to `0` and an unset field compare equal but hash differently.
    /// Do not key a `HashMap` on the pair.
    pub fn hash_code(&self) -> i32 { *self.hash.get_or_init(|| hash_message(&self.data)) }

    pub fn equals(&self, other: &Message, lookup: &dyn DescriptorLookup) -> Result<bool, Error> {
        if self.type_id() != other.type_id() {
            return Ok(false);
        }
        if std::ptr::eq(self, other) {
            return Ok(true);
        }
        Equivalence::new(lookup).messages_equal(&self.descriptor, &self.data, &other.data)
    }
}

impl Clone for Message {
    fn clone(&self) -> Self {
        let hash = self.hash.get().copied().map_or_else(OnceCell::new, OnceCell::from);
        Self { descriptor: Arc::clone(&self.descriptor), data: self.data.clone(), hash }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use improto_descriptor::{DescriptorArgs, DescriptorRegistry};

    fn registry() -> DescriptorRegistry {
        let reg = DescriptorRegistry::new();
        // INT32 (1), STRING (2)
        reg.register("t.Pair", DescriptorArgs::new("(^1^")).unwrap();
        reg.register("t.Other", DescriptorArgs::new("(^1^")).unwrap();
        reg
    }

    #[test]
    fn hash_is_memoized_and_layout_free() {
        let reg = registry();
        let desc = reg.get("t.Pair").unwrap();
        let a = Message::new(desc.clone(), MessageData::new().with(1, 7).unwrap().with(2, "x").unwrap());
        let b = Message::new(desc, MessageData::with_pivot(2).with(1, 7).unwrap().with(2, "x").unwrap());
        assert_eq!(a.hash_code(), a.hash_code());
        assert_eq!(a.hash_code(), b.hash_code());
        assert_eq!(a.clone().hash_code(), a.hash_code());
    }

    #[test]
    fn explicit_defaults_hash_apart_but_compare_equal() {
        let reg = registry();
        let desc = reg.get("t.Pair").unwrap();
        let explicit = Message::new(desc.clone(), MessageData::new().with(1, 5).unwrap().with(2, "").unwrap());
        let unset = Message::new(desc, MessageData::new().with(1, 5).unwrap());
        assert!(explicit.equals(&unset, &reg).unwrap());
        assert_ne!(explicit.hash_code(), unset.hash_code());
    }

    #[test]
    fn different_types_are_never_equal() {
        let reg = registry();
        let a = Message::new(reg.get("t.Pair").unwrap(), MessageData::new());
        let b = Message::new(reg.get("t.Other").unwrap(), MessageData::new());
        assert!(!a.equals(&b, &reg).unwrap());
        assert!(a.equals(&a, &reg).unwrap());
    }

    #[test]
    fn message_id_comes_from_the_type() {
        let reg = DescriptorRegistry::new();
        reg.register("t.WithId", DescriptorArgs::new("1^").with_message_id("wid")).unwrap();
        let desc = reg.get("t.WithId").unwrap();
        let m = Message::from_jspb(desc, &serde_json::json!([null, "payload"]), None).unwrap();
        assert_eq!(m.data().message_id(), Some("wid"));
        assert_eq!(m.get(1), Some(&Value::from("payload")));
        assert_eq!(m.to_jspb(), serde_json::json!(["wid", "payload"]));
    }
}
