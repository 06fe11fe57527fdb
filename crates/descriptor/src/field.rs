use std::sync::{Arc, Weak};

use improto_core::{DescriptorError, FieldType};
use once_cell::sync::OnceCell;
use serde::{Serialize, Serializer};

use crate::message::MessageDescriptor;
use crate::registry::DescriptorLookup;

/// Modifier bit-set carried by the modifier tokens of a field descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Modifiers(u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const UNPACKED: Modifiers = Modifiers(1 << 0);
    pub const EXTENSION: Modifiers = Modifiers(1 << 1);
    pub const INT64_AS_STRING: Modifiers = Modifiers(1 << 2);
    const KNOWN: u32 = 0b111;

    pub const fn from_bits(bits: u32) -> Self { Modifiers(bits) }
    pub const fn bits(self) -> u32 { self.0 }
    pub const fn contains(self, other: Modifiers) -> bool { self.0 & other.0 == other.0 }
    pub const fn union(self, other: Modifiers) -> Self { Modifiers(self.0 | other.0) }

    /// Bits this decoder assigns no meaning to.
    pub const fn reserved(self) -> u32 { self.0 & !Self::KNOWN }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;
    fn bitor(self, rhs: Modifiers) -> Modifiers { self.union(rhs) }
}

/// Deferred reference to the descriptor of a MESSAGE/GROUP field's type.
///
/// Decoding only records the type id. The descriptor is looked up on first use and a weak
/// handle is cached, so message types may reference each other (or themselves) without the
/// decoder ever constructing them eagerly.
#[derive(Debug)]
pub struct SubmessageRef {
    type_id: Arc<str>,
    resolved: OnceCell<Weak<MessageDescriptor>>,
}

impl SubmessageRef {
    pub fn new(type_id: impl Into<Arc<str>>) -> Self {
        Self { type_id: type_id.into(), resolved: OnceCell::new() }
    }

    pub fn type_id(&self) -> &str { &self.type_id }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().and_then(Weak::upgrade).is_some()
    }

    pub fn resolve(&self, lookup: &dyn DescriptorLookup) -> Result<Arc<MessageDescriptor>, DescriptorError> {
        if let Some(desc) = self.resolved.get().and_then(Weak::upgrade) {
            return Ok(desc);
        }
        let desc = lookup.lookup(&self.type_id)?;
        let _ = self.resolved.set(Arc::downgrade(&desc));
        Ok(desc)
    }
}

impl Serialize for SubmessageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.type_id)
    }
}

/// Metadata for one field number of a message type, extensions included.
#[derive(Debug, Serialize)]
pub struct FieldDescriptor {
    pub number: u32,
    pub field_type: FieldType,
    pub repeated: bool,
    /// Synthetic map field; modelled as a repeated MESSAGE of entry type (1 = key, 2 = value).
    pub map: bool,
    pub extension: bool,
    /// Only meaningful for repeated packable fields.
    pub unpacked: bool,
    pub int64_as_string: bool,
    #[serde(rename = "submessage_type", skip_serializing_if = "Option::is_none")]
    submessage: Option<SubmessageRef>,
}

impl FieldDescriptor {
    pub fn new(number: u32, field_type: FieldType) -> Self {
        Self {
            number,
            field_type,
            repeated: false,
            map: false,
            extension: false,
            unpacked: false,
            int64_as_string: false,
            submessage: None,
        }
    }

    pub(crate) fn with_submessage(mut self, type_id: impl Into<Arc<str>>) -> Self {
        self.submessage = Some(SubmessageRef::new(type_id));
        self
    }

    pub fn submessage(&self) -> Option<&SubmessageRef> { self.submessage.as_ref() }

    pub fn submessage_type(&self) -> Option<&str> { self.submessage.as_ref().map(|s| s.type_id()) }

    /// Resolve the nested descriptor; `Ok(None)` for scalar fields.
    pub fn submessage_descriptor(
        &self,
        lookup: &dyn DescriptorLookup,
    ) -> Result<Option<Arc<MessageDescriptor>>, DescriptorError> {
        match &self.submessage {
            Some(r) => r.resolve(lookup).map(Some),
            None => Ok(None),
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        let mut m = Modifiers::NONE;
        if self.unpacked { m = m | Modifiers::UNPACKED; }
        if self.extension { m = m | Modifiers::EXTENSION; }
        if self.int64_as_string { m = m | Modifiers::INT64_AS_STRING; }
        m
    }

    /// Whether repeated values use packed encoding.
    pub fn is_packed(&self) -> bool { self.repeated && self.field_type.is_packable() && !self.unpacked }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        held: Arc<MessageDescriptor>,
        calls: AtomicUsize,
    }

    impl DescriptorLookup for Counting {
        fn lookup(&self, _type_id: &str) -> Result<Arc<MessageDescriptor>, DescriptorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::clone(&self.held))
        }
    }

    struct Fresh(AtomicUsize);

    impl DescriptorLookup for Fresh {
        fn lookup(&self, type_id: &str) -> Result<Arc<MessageDescriptor>, DescriptorError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            MessageDescriptor::from_encoded(type_id, "(^").map(Arc::new)
        }
    }

    #[test]
    fn resolves_once_while_the_lookup_holds_the_descriptor() {
        let lookup = Counting { held: Arc::new(MessageDescriptor::from_encoded("t.Held", "(^").unwrap()), calls: AtomicUsize::new(0) };
        let r = SubmessageRef::new("t.Held");
        assert!(!r.is_resolved());
        let a = r.resolve(&lookup).unwrap();
        let b = r.resolve(&lookup).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(r.is_resolved());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_descriptors_are_looked_up_again() {
        let lookup = Fresh(AtomicUsize::new(0));
        let r = SubmessageRef::new("t.Fresh");
        drop(r.resolve(&lookup).unwrap());
        assert!(!r.is_resolved());
        r.resolve(&lookup).unwrap();
        assert_eq!(lookup.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn modifier_bits_are_independent() {
        let m = Modifiers::UNPACKED | Modifiers::INT64_AS_STRING;
        assert!(m.contains(Modifiers::UNPACKED));
        assert!(!m.contains(Modifiers::EXTENSION));
        assert!(m.contains(Modifiers::INT64_AS_STRING));
        assert_eq!(m.reserved(), 0);
        assert_eq!(Modifiers::from_bits(0b1001).reserved(), 0b1000);
    }

    #[test]
    fn packed_only_for_repeated_packable() {
        let mut f = FieldDescriptor::new(1, FieldType::Int32);
        assert!(!f.is_packed());
        f.repeated = true;
        assert!(f.is_packed());
        f.unpacked = true;
        assert!(!f.is_packed());
        let mut s = FieldDescriptor::new(2, FieldType::String);
        s.repeated = true;
        assert!(!s.is_packed());
    }

    #[test]
    fn serializes_submessage_type_id() {
        let f = FieldDescriptor::new(3, FieldType::Message).with_submessage("pkg.Inner");
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["submessage_type"], "pkg.Inner");
        assert_eq!(v["field_type"], "MESSAGE");
        let scalar = serde_json::to_value(FieldDescriptor::new(1, FieldType::Bool)).unwrap();
        assert!(scalar.get("submessage_type").is_none());
    }
}
