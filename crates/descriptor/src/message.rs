use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use improto_core::DescriptorError;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::decode::{decode_fields, decode_single_field, RawField};
use crate::field::FieldDescriptor;
use crate::oneof::{decode_oneofs, OneofGroups};

/// Extension registry entry: a single-field encoded descriptor for `number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionArgs {
    pub number: u32,
    pub encoded: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submessage: Option<String>,
}

/// Everything generated code hands over to build the descriptor of one message type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorArgs {
    pub encoded: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneofs: Option<String>,
    /// Type ids for MESSAGE/GROUP/map fields, consumed in ascending field order.
    #[serde(default)]
    pub submessages: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<ExtensionArgs>,
    #[serde(default)]
    pub extendable: bool,
    #[serde(default)]
    pub message_set: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl DescriptorArgs {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self { encoded: encoded.into(), ..Default::default() }
    }

    pub fn with_oneofs(mut self, oneofs: impl Into<String>) -> Self {
        self.oneofs = Some(oneofs.into());
        self
    }

    pub fn with_submessage(mut self, type_id: impl Into<String>) -> Self {
        self.submessages.push(type_id.into());
        self
    }

    pub fn with_extension(mut self, number: u32, encoded: impl Into<String>, submessage: Option<&str>) -> Self {
        self.extensions.push(ExtensionArgs { number, encoded: encoded.into(), submessage: submessage.map(str::to_string) });
        self
    }

    pub fn extendable(mut self) -> Self {
        self.extendable = true;
        self
    }

    pub fn message_set(mut self) -> Self {
        self.message_set = true;
        self
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }
}

/// Immutable field metadata for one message type.
#[derive(Debug, Serialize)]
pub struct MessageDescriptor {
    #[serde(serialize_with = "serialize_type_id")]
    type_id: Arc<str>,
    fields: BTreeMap<u32, FieldDescriptor>,
    oneofs: OneofGroups,
    extendable: bool,
    message_set: bool,
    message_id: Option<String>,
}

fn serialize_type_id<S: Serializer>(type_id: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(type_id)
}

impl MessageDescriptor {
    /// Decode `args` into a descriptor. Submessage references are recorded, never resolved here.
    pub fn decode(type_id: &str, args: &DescriptorArgs) -> Result<Self, DescriptorError> {
        let mut submessages = args.submessages.iter();
        let mut fields = BTreeMap::new();

        for raw in decode_fields(&args.encoded)? {
            let field = match raw.field_type.is_submessage() {
                true => {
                    let id = submessages.next().ok_or(DescriptorError::MissingSubmessage { number: raw.number })?;
                    build_field(&raw, raw.extension()).with_submessage(id.as_str())
                }
                false => build_field(&raw, raw.extension()),
            };
            insert_field(&mut fields, field)?;
        }
        let unused = submessages.count();
        if unused > 0 {
            warn!(type_id, unused, "descriptor received more submessage ids than message fields");
        }

        for ext in &args.extensions {
            let raw = decode_single_field(&ext.encoded, ext.number)?;
            let field = build_field(&raw, true);
            let field = match (raw.field_type.is_submessage(), &ext.submessage) {
                (true, Some(id)) => field.with_submessage(id.as_str()),
                (true, None) => return Err(DescriptorError::MissingSubmessage { number: raw.number }),
                (false, _) => field,
            };
            insert_field(&mut fields, field)?;
        }

        let oneofs = match &args.oneofs {
            Some(s) => decode_oneofs(s)?,
            None => OneofGroups::default(),
        };
        check_oneofs(&fields, &oneofs)?;

        let extendable = args.extendable || fields.values().any(|f| f.extension);
        debug!(type_id, fields = fields.len(), oneofs = oneofs.len(), "decoded message descriptor");
        Ok(Self {
            type_id: type_id.into(),
            fields,
            oneofs,
            extendable,
            message_set: args.message_set,
            message_id: args.message_id.clone(),
        })
    }

    /// Descriptor for a type without submessages, extensions or options.
    pub fn from_encoded(type_id: &str, encoded: &str) -> Result<Self, DescriptorError> {
        Self::decode(type_id, &DescriptorArgs::new(encoded))
    }

    pub fn type_id(&self) -> &str { &self.type_id }

    pub fn fields(&self) -> &BTreeMap<u32, FieldDescriptor> { &self.fields }

    pub fn field(&self, number: u32) -> Option<&FieldDescriptor> { self.fields.get(&number) }

    /// Visit every field, extensions included, in ascending field number order.
    pub fn for_each_field<F: FnMut(&FieldDescriptor)>(&self, mut f: F) {
        for field in self.fields.values() {
            f(field);
        }
    }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn oneofs(&self) -> &OneofGroups { &self.oneofs }

    pub fn has_oneofs(&self) -> bool { !self.oneofs.is_empty() }

    pub fn is_extendable(&self) -> bool { self.extendable }

    pub fn is_message_set(&self) -> bool { self.message_set }

    pub fn message_id(&self) -> Option<&str> { self.message_id.as_deref() }
}

fn build_field(raw: &RawField, extension: bool) -> FieldDescriptor {
    let mut f = FieldDescriptor::new(raw.number, raw.field_type);
    f.repeated = raw.repeated;
    f.map = raw.map;
    f.extension = extension;
    f.unpacked = raw.unpacked();
    f.int64_as_string = raw.int64_as_string();
    f
}

fn insert_field(fields: &mut BTreeMap<u32, FieldDescriptor>, field: FieldDescriptor) -> Result<(), DescriptorError> {
    match fields.entry(field.number) {
        Entry::Occupied(_) => Err(DescriptorError::DuplicateField { number: field.number }),
        Entry::Vacant(v) => {
            v.insert(field);
            Ok(())
        }
    }
}

fn check_oneofs(fields: &BTreeMap<u32, FieldDescriptor>, oneofs: &OneofGroups) -> Result<(), DescriptorError> {
    let mut seen = rustc_hash::FxHashSet::default();
    for number in oneofs.iter().flatten().copied() {
        if !fields.contains_key(&number) {
            return Err(DescriptorError::UnknownOneofField { number });
        }
        if !seen.insert(number) {
            return Err(DescriptorError::DuplicateOneofField { number });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use improto_core::FieldType;

    #[test]
    fn submessage_ids_are_consumed_in_field_order() {
        // MESSAGE (1), INT32 (2), repeated MESSAGE (3)
        let s = improto_core::base92::encode_values(&[17, 59, 6, 59, 38, 59]).unwrap();
        let args = DescriptorArgs::new(s).with_submessage("a.A").with_submessage("a.B");
        let d = MessageDescriptor::decode("a.Outer", &args).unwrap();
        assert_eq!(d.field(1).unwrap().submessage_type(), Some("a.A"));
        assert_eq!(d.field(2).unwrap().submessage_type(), None);
        assert_eq!(d.field(3).unwrap().submessage_type(), Some("a.B"));
        assert!(d.field(3).unwrap().repeated);
    }

    #[test]
    fn serializes_type_id_as_string() {
        let d = MessageDescriptor::decode("a.S", &DescriptorArgs::new("(^").with_message_id("sid")).unwrap();
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["type_id"], serde_json::json!("a.S"));
        assert_eq!(json["message_id"], serde_json::json!("sid"));
        assert_eq!(json["fields"]["1"]["field_type"], serde_json::json!("INT32"));
    }

    #[test]
    fn missing_submessage_id_is_fatal() {
        let s = improto_core::base92::encode_values(&[16, 59]).unwrap();
        let err = MessageDescriptor::from_encoded("a.G", &s).unwrap_err();
        assert_eq!(err, DescriptorError::MissingSubmessage { number: 1 });
    }

    #[test]
    fn extensions_merge_and_collide() {
        let args = DescriptorArgs::new("(^").with_extension(100, "1", None);
        let d = MessageDescriptor::decode("a.E", &args).unwrap();
        assert!(d.is_extendable());
        let ext = d.field(100).unwrap();
        assert!(ext.extension);
        assert_eq!(ext.field_type, FieldType::String);

        let clash = DescriptorArgs::new("(^").with_extension(1, "1", None);
        assert_eq!(
            MessageDescriptor::decode("a.E", &clash).unwrap_err(),
            DescriptorError::DuplicateField { number: 1 }
        );
    }

    #[test]
    fn options_are_carried() {
        let d = MessageDescriptor::decode("a.O", &DescriptorArgs::new("").message_set().with_message_id("x")).unwrap();
        assert!(d.is_message_set());
        assert_eq!(d.message_id(), Some("x"));
        assert!(!d.is_extendable());
        assert!(d.is_empty());
    }

    #[test]
    fn oneof_members_must_be_declared_once() {
        // INT32 (1), STRING (2)
        let ok = DescriptorArgs::new("(^1^").with_oneofs("!|#");
        let d = MessageDescriptor::decode("a.Oneof", &ok).unwrap();
        assert!(d.has_oneofs());
        assert_eq!(d.oneofs().group_of(2).unwrap(), &[1, 2]);

        let unknown = DescriptorArgs::new("(^").with_oneofs("!|#");
        assert_eq!(
            MessageDescriptor::decode("a.Oneof", &unknown).unwrap_err(),
            DescriptorError::UnknownOneofField { number: 2 }
        );
        let twice = DescriptorArgs::new("(^1^").with_oneofs("!~!");
        assert_eq!(
            MessageDescriptor::decode("a.Oneof", &twice).unwrap_err(),
            DescriptorError::DuplicateOneofField { number: 1 }
        );
    }

    #[test]
    fn args_deserialize_with_defaults() {
        let args: DescriptorArgs = serde_json::from_str(r#"{"encoded": "(^", "submessages": []}"#).unwrap();
        assert_eq!(args, DescriptorArgs::new("(^"));
    }
}
