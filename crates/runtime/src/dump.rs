//! Debug rendering of messages as JSON objects keyed by field number.

use improto_core::{ConsistencyError, Error, FieldType};
use improto_descriptor::{DescriptorLookup, FieldDescriptor, MessageDescriptor};
use improto_store::{as_access, FieldAccess, Value};
use serde_json::{json, Map, Value as Json};

use crate::message::Message;

const TYPE_KEY: &str = "$type";

/// `{"$type": <type id>, "<number>": <value>, ...}` for every present field.
pub fn dump(message: &Message, lookup: &dyn DescriptorLookup) -> Result<Json, Error> {
    dump_access(message.descriptor(), message.data(), lookup)
}

pub fn dump_access(desc: &MessageDescriptor, data: &dyn FieldAccess, lookup: &dyn DescriptorLookup) -> Result<Json, Error> {
    let mut out = Map::new();
    out.insert(TYPE_KEY.to_string(), Json::String(desc.type_id().to_string()));
    if let Some(id) = data.message_id() {
        out.insert("$id".to_string(), Json::String(id.to_string()));
    }
    let mut failure = None;
    desc.for_each_field(|field| {
        if failure.is_some() {
            return;
        }
        if let Some(v) = data.field(field.number) {
            match dump_field(field, v, lookup) {
                Ok(j) => {
                    out.insert(field.number.to_string(), j);
                }
                Err(e) => failure = Some(e),
            }
        }
    });
    if let Some(e) = failure {
        return Err(e);
    }
    for n in data.present_fields().into_iter().filter(|n| desc.field(*n).is_none()) {
        if let Some(v) = data.field(n) {
            out.insert(n.to_string(), v.to_jspb());
        }
    }
    Ok(Json::Object(out))
}

fn dump_field(field: &FieldDescriptor, v: &Value, lookup: &dyn DescriptorLookup) -> Result<Json, Error> {
    if !field.repeated {
        return dump_element(field, v, lookup);
    }
    let items = v.as_list().ok_or_else(|| mismatch(field, v.kind()))?;
    if field.map {
        return dump_map(field, items, lookup);
    }
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(dump_element(field, item, lookup)?);
    }
    Ok(Json::Array(out))
}

fn dump_element(field: &FieldDescriptor, v: &Value, lookup: &dyn DescriptorLookup) -> Result<Json, Error> {
    if let Some(sub) = field.submessage_descriptor(lookup)? {
        let access = as_access(v).ok_or_else(|| mismatch(field, v.kind()))?;
        return dump_access(&sub, &*access, lookup);
    }
    Ok(match (field.field_type, v) {
        (FieldType::Bytes, Value::String(_)) => match v.as_bytes() {
            Some(bytes) => json!(bytes),
            None => v.to_jspb(),
        },
        (ty, Value::Int(i)) if ty.is_64_bit_integer() => Json::String(i.to_string()),
        _ => v.to_jspb(),
    })
}

/// Map entries as an object keyed by the rendered key.
fn dump_map(field: &FieldDescriptor, entries: &[Value], lookup: &dyn DescriptorLookup) -> Result<Json, Error> {
    let entry_desc = field.submessage_descriptor(lookup)?.ok_or_else(|| mismatch(field, "map without entry type"))?;
    let value_field = entry_desc.field(2);
    let mut out = Map::new();
    for entry in entries {
        let access = as_access(entry).ok_or_else(|| mismatch(field, entry.kind()))?;
        let key = match access.field(1) {
            None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_jspb().to_string(),
        };
        let value = match (access.field(2), value_field) {
            (Some(v), Some(vf)) => dump_element(vf, v, lookup)?,
            (Some(v), None) => v.to_jspb(),
            (None, _) => Json::Null,
        };
        out.insert(key, value);
    }
    Ok(Json::Object(out))
}

fn mismatch(field: &FieldDescriptor, found: &'static str) -> ConsistencyError {
    ConsistencyError::TypeMismatch { number: field.number, field_type: field.field_type.name(), found }
}
