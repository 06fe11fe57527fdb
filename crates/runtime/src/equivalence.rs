//! Structural equality over message storage.
//!
//! With a descriptor, absent fields read as their type default and scalars compare through a
//! canonical form of their declared type, so `0`, `"0"` and an unset int64 field are all equal.
//! Without one, `raw_equal` compares stored values as they are, treating null as absent.

use improto_core::{ConsistencyError, Error, FieldType};
use improto_descriptor::{DescriptorLookup, FieldDescriptor, MessageDescriptor};
use improto_store::{as_access, FieldAccess, SlotView, Value};
use rustc_hash::FxHashMap;

const MAP_KEY: u32 = 1;
const MAP_VALUE: u32 = 2;

/// Descriptor-aware comparison; submessage descriptors are resolved through `lookup`.
pub struct Equivalence<'a> {
    lookup: &'a dyn DescriptorLookup,
}

#[derive(Debug, Clone, PartialEq)]
enum Scalar<'v> {
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(&'v str),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MapKey<'v> {
    Bool(bool),
    Int(i128),
    Str(&'v str),
}

impl<'a> Equivalence<'a> {
    pub fn new(lookup: &'a dyn DescriptorLookup) -> Self { Self { lookup } }

    pub fn messages_equal(
        &self,
        desc: &MessageDescriptor,
        a: &dyn FieldAccess,
        b: &dyn FieldAccess,
    ) -> Result<bool, Error> {
        if a.message_id() != b.message_id() {
            return Ok(false);
        }
        for field in desc.fields().values() {
            if !self.field_equal(field, a.field(field.number), b.field(field.number))? {
                return Ok(false);
            }
        }
        let mut undeclared: Vec<u32> =
            a.present_fields().into_iter().chain(b.present_fields()).filter(|n| desc.field(*n).is_none()).collect();
        undeclared.sort_unstable();
        undeclared.dedup();
        Ok(undeclared.into_iter().all(|n| raw_equal_opt(a.field(n), b.field(n))))
    }

    fn field_equal(&self, field: &FieldDescriptor, a: Option<&Value>, b: Option<&Value>) -> Result<bool, Error> {
        if field.map {
            return self.maps_equal(field, a, b);
        }
        if field.repeated {
            let (xs, ys) = (elements(field, a)?, elements(field, b)?);
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys) {
                if !self.element_equal(field, non_null(x), non_null(y))? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        self.element_equal(field, a, b)
    }

    fn element_equal(&self, field: &FieldDescriptor, a: Option<&Value>, b: Option<&Value>) -> Result<bool, Error> {
        // unset on both sides; never descend, recursive types rely on it
        if non_null_opt(a).is_none() && non_null_opt(b).is_none() {
            return Ok(true);
        }
        match field.submessage_descriptor(self.lookup)? {
            Some(sub) => {
                let (x, y) = (message_view(field, a)?, message_view(field, b)?);
                self.messages_equal(&sub, &*x, &*y)
            }
            None => Ok(canonical(field, a)? == canonical(field, b)?),
        }
    }

    fn maps_equal(&self, field: &FieldDescriptor, a: Option<&Value>, b: Option<&Value>) -> Result<bool, Error> {
        let Some(entry) = field.submessage_descriptor(self.lookup)? else {
            return Err(mismatch(field, "map without entry type").into());
        };
        let (Some(key_field), Some(value_field)) = (entry.field(MAP_KEY), entry.field(MAP_VALUE)) else {
            return Err(mismatch(field, "map entry without key or value").into());
        };
        let (xs, ys) = (map_entries(field, key_field, a)?, map_entries(field, key_field, b)?);
        if xs.len() != ys.len() {
            return Ok(false);
        }
        for (key, x) in &xs {
            let Some(y) = ys.get(key) else { return Ok(false) };
            if !self.element_equal(value_field, *x, *y)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Layout-invariant comparison without a descriptor. Lists and messages compare as slot
/// sequences, so a message and a list holding the same fields are equal.
pub fn raw_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => *i as f64 == *f,
        (Value::String(x), Value::String(y)) => x == y,
        _ => match (as_access(a), as_access(b)) {
            (Some(x), Some(y)) => access_raw_equal(&*x, &*y),
            _ => false,
        },
    }
}

fn access_raw_equal(a: &dyn FieldAccess, b: &dyn FieldAccess) -> bool {
    if a.message_id() != b.message_id() {
        return false;
    }
    let mut numbers = a.present_fields();
    numbers.extend(b.present_fields());
    numbers.sort_unstable();
    numbers.dedup();
    numbers.into_iter().all(|n| raw_equal_opt(a.field(n), b.field(n)))
}

fn raw_equal_opt(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (non_null_opt(a), non_null_opt(b)) {
        (None, None) => true,
        (Some(x), Some(y)) => raw_equal(x, y),
        _ => false,
    }
}

fn non_null(v: &Value) -> Option<&Value> { Some(v).filter(|v| !v.is_null()) }

fn non_null_opt(v: Option<&Value>) -> Option<&Value> { v.and_then(non_null) }

fn elements<'v>(field: &FieldDescriptor, v: Option<&'v Value>) -> Result<&'v [Value], ConsistencyError> {
    match non_null_opt(v) {
        None => Ok(&[]),
        Some(Value::List(items)) => Ok(items),
        Some(other) => Err(mismatch(field, other.kind())),
    }
}

fn message_view<'v>(field: &FieldDescriptor, v: Option<&'v Value>) -> Result<Box<dyn FieldAccess + 'v>, ConsistencyError> {
    match non_null_opt(v) {
        None => Ok(Box::new(SlotView::new(&[]))),
        Some(value) => as_access(value).ok_or_else(|| mismatch(field, value.kind())),
    }
}

/// Keyed entries of a map field; a repeated key keeps its last value.
fn map_entries<'v>(
    field: &FieldDescriptor,
    key_field: &FieldDescriptor,
    v: Option<&'v Value>,
) -> Result<FxHashMap<MapKey<'v>, Option<&'v Value>>, ConsistencyError> {
    let mut out = FxHashMap::default();
    for entry in elements(field, v)? {
        let key = match canonical(key_field, entry_part(field, entry, MAP_KEY)?)? {
            Scalar::Bool(b) => MapKey::Bool(b),
            Scalar::Int(i) => MapKey::Int(i),
            Scalar::Str(s) => MapKey::Str(s),
            Scalar::Float(_) => return Err(mismatch(key_field, "float map key")),
        };
        out.insert(key, entry_part(field, entry, MAP_VALUE)?);
    }
    Ok(out)
}

fn entry_part<'v>(field: &FieldDescriptor, entry: &'v Value, number: u32) -> Result<Option<&'v Value>, ConsistencyError> {
    match entry {
        Value::Message(m) => Ok(non_null_opt(m.get(number))),
        Value::List(slots) => Ok(non_null_opt(slots.get(number as usize - 1))),
        other => Err(mismatch(field, other.kind())),
    }
}

/// Value of a scalar field in its canonical comparable form; absent reads as the default.
fn canonical<'v>(field: &FieldDescriptor, v: Option<&'v Value>) -> Result<Scalar<'v>, ConsistencyError> {
    let v = non_null_opt(v);
    let ty = field.field_type;
    match ty {
        FieldType::Bool => match v {
            None => Ok(Scalar::Bool(false)),
            Some(Value::Bool(b)) => Ok(Scalar::Bool(*b)),
            Some(Value::Int(i @ (0 | 1))) => Ok(Scalar::Bool(*i == 1)),
            Some(other) => Err(mismatch(field, other.kind())),
        },
        FieldType::Double | FieldType::Float => match v {
            None => Ok(Scalar::Float(0.0)),
            Some(Value::Float(f)) => Ok(Scalar::Float(*f)),
            Some(Value::Int(i)) => Ok(Scalar::Float(*i as f64)),
            Some(Value::String(s)) => s.parse().map(Scalar::Float).map_err(|_| mismatch(field, "non-numeric string")),
            Some(other) => Err(mismatch(field, other.kind())),
        },
        FieldType::String | FieldType::Bytes => match v {
            None => Ok(Scalar::Str("")),
            Some(Value::String(s)) => Ok(Scalar::Str(s)),
            Some(other) => Err(mismatch(field, other.kind())),
        },
        FieldType::Group | FieldType::Message => Err(mismatch(field, "scalar comparison")),
        _ => match v {
            None => Ok(Scalar::Int(0)),
            Some(Value::Int(i)) => Ok(Scalar::Int(*i as i128)),
            Some(Value::Float(f)) if f.is_finite() && f.fract() == 0.0 => Ok(Scalar::Int(*f as i128)),
            Some(Value::String(s)) => s.parse().map(Scalar::Int).map_err(|_| mismatch(field, "non-numeric string")),
            Some(other) => Err(mismatch(field, other.kind())),
        },
    }
}

fn mismatch(field: &FieldDescriptor, found: &'static str) -> ConsistencyError {
    ConsistencyError::TypeMismatch { number: field.number, field_type: field.field_type.name(), found }
}
