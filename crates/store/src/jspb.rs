//! JSPB JSON: a message is an array of field values, optionally led by the message id, with a
//! trailing object holding the spillover.

use improto_core::ConsistencyError;
use serde_json::{Map, Number, Value as Json};
use tracing::trace;

use crate::data::{check_number, MessageData, Spillover};
use crate::value::Value;

/// How the top-level array is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JspbLayout {
    /// Element 0 holds the message id; field `n` sits at index `n`.
    pub message_id: bool,
    /// Pivot to use when the array carries no spillover object.
    pub pivot: Option<u32>,
}

impl Default for JspbLayout {
    fn default() -> Self { Self { message_id: false, pivot: None } }
}

impl JspbLayout {
    pub fn with_message_id() -> Self { Self { message_id: true, pivot: None } }

    pub fn pivot(mut self, pivot: u32) -> Self {
        self.pivot = Some(pivot);
        self
    }
}

impl MessageData {
    pub fn from_jspb(json: &Json, layout: JspbLayout) -> Result<Self, ConsistencyError> {
        let items = match json {
            Json::Array(items) => items,
            other => return Err(shape("$", "array", other)),
        };
        let (message_id, fields) = match (layout.message_id, items.split_first()) {
            (true, Some((first, rest))) if !first.is_object() => (message_id(first)?, rest),
            _ => (None, items.as_slice()),
        };
        let mut data = message_from_items(fields, "$", layout.pivot)?;
        data.set_message_id(message_id);
        trace!(fields = data.present_fields().len(), pivot = data.pivot(), "parsed jspb message");
        Ok(data)
    }

    pub fn to_jspb(&self, layout: JspbLayout) -> Json {
        let mut out = Vec::with_capacity(self.slots().len() + 2);
        if layout.message_id {
            out.push(self.message_id().map_or(Json::Null, |id| Json::String(id.to_string())));
        }
        out.extend(self.slots().iter().map(Value::to_jspb));
        if let Some(spill) = self.spill().filter(|s| !s.is_empty()) {
            let mut obj = Map::new();
            for (n, v) in spill.fields() {
                obj.insert(n.to_string(), v.to_jspb());
            }
            for (k, v) in spill.meta() {
                obj.insert(k.to_string(), v.to_jspb());
            }
            out.push(Json::Object(obj));
        }
        Json::Array(out)
    }
}

impl Value {
    /// Convert a JSON value. Arrays ending in an object become messages; other arrays are lists.
    pub fn from_jspb(json: &Json) -> Result<Self, ConsistencyError> { value_from_json(json, "$") }

    pub fn to_jspb(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => match Number::from_f64(*f) {
                Some(n) => Json::Number(n),
                None if f.is_nan() => Json::String("NaN".into()),
                None if *f > 0.0 => Json::String("Infinity".into()),
                None => Json::String("-Infinity".into()),
            },
            Value::String(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_jspb).collect()),
            Value::Message(m) => m.to_jspb(JspbLayout::default()),
        }
    }
}

fn value_from_json(json: &Json, path: &str) -> Result<Value, ConsistencyError> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) if items.last().is_some_and(Json::is_object) => {
            Value::Message(Box::new(message_from_items(items, path, None)?))
        }
        Json::Array(items) => Value::List(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| value_from_json(v, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        Json::Object(_) => return Err(shape(path, "array or scalar", json)),
    })
}

/// Field values in order (field 1 first), optionally ending in the spillover object.
fn message_from_items(items: &[Json], path: &str, suggested_pivot: Option<u32>) -> Result<MessageData, ConsistencyError> {
    let (positional, spill_obj) = match items.split_last() {
        Some((Json::Object(obj), rest)) => (rest, Some(obj)),
        _ => (items, None),
    };
    let mut slots = Vec::with_capacity(positional.len());
    for (i, item) in positional.iter().enumerate() {
        slots.push(value_from_json(item, &format!("{path}[{i}]"))?);
    }
    match spill_obj {
        Some(obj) => {
            let pivot = u32::try_from(slots.len() + 1).map_err(|_| ConsistencyError::FieldNumber(u32::MAX))?;
            let spill = spill_from_object(obj, &format!("{path}[{}]", positional.len()))?;
            MessageData::from_parts(slots, Some(spill), pivot)
        }
        None => {
            let pivot = suggested_pivot.unwrap_or(u32::MAX).max(1);
            let mut data = MessageData::with_pivot(pivot);
            for (i, v) in slots.into_iter().enumerate() {
                let n = u32::try_from(i + 1).map_err(|_| ConsistencyError::FieldNumber(u32::MAX))?;
                data.set(n, v)?;
            }
            Ok(data)
        }
    }
}

fn spill_from_object(obj: &Map<String, Json>, path: &str) -> Result<Spillover, ConsistencyError> {
    let mut spill = Spillover::new();
    for (key, json) in obj {
        let value = value_from_json(json, &format!("{path}.{key}"))?;
        match key.parse::<u32>() {
            Ok(n) => {
                check_number(n)?;
                spill.insert(n, value);
            }
            Err(_) => spill.insert_meta(key.as_str(), value),
        }
    }
    Ok(spill)
}

fn message_id(json: &Json) -> Result<Option<String>, ConsistencyError> {
    match json {
        Json::Null => Ok(None),
        Json::String(s) => Ok(Some(s.clone())),
        Json::Number(n) => Ok(Some(n.to_string())),
        other => Err(shape("$[0]", "message id", other)),
    }
}

fn shape(path: &str, expected: &'static str, found: &Json) -> ConsistencyError {
    let found = match found {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    };
    ConsistencyError::UnexpectedShape { path: path.to_string(), expected, found }
}
