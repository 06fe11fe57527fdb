use std::collections::BTreeMap;

use improto_core::{ConsistencyError, MAX_FIELD_NUMBER};

use crate::value::Value;

/// Fields at or above the pivot, plus bookkeeping entries whose keys are not field numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spillover {
    fields: BTreeMap<u32, Value>,
    meta: BTreeMap<String, Value>,
}

impl Spillover {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, number: u32) -> Option<&Value> { self.fields.get(&number) }

    pub fn insert(&mut self, number: u32, value: Value) -> Option<Value> { self.fields.insert(number, value) }

    pub fn remove(&mut self, number: u32) -> Option<Value> { self.fields.remove(&number) }

    /// Field entries in ascending field number order.
    pub fn fields(&self) -> impl Iterator<Item = (u32, &Value)> + '_ { self.fields.iter().map(|(k, v)| (*k, v)) }

    pub fn meta(&self) -> impl Iterator<Item = (&str, &Value)> + '_ { self.meta.iter().map(|(k, v)| (k.as_str(), v)) }

    pub fn insert_meta(&mut self, key: impl Into<String>, value: Value) { self.meta.insert(key.into(), value); }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() && self.meta.is_empty() }
}

/// Storage of one message: slot `i` holds field `i + 1` for fields below the pivot, the
/// spillover holds the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageData {
    message_id: Option<String>,
    slots: Vec<Value>,
    spill: Option<Spillover>,
    pivot: u32,
}

impl Default for MessageData {
    fn default() -> Self { Self::new() }
}

impl MessageData {
    /// Everything positional.
    pub fn new() -> Self { Self::with_pivot(u32::MAX) }

    pub fn with_pivot(pivot: u32) -> Self { Self { message_id: None, slots: Vec::new(), spill: None, pivot: pivot.max(1) } }

    /// Assemble storage from parts. Every slot must lie below the pivot and every spilled field
    /// at or above it.
    pub fn from_parts(slots: Vec<Value>, spill: Option<Spillover>, pivot: u32) -> Result<Self, ConsistencyError> {
        let pivot = pivot.max(1);
        if slots.len() as u64 >= pivot as u64 {
            return Err(ConsistencyError::FieldNumber(slots.len() as u32));
        }
        if let Some(s) = &spill {
            if let Some((n, _)) = s.fields().find(|(n, _)| *n < pivot || *n > MAX_FIELD_NUMBER) {
                return Err(ConsistencyError::FieldNumber(n));
            }
        }
        Ok(Self { message_id: None, slots, spill, pivot })
    }

    pub fn pivot(&self) -> u32 { self.pivot }

    pub fn message_id(&self) -> Option<&str> { self.message_id.as_deref() }

    pub fn set_message_id(&mut self, id: Option<String>) { self.message_id = id; }

    pub fn slots(&self) -> &[Value] { &self.slots }

    pub fn spill(&self) -> Option<&Spillover> { self.spill.as_ref() }

    pub fn spill_mut(&mut self) -> &mut Spillover { self.spill.get_or_insert_with(Spillover::new) }

    /// Store `value` in the region `number` belongs to. Storing `Null` clears the field.
    pub fn set(&mut self, number: u32, value: impl Into<Value>) -> Result<(), ConsistencyError> {
        check_number(number)?;
        self.put(number, value.into());
        Ok(())
    }

    /// `set` for a number already known to be in range.
    fn put(&mut self, number: u32, value: Value) {
        if number < self.pivot {
            let idx = (number - 1) as usize;
            if idx >= self.slots.len() {
                if value.is_null() {
                    return;
                }
                self.slots.resize(idx + 1, Value::Null);
            }
            self.slots[idx] = value;
        } else if value.is_null() {
            if let Some(s) = self.spill.as_mut() {
                s.remove(number);
            }
        } else {
            self.spill_mut().insert(number, value);
        }
    }

    /// Builder form of [`MessageData::set`].
    pub fn with(mut self, number: u32, value: impl Into<Value>) -> Result<Self, ConsistencyError> {
        self.set(number, value)?;
        Ok(self)
    }

    /// Raw stored value, `Null` included.
    pub fn get(&self, number: u32) -> Option<&Value> {
        if number == 0 {
            return None;
        }
        if number < self.pivot {
            self.slots.get((number - 1) as usize)
        } else {
            self.spill.as_ref().and_then(|s| s.get(number))
        }
    }

    pub fn clear(&mut self, number: u32) {
        if number == 0 {
            return;
        }
        if number < self.pivot {
            if let Some(v) = self.slots.get_mut((number - 1) as usize) {
                *v = Value::Null;
            }
        } else if let Some(s) = self.spill.as_mut() {
            s.remove(number);
        }
    }

    /// Numbers of all non-null fields, ascending.
    pub fn present_fields(&self) -> Vec<u32> {
        let mut out: Vec<u32> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, _)| i as u32 + 1)
            .collect();
        if let Some(s) = &self.spill {
            out.extend(s.fields().filter(|(_, v)| !v.is_null()).map(|(n, _)| n));
        }
        out
    }

    /// Same fields stored under a different pivot.
    pub fn repivot(&self, pivot: u32) -> Self {
        let mut out = Self::with_pivot(pivot);
        out.message_id = self.message_id.clone();
        for n in self.present_fields() {
            if let Some(v) = self.get(n) {
                out.put(n, v.clone());
            }
        }
        if let Some(s) = &self.spill {
            for (k, v) in s.meta() {
                out.spill_mut().insert_meta(k, v.clone());
            }
        }
        out
    }
}

pub(crate) fn check_number(number: u32) -> Result<(), ConsistencyError> {
    if number == 0 || number > MAX_FIELD_NUMBER {
        return Err(ConsistencyError::FieldNumber(number));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_split_at_the_pivot() {
        let mut m = MessageData::with_pivot(3);
        m.set(1, "a").unwrap();
        m.set(2, 5).unwrap();
        m.set(3, true).unwrap();
        m.set(10, 1.5).unwrap();
        assert_eq!(m.slots().len(), 2);
        let spill = m.spill().unwrap();
        assert_eq!(spill.get(3), Some(&Value::Bool(true)));
        assert_eq!(spill.get(10), Some(&Value::Float(1.5)));
        assert_eq!(m.present_fields(), vec![1, 2, 3, 10]);
    }

    #[test]
    fn default_pivot_keeps_everything_positional() {
        let mut m = MessageData::new();
        m.set(4, 1).unwrap();
        assert_eq!(m.slots().len(), 4);
        assert!(m.spill().is_none());
        assert_eq!(m.get(2), Some(&Value::Null));
        assert_eq!(m.get(9), None);
    }

    #[test]
    fn null_clears() {
        let mut m = MessageData::with_pivot(2);
        m.set(1, 1).unwrap();
        m.set(5, 1).unwrap();
        m.set(5, Value::Null).unwrap();
        m.clear(1);
        assert!(m.present_fields().is_empty());
        assert_eq!(m.spill().map(Spillover::len), Some(0));
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        let mut m = MessageData::new();
        assert_eq!(m.set(0, 1), Err(ConsistencyError::FieldNumber(0)));
        assert_eq!(m.set(MAX_FIELD_NUMBER + 1, 1), Err(ConsistencyError::FieldNumber(MAX_FIELD_NUMBER + 1)));
    }

    #[test]
    fn from_parts_checks_regions() {
        let mut spill = Spillover::new();
        spill.insert(2, Value::Int(1));
        assert_eq!(
            MessageData::from_parts(vec![Value::Int(1)], Some(spill), 3),
            Err(ConsistencyError::FieldNumber(2))
        );
        assert!(MessageData::from_parts(vec![Value::Int(1), Value::Int(2)], None, 2).is_err());
    }

    #[test]
    fn repivot_moves_fields_between_regions() {
        let m = MessageData::new().with(1, 1).unwrap().with(7, "x").unwrap();
        let r = m.repivot(2);
        assert_eq!(r.slots().len(), 1);
        assert_eq!(r.spill().and_then(|s| s.get(7)), Some(&Value::from("x")));
        assert_eq!(r.present_fields(), m.present_fields());
    }
}
