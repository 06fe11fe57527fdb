use crate::data::MessageData;
use crate::value::Value;

/// Read side of message storage, independent of where a field physically lives.
///
/// `field` reports absent and explicitly null fields alike as `None`.
pub trait FieldAccess {
    fn field(&self, number: u32) -> Option<&Value>;

    /// Numbers of all present fields, ascending.
    fn present_fields(&self) -> Vec<u32>;

    fn message_id(&self) -> Option<&str> { None }
}

impl FieldAccess for MessageData {
    fn field(&self, number: u32) -> Option<&Value> { self.get(number).filter(|v| !v.is_null()) }

    fn present_fields(&self) -> Vec<u32> { MessageData::present_fields(self) }

    fn message_id(&self) -> Option<&str> { MessageData::message_id(self) }
}

/// A bare slot sequence read as a message: element `i` is field `i + 1`.
#[derive(Debug, Clone, Copy)]
pub struct SlotView<'a> {
    slots: &'a [Value],
}

impl<'a> SlotView<'a> {
    pub fn new(slots: &'a [Value]) -> Self { Self { slots } }
}

impl FieldAccess for SlotView<'_> {
    fn field(&self, number: u32) -> Option<&Value> {
        let idx = (number as usize).checked_sub(1)?;
        self.slots.get(idx).filter(|v| !v.is_null())
    }

    fn present_fields(&self) -> Vec<u32> {
        self.slots.iter().enumerate().filter(|(_, v)| !v.is_null()).map(|(i, _)| i as u32 + 1).collect()
    }
}

/// Message-shaped view over a value: a message, or a list standing in for one.
pub fn as_access(value: &Value) -> Option<Box<dyn FieldAccess + '_>> {
    match value {
        Value::Message(m) => Some(Box::new(&**m)),
        Value::List(l) => Some(Box::new(SlotView::new(l))),
        _ => None,
    }
}

impl<T: FieldAccess + ?Sized> FieldAccess for &T {
    fn field(&self, number: u32) -> Option<&Value> { (**self).field(number) }

    fn present_fields(&self) -> Vec<u32> { (**self).present_fields() }

    fn message_id(&self) -> Option<&str> { (**self).message_id() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reads_as_absent() {
        let m = MessageData::new().with(2, Value::Int(1)).unwrap();
        assert!(FieldAccess::field(&m, 1).is_none());
        assert_eq!(FieldAccess::field(&m, 2), Some(&Value::Int(1)));
        assert_eq!(FieldAccess::present_fields(&m), vec![2]);
    }

    #[test]
    fn slot_view_numbers_from_one() {
        let slots = [Value::Null, Value::from("b"), Value::Int(3)];
        let v = SlotView::new(&slots);
        assert!(v.field(0).is_none());
        assert!(v.field(1).is_none());
        assert_eq!(v.field(2), Some(&Value::from("b")));
        assert_eq!(v.present_fields(), vec![2, 3]);
        assert!(v.message_id().is_none());
    }

    #[test]
    fn lists_and_messages_are_message_shaped() {
        let list = Value::List(vec![Value::Int(1)]);
        assert_eq!(as_access(&list).unwrap().present_fields(), vec![1]);
        assert!(as_access(&Value::Int(1)).is_none());
    }
}
