#![forbid(unsafe_code)]

use improto_runtime::{combine, hash, hash_message, hash_string};
use improto_store::{JspbLayout, MessageData, Value};
use serde_json::json;

fn fields() -> Vec<(u32, Value)> {
    vec![
        (1, Value::from("alpha")),
        (2, Value::Int(-7)),
        (3, Value::Bool(false)),
        (5, Value::List(vec![Value::Int(1), Value::Null, Value::Float(2.5)])),
        (8, MessageData::new().with(2, "nested").unwrap().into()),
        (40, Value::Float(-0.75)),
        (1000, Value::Int(i32::MAX as i64)),
    ]
}

fn build(pivot: u32) -> MessageData {
    let mut m = MessageData::with_pivot(pivot);
    for (n, v) in fields() {
        m.set(n, v).unwrap();
    }
    m
}

#[test]
fn hash_does_not_depend_on_the_pivot() {
    let reference = hash_message(&build(u32::MAX));
    for pivot in [1, 2, 3, 4, 5, 8, 9, 40, 41, 999, 1000, 1001] {
        assert_eq!(hash_message(&build(pivot)), reference, "pivot {pivot}");
    }
}

#[test]
fn each_field_hashes_the_same_in_either_region() {
    for (n, v) in fields() {
        let positional = MessageData::new().with(n, v.clone()).unwrap();
        let spilled = MessageData::with_pivot(n).with(n, v).unwrap();
        assert!(spilled.slots().is_empty());
        assert_eq!(hash_message(&positional), hash_message(&spilled), "field {n}");
    }
}

#[test]
fn jspb_layouts_hash_alike() {
    let a = MessageData::from_jspb(&json!([1, "two", null, {"4": true, "$meta": "skipped"}]), JspbLayout::default()).unwrap();
    let b = MessageData::from_jspb(&json!([1, "two", null, true]), JspbLayout::default()).unwrap();
    assert_eq!(hash_message(&a), hash_message(&b));
}

#[test]
fn message_and_list_with_same_slots_agree() {
    let m = MessageData::new().with(1, 3).unwrap().with(3, "x").unwrap();
    let l = Value::List(vec![Value::Int(3), Value::Null, Value::from("x")]);
    assert_eq!(hash_message(&m), hash(&l));
}

#[test]
fn determinism_and_sanity() {
    let v = Value::from(build(3));
    assert_eq!(hash(&v), hash(&v));
    assert_ne!(hash(&Value::Bool(true)), hash(&Value::Bool(false)));
    assert_eq!(combine(&Value::List(vec![]), 99), 99);
    assert_eq!(hash_string("foo"), hash_string("foo"));
    assert_ne!(hash_string("foo"), hash_string("bar"));
    assert_eq!(hash(&Value::from("foo")), 131365);
}

#[test]
fn max_int_wraps() {
    let h = hash(&Value::List(vec![Value::Int(i32::MAX as i64), Value::Int(20)]));
    assert_eq!(h, -2147483645);
}

#[test]
fn message_id_contributes() {
    let mut a = MessageData::new().with(1, 1).unwrap();
    let b = a.clone();
    a.set_message_id(Some("id".into()));
    assert_ne!(hash_message(&a), hash_message(&b));
    let expected = combine(&Value::Int(1), hash_string("id"));
    assert_eq!(hash_message(&a), expected);
}
