//! 32-bit structural hash over message storage.
//!
//! Every value folds into the accumulator as `h = 17 * h + contribution`, wrapping as a signed
//! 32-bit integer. Spilled fields fold in ascending field number order after the slots, which is
//! exactly the order they would have had as trailing slots, so the result does not depend on the
//! pivot. Nulls contribute nothing.

use improto_store::{MessageData, Value};

const MULTIPLIER: i32 = 17;
const TRUE_CONTRIBUTION: i32 = 1;
const FALSE_CONTRIBUTION: i32 = 3;

pub fn hash(value: &Value) -> i32 { combine(value, 0) }

pub fn hash_message(data: &MessageData) -> i32 { fold_message(data, 0) }

/// Fold `value` into `current`.
pub fn combine(value: &Value, current: i32) -> i32 {
    match value {
        Value::Null => current,
        Value::Bool(b) => fold_i32(if *b { TRUE_CONTRIBUTION } else { FALSE_CONTRIBUTION }, current),
        Value::Int(i) => fold_i64(*i, current),
        Value::Float(f) => fold_f64(*f, current),
        Value::String(s) => fold_i32(hash_string(s), current),
        Value::List(items) => items.iter().fold(current, |h, v| combine(v, h)),
        Value::Message(m) => fold_message(m, current),
    }
}

fn fold_message(data: &MessageData, current: i32) -> i32 {
    let mut h = current;
    if let Some(id) = data.message_id() {
        h = fold_i32(hash_string(id), h);
    }
    h = data.slots().iter().fold(h, |h, v| combine(v, h));
    if let Some(spill) = data.spill() {
        // bookkeeping entries live outside `fields()` and never fold
        h = spill.fields().fold(h, |h, (_, v)| combine(v, h));
    }
    h
}

fn fold_i32(v: i32, current: i32) -> i32 { MULTIPLIER.wrapping_mul(current).wrapping_add(v) }

fn fold_i64(v: i64, current: i32) -> i32 { (MULTIPLIER as i64).wrapping_mul(current as i64).wrapping_add(v) as i32 }

fn fold_f64(v: f64, current: i32) -> i32 { to_int32(MULTIPLIER as f64 * current as f64 + v) }

/// ECMAScript ToInt32: truncate, reduce modulo 2^32, reinterpret as signed.
fn to_int32(v: f64) -> i32 {
    if !v.is_finite() {
        return 0;
    }
    let m = v.trunc().rem_euclid(4_294_967_296.0);
    m as u32 as i32
}

/// Polynomial string hash (seed 1, multiplier 31) over UTF-16 code units, four units per step
/// while more than four remain, then one at a time.
pub fn hash_string(s: &str) -> i32 {
    let units: Vec<u16> = s.encode_utf16().collect();
    let step = |h: i32, u: u16| (u as i32).wrapping_add(h.wrapping_mul(31));
    let mut h: i32 = 1;
    let mut i = 0;
    while i + 4 < units.len() {
        h = step(h, units[i]);
        h = step(h, units[i + 1]);
        h = step(h, units[i + 2]);
        h = step(h, units[i + 3]);
        i += 4;
    }
    units[i..].iter().fold(h, |h, u| step(h, *u))
}
