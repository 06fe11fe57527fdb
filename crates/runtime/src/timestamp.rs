//! `google.protobuf.Timestamp` conversions: field 1 holds seconds since the epoch (possibly as
//! an int64 string), field 2 the nanoseconds within that second.

use chrono::{DateTime, Utc};
use improto_core::ConsistencyError;
use improto_descriptor::DescriptorArgs;
use improto_store::{FieldAccess, MessageData, Value};

pub const TIMESTAMP_TYPE: &str = "google.protobuf.Timestamp";

/// INT64 seconds (1), INT32 nanos (2).
pub const TIMESTAMP_DESCRIPTOR: &str = "+^(^";

const SECONDS: u32 = 1;
const NANOS: u32 = 2;

pub fn timestamp_args() -> DescriptorArgs { DescriptorArgs::new(TIMESTAMP_DESCRIPTOR) }

pub fn to_datetime(ts: &dyn FieldAccess) -> Result<DateTime<Utc>, ConsistencyError> {
    let seconds = match ts.field(SECONDS) {
        None => 0,
        Some(Value::Int(i)) => *i,
        Some(Value::String(s)) => s.parse().map_err(|_| mismatch(SECONDS, "INT64", "non-numeric string"))?,
        Some(other) => return Err(mismatch(SECONDS, "INT64", other.kind())),
    };
    let nanos = match ts.field(NANOS) {
        None => 0,
        Some(Value::Int(i)) => u32::try_from(*i)
            .ok()
            .filter(|n| *n < 1_000_000_000)
            .ok_or_else(|| mismatch(NANOS, "INT32", "nanos outside 0..1e9"))?,
        Some(other) => return Err(mismatch(NANOS, "INT32", other.kind())),
    };
    DateTime::from_timestamp(seconds, nanos).ok_or_else(|| mismatch(SECONDS, "INT64", "seconds outside the supported range"))
}

/// Zero seconds or nanos stay unset.
pub fn from_datetime(dt: &DateTime<Utc>) -> Result<MessageData, ConsistencyError> {
    let mut data = MessageData::new();
    let (seconds, nanos) = (dt.timestamp(), dt.timestamp_subsec_nanos());
    if seconds != 0 {
        data.set(SECONDS, seconds)?;
    }
    if nanos != 0 {
        data.set(NANOS, nanos)?;
    }
    Ok(data)
}

fn mismatch(number: u32, field_type: &'static str, found: &'static str) -> ConsistencyError {
    ConsistencyError::TypeMismatch { number, field_type, found }
}
