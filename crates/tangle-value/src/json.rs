//! JSON interop for the plain subset of the value model.
//!
//! Serialization targets the attribute trees the graph layer persists:
//! scalars, arrays, string-keyed records, and dates (as ISO-8601 strings).
//! Identity-bearing kinds with no JSON shape are rejected by name rather
//! than silently lowered.

use crate::record::{RecordData, RecordKey};
use crate::value::{Kind, Value};
use thiserror::Error;

/// Failure to lower a value into JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonError {
    /// The value contains a kind with no JSON representation.
    #[error("{kind} values cannot be represented as JSON")]
    UnsupportedKind {
        /// The offending kind.
        kind: Kind,
    },
    /// The value graph is cyclic.
    #[error("cyclic value cannot be represented as JSON")]
    Cyclic,
}

/// Lower a value into JSON.
///
/// `Undefined` becomes `null` at the root and inside arrays and is dropped
/// from records; non-finite numbers become `null`; valid dates become
/// ISO-8601 strings and invalid ones `null`. Symbol-keyed record fields are
/// skipped.
pub fn to_json(value: &Value) -> Result<serde_json::Value, JsonError> {
    let mut trail = Vec::new();
    lower(value, &mut trail)
}

fn lower(value: &Value, trail: &mut Vec<usize>) -> Result<serde_json::Value, JsonError> {
    match value {
        Value::Undefined | Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Number(n) => Ok(lower_number(*n)),
        Value::String(s) => Ok(serde_json::Value::String(s.to_string())),
        Value::Date(d) => Ok(match d.read().to_iso_string() {
            Some(iso) => serde_json::Value::String(iso),
            None => serde_json::Value::Null,
        }),
        Value::Array(arr) => {
            enter(value, trail)?;
            let snapshot = arr.read().clone();
            let mut out = Vec::with_capacity(snapshot.len());
            for element in &snapshot {
                out.push(lower(element, trail)?);
            }
            trail.pop();
            Ok(serde_json::Value::Array(out))
        }
        Value::Record(rec) => {
            enter(value, trail)?;
            let entries = rec.read().own_entries();
            let mut out = serde_json::Map::new();
            for (key, field) in entries {
                let RecordKey::Str(name) = key else {
                    continue;
                };
                if matches!(field, Value::Undefined) {
                    continue;
                }
                out.insert(name.to_string(), lower(&field, trail)?);
            }
            trail.pop();
            Ok(serde_json::Value::Object(out))
        }
        other => Err(JsonError::UnsupportedKind { kind: other.kind() }),
    }
}

fn enter(value: &Value, trail: &mut Vec<usize>) -> Result<(), JsonError> {
    // Composite callers always have an identity.
    let id = value.identity().unwrap_or(0);
    if trail.contains(&id) {
        return Err(JsonError::Cyclic);
    }
    trail.push(id);
    Ok(())
}

fn lower_number(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return serde_json::Value::Number((n as i64).into());
    }
    match serde_json::Number::from_f64(n) {
        Some(num) => serde_json::Value::Number(num),
        None => serde_json::Value::Null,
    }
}

/// Lift JSON into the value model. Objects become records with string keys,
/// preserving member order.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::null(),
        serde_json::Value::Bool(b) => Value::bool(*b),
        serde_json::Value::Number(n) => Value::number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => {
            Value::array(items.iter().map(from_json).collect())
        }
        serde_json::Value::Object(members) => {
            let mut data = RecordData::new();
            for (key, member) in members {
                data.insert(RecordKey::from(key.as_str()), from_json(member));
            }
            Value::record(data)
        }
    }
}
