//! Immutable field-value snapshots and value comparison.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::NumericEquality;
use crate::error::DispatchError;

/// Field name to value mapping captured at one point of a record's lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    fields: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from a JSON object.
    ///
    /// # Arguments
    /// * `value` - JSON value, must be an object
    /// * `which` - Label used in the error (`"old"`, `"new"`, ...)
    ///
    /// # Returns
    /// `Err(DispatchError::InvalidSnapshot)` for `null` or any non-object value.
    pub fn from_json(value: Value, which: &'static str) -> Result<Self, DispatchError> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            Value::Null => Err(DispatchError::missing_snapshot(which)),
            other => Err(DispatchError::InvalidSnapshot {
                which,
                reason: format!("expected object, got {}", value_type(&other)),
            }),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a copy with `field` set to `value`.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub(crate) fn insert(&mut self, field: String, value: Value) {
        self.fields.insert(field, value);
    }

    /// Converts back into a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<BTreeMap<String, Value>> for Snapshot {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for Snapshot {
    type Error = DispatchError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Snapshot::from_json(value, "input")
    }
}

/// Returns a string representation of a JSON value's type.
fn value_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Compares two values: structurally for arrays and objects, by value for scalars.
pub fn values_equal(a: &Value, b: &Value, numeric: NumericEquality) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match numeric {
            NumericEquality::Strict => x == y,
            NumericEquality::Loose => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => x == y,
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y, numeric))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(key, xv)| {
                    y.get(key)
                        .map(|yv| values_equal(xv, yv, numeric))
                        .unwrap_or(false)
                })
        }
        _ => a == b,
    }
}
