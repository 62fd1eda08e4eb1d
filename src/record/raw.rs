//! Raw Record Classification
//!
//! One upstream item can be a keyed object, a positional array, a bare
//! identifier, or something unrecognizable. Classification happens once,
//! up front, so every later stage matches exhaustively on the variant
//! instead of re-probing the value's shape.

use serde_json::{Map, Value};

/// One semi-structured upstream item. Ephemeral; exists only during
/// extraction.
#[derive(Clone, Debug, PartialEq)]
pub enum RawRecord {
    /// Key/value mapping; canonical fields resolve through alias lookups.
    Mapping(Map<String, Value>),
    /// Ordered sequence; meaningful only to the composite flatteners.
    Sequence(Vec<Value>),
    /// Bare scalar identifier (string or number).
    Scalar(String),
    /// Anything else. Carried verbatim so a serialized fallback survives.
    Opaque(Value),
}

impl RawRecord {
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Object(map) => RawRecord::Mapping(map),
            Value::Array(items) => RawRecord::Sequence(items),
            Value::String(s) => RawRecord::Scalar(s),
            Value::Number(n) => RawRecord::Scalar(n.to_string()),
            other => RawRecord::Opaque(other),
        }
    }

    /// Serialized form used when no structured reading is possible.
    pub fn serialized(&self) -> String {
        match self {
            RawRecord::Mapping(map) => Value::Object(map.clone()).to_string(),
            RawRecord::Sequence(items) => Value::Array(items.clone()).to_string(),
            RawRecord::Scalar(s) => s.clone(),
            RawRecord::Opaque(v) => v.to_string(),
        }
    }
}
