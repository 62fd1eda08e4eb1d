//! Record Handling - classification, alias extraction, composite flattening
//!
//! Raw provider items arrive in whatever shape the upstream produced. This
//! module classifies them, resolves canonical fields through ordered alias
//! lists, and flattens the two known composite shapes into flat scalars.

pub mod extract;
pub mod flatten;
pub mod raw;

pub use extract::{extract_record, lookup_alias, ExtractedRow, ExtractorSpec, FieldAliases};
pub use flatten::{flatten_outcome_totals, flatten_streak, OutcomeTotals};
pub use raw::RawRecord;

use serde_json::Value;

/// Best-effort integer coercion. Numeric strings are accepted; floats with a
/// fractional part are rejected rather than truncated.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        }
        _ => None,
    }
}

/// Best-effort float coercion. Numeric strings are accepted.
pub fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Scalar stringification used for text cells and joined sequence elements.
/// Objects fall back to their JSON serialization.
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
