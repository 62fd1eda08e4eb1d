//! Composite Field Flattening
//!
//! The provider nests two shapes that downstream tools cannot query
//! directly: the win/loss streak and the outcome totals block. Both are
//! decoded into flat scalars here. A value that fails coercion nulls that
//! field only; the row always survives.

use crate::record::{coerce_float, coerce_int, coerce_text};
use serde_json::Value;

/// Decode a streak composite into its compact string form.
///
/// Accepts a `(kind, length)` pair or a mapping with `type`/`value` keys.
/// `win`/`loss` kinds compress to `W`/`L` case-insensitively; any other
/// kind passes through unchanged. A missing or non-numeric length yields an
/// empty suffix.
pub fn flatten_streak(value: &Value) -> Option<String> {
    let (kind, length) = match value {
        Value::Array(items) => (
            items.first().and_then(coerce_text),
            items.get(1).and_then(streak_length),
        ),
        Value::Object(map) => (
            map.get("type").and_then(coerce_text),
            map.get("value").and_then(streak_length),
        ),
        _ => return None,
    };

    let prefix = match kind {
        Some(k) if k.eq_ignore_ascii_case("win") => "W".to_string(),
        Some(k) if k.eq_ignore_ascii_case("loss") => "L".to_string(),
        Some(k) => k,
        None => String::new(),
    };
    let suffix = length.map(|n| n.to_string()).unwrap_or_default();
    Some(format!("{}{}", prefix, suffix))
}

fn streak_length(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => s.parse().ok(),
        _ => None,
    }
}

/// Decoded outcome totals. A field that failed coercion is null.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutcomeTotals {
    pub wins: Option<i64>,
    pub losses: Option<i64>,
    pub ties: Option<i64>,
    pub percentage: Option<f64>,
}

/// Decode an outcome-totals composite.
///
/// Accepts a mapping with `wins`/`losses`/`ties`/`percentage` keys or a
/// 4-element sequence in that position order.
pub fn flatten_outcome_totals(value: &Value) -> Option<OutcomeTotals> {
    match value {
        Value::Object(map) => Some(OutcomeTotals {
            wins: map.get("wins").and_then(coerce_int),
            losses: map.get("losses").and_then(coerce_int),
            ties: map.get("ties").and_then(coerce_int),
            percentage: map.get("percentage").and_then(coerce_float),
        }),
        Value::Array(items) => Some(OutcomeTotals {
            wins: items.first().and_then(coerce_int),
            losses: items.get(1).and_then(coerce_int),
            ties: items.get(2).and_then(coerce_int),
            percentage: items.get(3).and_then(coerce_float),
        }),
        _ => None,
    }
}
