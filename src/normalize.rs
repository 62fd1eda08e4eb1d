//! Schema Normalizer
//!
//! Forces any table-shaped batch onto the declared column set and types so
//! tables produced by independent runs can always be unioned. Normalizing is
//! idempotent: applying it to its own output changes nothing.
//!
//! Steps, in order:
//! 1. Add declared columns absent from the batch as all-null columns.
//! 2. Give all-null (untyped) columns their declared dtype, even at zero rows.
//! 3. Materialize composite values: sequences become comma-joined strings.
//! 4. Cast every declared column non-strictly; uncoercible cells become null
//!    and are recorded in the batch diagnostics.
//! 5. Select exactly the declared columns in declared order (the standings
//!    kind keeps upstream extras after the declared set).

use crate::error::Result;
use crate::record::{coerce_float, coerce_int, coerce_text};
use crate::schema::{empty_frame, ColumnSpec, ColumnType, DatasetKind};
use itertools::Itertools;
use polars::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A canonical table plus whatever was noted while conforming it.
#[derive(Clone, Debug)]
pub struct NormalizedBatch {
    pub frame: DataFrame,
    pub diagnostics: Vec<String>,
}

/// Normalizer for one dataset kind. Stateless apart from the declaration.
#[derive(Clone, Copy, Debug)]
pub struct SchemaNormalizer {
    kind: DatasetKind,
}

impl SchemaNormalizer {
    pub fn new(kind: DatasetKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Zero-row canonical table for this kind.
    pub fn empty(&self) -> Result<DataFrame> {
        empty_frame(self.kind.columns())
    }

    /// Columnarize extracted rows and conform the result.
    ///
    /// Cells are coerced per the declared type while building each column;
    /// a cell that resists coercion nulls itself and is counted in the
    /// diagnostics, never aborting the row or the batch.
    pub fn rows_to_frame(&self, rows: &[Map<String, Value>]) -> Result<NormalizedBatch> {
        let columns = self.kind.columns();
        let mut series = Vec::with_capacity(columns.len());
        let mut diagnostics = Vec::new();

        for spec in columns {
            series.push(build_declared_column(spec, rows, &mut diagnostics));
        }

        if self.kind.passthrough_extras() {
            let declared: HashSet<&str> = columns.iter().map(|c| c.name).collect();
            for name in extra_keys(rows, &declared) {
                series.push(build_extra_column(&name, rows));
            }
        }

        let frame = DataFrame::new(series)?;
        let mut batch = self.normalize(frame)?;
        let mut merged = diagnostics;
        merged.append(&mut batch.diagnostics);
        Ok(NormalizedBatch { frame: batch.frame, diagnostics: merged })
    }

    /// Conform an arbitrary frame (e.g. legacy persisted data) to the
    /// declared schema.
    pub fn normalize(&self, df: DataFrame) -> Result<NormalizedBatch> {
        let columns = self.kind.columns();
        let height = df.height();
        let mut diagnostics = Vec::new();
        let mut frame = df;

        for spec in columns {
            if frame.column(spec.name).is_err() {
                let series = Series::full_null(spec.name, height, &spec.ty.to_dtype());
                frame.with_column(series)?;
            }
        }

        for spec in columns {
            let current = frame.column(spec.name)?.clone();
            let rebuilt = conform_declared(&current, spec, height, &mut diagnostics);
            frame.with_column(rebuilt)?;
        }

        let declared: HashSet<&str> = columns.iter().map(|c| c.name).collect();
        let extra_names: Vec<String> = frame
            .get_column_names()
            .iter()
            .filter(|n| !declared.contains(*n))
            .map(|n| n.to_string())
            .collect();

        let mut order: Vec<String> = columns.iter().map(|c| c.name.to_string()).collect();
        if self.kind.passthrough_extras() {
            for name in &extra_names {
                let current = frame.column(name)?.clone();
                if let Some(rebuilt) = conform_extra(&current, height) {
                    frame.with_column(rebuilt)?;
                }
            }
            order.extend(extra_names);
        }

        let frame = frame.select(order)?;
        Ok(NormalizedBatch { frame, diagnostics })
    }
}

/// Conform one declared column: assign the declared dtype to untyped
/// columns, join sequences, cast non-strictly.
fn conform_declared(
    series: &Series,
    spec: &ColumnSpec,
    height: usize,
    diagnostics: &mut Vec<String>,
) -> Series {
    let dtype = spec.ty.to_dtype();

    if series.dtype() == &DataType::Null {
        return Series::full_null(spec.name, height, &dtype);
    }

    let series = if matches!(series.dtype(), DataType::List(_)) {
        match materialize_list(series, spec.name) {
            Ok(joined) => joined,
            Err(e) => {
                diagnostics.push(format!(
                    "column '{}': could not materialize sequence values ({}); column nulled",
                    spec.name, e
                ));
                return Series::full_null(spec.name, height, &dtype);
            }
        }
    } else {
        series.clone()
    };

    if series.dtype() == &dtype {
        return series;
    }

    let before = series.null_count();
    match series.cast(&dtype) {
        Ok(cast) => {
            let after = cast.null_count();
            if after > before {
                diagnostics.push(format!(
                    "column '{}': {} value(s) not coercible to {:?}; set to null",
                    spec.name,
                    after - before,
                    dtype
                ));
            }
            cast
        }
        Err(e) => {
            diagnostics.push(format!(
                "column '{}': cast to {:?} failed ({}); column nulled",
                spec.name, dtype, e
            ));
            Series::full_null(spec.name, height, &dtype)
        }
    }
}

/// Passthrough columns keep their inferred dtype; only untyped and
/// sequence-valued ones need conforming so the file stays self-describing.
fn conform_extra(series: &Series, height: usize) -> Option<Series> {
    if series.dtype() == &DataType::Null {
        return Some(Series::full_null(series.name(), height, &DataType::String));
    }
    if matches!(series.dtype(), DataType::List(_)) {
        return materialize_list(series, series.name()).ok();
    }
    None
}

fn materialize_list(series: &Series, name: &str) -> PolarsResult<Series> {
    let ca = series.list()?;
    let joined: Vec<Option<String>> = ca
        .into_iter()
        .map(|item| item.map(|inner| join_elements(&inner)))
        .collect();
    Ok(Series::new(name, joined))
}

fn join_elements(inner: &Series) -> String {
    inner.iter().map(element_text).join(",")
}

fn element_text(av: AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn build_declared_column(
    spec: &ColumnSpec,
    rows: &[Map<String, Value>],
    diagnostics: &mut Vec<String>,
) -> Series {
    let mut failed = 0usize;
    let series = match spec.ty {
        ColumnType::Text => {
            let values: Vec<Option<String>> = rows
                .iter()
                .map(|row| row.get(spec.name).and_then(text_cell))
                .collect();
            Series::new(spec.name, values)
        }
        ColumnType::Int => {
            let values: Vec<Option<i64>> = rows
                .iter()
                .map(|row| coerce_cell(row.get(spec.name), coerce_int, &mut failed))
                .collect();
            Series::new(spec.name, values)
        }
        ColumnType::Float => {
            let values: Vec<Option<f64>> = rows
                .iter()
                .map(|row| coerce_cell(row.get(spec.name), coerce_float, &mut failed))
                .collect();
            Series::new(spec.name, values)
        }
    };
    if failed > 0 {
        diagnostics.push(format!(
            "column '{}': {} value(s) not coercible to {:?}; set to null",
            spec.name, failed, spec.ty
        ));
    }
    series
}

fn coerce_cell<T>(
    cell: Option<&Value>,
    coerce: fn(&Value) -> Option<T>,
    failed: &mut usize,
) -> Option<T> {
    let value = cell?;
    if value.is_null() {
        return None;
    }
    let coerced = coerce(value);
    if coerced.is_none() {
        *failed += 1;
    }
    coerced
}

/// Text cells stringify scalars and comma-join sequences.
fn text_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| coerce_text(v).unwrap_or_default())
                .join(","),
        ),
        other => coerce_text(other),
    }
}

fn extra_keys(rows: &[Map<String, Value>], declared: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !declared.contains(key.as_str()) && seen.insert(key.clone()) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

/// Extras get a minimal scalar inference: all-int, else all-float, else text.
fn build_extra_column(name: &str, rows: &[Map<String, Value>]) -> Series {
    let cells: Vec<Option<&Value>> = rows
        .iter()
        .map(|row| row.get(name).filter(|v| !v.is_null()))
        .collect();

    let all_int = cells
        .iter()
        .flatten()
        .all(|v| coerce_int(v).is_some());
    if all_int && cells.iter().any(|c| c.is_some()) {
        let values: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(coerce_int)).collect();
        return Series::new(name, values);
    }

    let all_float = cells
        .iter()
        .flatten()
        .all(|v| coerce_float(v).is_some());
    if all_float && cells.iter().any(|c| c.is_some()) {
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(coerce_float)).collect();
        return Series::new(name, values);
    }

    let values: Vec<Option<String>> = cells.iter().map(|c| c.and_then(text_cell)).collect();
    Series::new(name, values)
}
