//! Cross-Reference Fill
//!
//! Replaces null values in one column by joining the row's key against a
//! previously persisted reference dataset. The reference is advisory: if it
//! is absent, unreadable, or carries no recognizable key/value column pair,
//! nothing is filled and the pipeline continues.

use crate::error::Result;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One fill that actually happened, kept for auditability.
#[derive(Clone, Debug, Serialize)]
pub struct FillEvent {
    pub row: usize,
    pub column: String,
    pub key: String,
    pub value: String,
}

/// Fills a target column from a reference Parquet via keyed lookup.
pub struct CrossRefFiller {
    reference_path: PathBuf,
    key_aliases: Vec<String>,
    value_aliases: Vec<String>,
}

impl CrossRefFiller {
    pub fn new(reference_path: PathBuf, key_aliases: &[&str], value_aliases: &[&str]) -> Self {
        Self {
            reference_path,
            key_aliases: key_aliases.iter().map(|s| s.to_string()).collect(),
            value_aliases: value_aliases.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn reference_path(&self) -> &Path {
        &self.reference_path
    }

    /// Fill null `target` cells using the row's `key_col` value. Rows whose
    /// key has no mapping, or whose target is already set, stay unchanged.
    pub fn fill(&self, df: DataFrame, target: &str, key_col: &str) -> Result<(DataFrame, Vec<FillEvent>)> {
        let mapping = match self.load_mapping() {
            Some(m) if !m.is_empty() => m,
            _ => return Ok((df, Vec::new())),
        };

        let keys = match df.column(key_col).and_then(|s| s.cast(&DataType::String)) {
            Ok(s) => s,
            Err(_) => return Ok((df, Vec::new())),
        };
        let targets = match df.column(target).and_then(|s| s.cast(&DataType::String)) {
            Ok(s) => s,
            Err(_) => return Ok((df, Vec::new())),
        };

        let key_ca = keys.str()?;
        let target_ca = targets.str()?;

        let mut events = Vec::new();
        let mut filled: Vec<Option<String>> = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            let current = target_ca.get(idx);
            if current.is_some() {
                filled.push(current.map(|s| s.to_string()));
                continue;
            }
            let looked_up = key_ca.get(idx).and_then(|k| mapping.get(k).map(|v| (k, v)));
            match looked_up {
                Some((key, value)) => {
                    events.push(FillEvent {
                        row: idx,
                        column: target.to_string(),
                        key: key.to_string(),
                        value: value.clone(),
                    });
                    filled.push(Some(value.clone()));
                }
                None => filled.push(None),
            }
        }

        if events.is_empty() {
            return Ok((df, events));
        }

        let mut frame = df;
        frame.with_column(Series::new(target, filled))?;
        debug!(
            "filled {} null '{}' value(s) from {}",
            events.len(),
            target,
            self.reference_path.display()
        );
        Ok((frame, events))
    }

    /// Build the key → value map from the first recognized alias pair.
    /// Any failure here downgrades the fill to a no-op.
    fn load_mapping(&self) -> Option<HashMap<String, String>> {
        if !self.reference_path.exists() {
            debug!(
                "reference {} not found; skipping fill",
                self.reference_path.display()
            );
            return None;
        }

        let reference = match LazyFrame::scan_parquet(&self.reference_path, ScanArgsParquet::default())
            .and_then(|lf| lf.collect())
        {
            Ok(df) => df,
            Err(e) => {
                warn!(
                    "reference {} unreadable ({}); skipping fill",
                    self.reference_path.display(),
                    e
                );
                return None;
            }
        };

        let key_col = self.key_aliases.iter().find(|a| reference.column(a).is_ok())?;
        let value_col = self.value_aliases.iter().find(|a| reference.column(a).is_ok())?;

        let keys = reference.column(key_col).ok()?.cast(&DataType::String).ok()?;
        let values = reference.column(value_col).ok()?.cast(&DataType::String).ok()?;
        let key_ca = keys.str().ok()?;
        let value_ca = values.str().ok()?;

        let mut mapping = HashMap::new();
        for idx in 0..reference.height() {
            if let (Some(k), Some(v)) = (key_ca.get(idx), value_ca.get(idx)) {
                mapping.insert(k.to_string(), v.to_string());
            }
        }
        Some(mapping)
    }
}
