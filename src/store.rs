//! Incremental Merge Store
//!
//! The only stateful stage. Reads whatever was previously persisted for a
//! dataset kind, normalizes both sides, unions existing-then-new, and
//! replaces the file atomically with respect to that single write. A
//! corrupt existing file aborts the merge before anything is written;
//! continuing would silently discard prior history. Post-write validation
//! is advisory only.

use crate::error::{EtlError, Result};
use crate::normalize::SchemaNormalizer;
use crate::schema::DatasetKind;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of one store write: row counts, the resulting column list, and
/// whatever the normalizer noted on either side.
#[derive(Clone, Debug, Serialize)]
pub struct WriteReport {
    pub rows_written: usize,
    pub rows_total: usize,
    pub columns: Vec<String>,
    pub diagnostics: Vec<String>,
    pub validated: bool,
}

/// Persisted canonical table for one dataset kind. Single-writer by
/// convention; no locking (see the concurrency notes in DESIGN.md).
pub struct MergeStore {
    path: PathBuf,
    normalizer: SchemaNormalizer,
}

impl MergeStore {
    pub fn new(path: PathBuf, kind: DatasetKind) -> Self {
        Self {
            path,
            normalizer: SchemaNormalizer::new(kind),
        }
    }

    /// Store rooted in `data_dir` at the kind's fixed file name.
    pub fn in_dir(data_dir: &Path, kind: DatasetKind) -> Self {
        Self::new(data_dir.join(kind.file_name()), kind)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DatasetKind {
        self.normalizer.kind()
    }

    /// Union `new_rows` onto the persisted table.
    ///
    /// Existing rows keep their persisted order and come first; new rows
    /// follow in batch order. No deduplication happens here: reprocessing
    /// the same upstream entity accumulates duplicate rows by design, and
    /// elimination is the caller's responsibility.
    pub fn append(&self, new_rows: DataFrame) -> Result<WriteReport> {
        let existing = self.read_existing()?;
        let mut existing = self.normalizer.normalize(existing)?;
        let mut incoming = self.normalizer.normalize(new_rows)?;

        let (existing_frame, incoming_frame) = align_frames(existing.frame, incoming.frame)?;
        let rows_written = incoming_frame.height();
        let combined = existing_frame.vstack(&incoming_frame)?;

        self.write_atomic(&combined)?;
        let validated = self.validate_written();

        let mut diagnostics = Vec::new();
        diagnostics.append(&mut existing.diagnostics);
        diagnostics.append(&mut incoming.diagnostics);

        info!(
            "appended {} row(s) to {} ({} total)",
            rows_written,
            self.path.display(),
            combined.height()
        );
        Ok(WriteReport {
            rows_written,
            rows_total: combined.height(),
            columns: column_names(&combined),
            diagnostics,
            validated,
        })
    }

    /// Replace the persisted table wholesale, normalizing first. Used by
    /// dataset kinds that are rebuilt from scratch each run.
    pub fn replace(&self, rows: DataFrame) -> Result<WriteReport> {
        let batch = self.normalizer.normalize(rows)?;
        self.write_atomic(&batch.frame)?;
        let validated = self.validate_written();

        info!(
            "replaced {} with {} row(s)",
            self.path.display(),
            batch.frame.height()
        );
        Ok(WriteReport {
            rows_written: batch.frame.height(),
            rows_total: batch.frame.height(),
            columns: column_names(&batch.frame),
            diagnostics: batch.diagnostics,
            validated,
        })
    }

    /// Absent file yields the empty canonical table. An unreadable file is
    /// the one failure that must surface: the merge aborts unwritten.
    fn read_existing(&self) -> Result<DataFrame> {
        if !self.path.exists() {
            return self.normalizer.empty();
        }
        LazyFrame::scan_parquet(&self.path, ScanArgsParquet::default())
            .and_then(|lf| lf.collect())
            .map_err(|e| {
                EtlError::PersistenceRead(format!(
                    "existing store {} is unreadable: {}",
                    self.path.display(),
                    e
                ))
            })
    }

    fn write_atomic(&self, df: &DataFrame) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                EtlError::PersistenceWrite(format!(
                    "failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let tmp_path = self.path.with_extension("parquet.tmp");
        let mut file = fs::File::create(&tmp_path).map_err(|e| {
            EtlError::PersistenceWrite(format!(
                "failed to create {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        ParquetWriter::new(&mut file)
            .finish(&mut df.clone())
            .map_err(|e| {
                EtlError::PersistenceWrite(format!(
                    "failed to write {}: {}",
                    tmp_path.display(),
                    e
                ))
            })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            EtlError::PersistenceWrite(format!(
                "failed to move {} into place: {}",
                tmp_path.display(),
                e
            ))
        })
    }

    /// Re-open the just-written file and report its column list. The write
    /// itself is authoritative; a failure here is logged, not returned.
    fn validate_written(&self) -> bool {
        match LazyFrame::scan_parquet(&self.path, ScanArgsParquet::default())
            .and_then(|lf| lf.collect())
        {
            Ok(df) => {
                info!(
                    "post-write validation of {}: {} row(s), columns [{}]",
                    self.path.display(),
                    df.height(),
                    column_names(&df).join(", ")
                );
                true
            }
            Err(e) => {
                warn!(
                    "post-write validation of {} failed: {}",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Give both sides the union of their columns so passthrough extras from
/// either side survive the union. The existing side's order and dtypes win
/// for shared columns.
fn align_frames(existing: DataFrame, incoming: DataFrame) -> Result<(DataFrame, DataFrame)> {
    let existing_names = column_names(&existing);
    let incoming_names = column_names(&incoming);
    let existing_set: HashSet<&String> = existing_names.iter().collect();
    let incoming_set: HashSet<&String> = incoming_names.iter().collect();

    let mut existing = existing;
    let mut incoming = incoming;

    for name in &incoming_names {
        if !existing_set.contains(name) {
            let dtype = incoming.column(name)?.dtype().clone();
            let series = Series::full_null(name, existing.height(), &dtype);
            existing.with_column(series)?;
        }
    }
    for name in &existing_names {
        if !incoming_set.contains(name) {
            let dtype = existing.column(name)?.dtype().clone();
            let series = Series::full_null(name, incoming.height(), &dtype);
            incoming.with_column(series)?;
        }
    }

    // shared columns follow the existing side's dtype
    for name in &existing_names {
        if incoming_set.contains(name) {
            let want = existing.column(name)?.dtype().clone();
            let have = incoming.column(name)?.dtype().clone();
            if want != have {
                let cast = incoming.column(name)?.cast(&want)?;
                incoming.with_column(cast)?;
            }
        }
    }

    let order = column_names(&existing);
    let incoming = incoming.select(order)?;
    Ok((existing, incoming))
}
