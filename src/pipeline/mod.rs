//! Run Orchestration
//!
//! Wires the stages together, strictly in sequence: extract → flatten →
//! enrich → batch → normalize → fill → merge. One run report per store
//! write; everything a caller sees about a run is in the report.

pub mod roster;
pub mod standings;

pub use roster::{RosterPipeline, RowBatch, TeamContext};
pub use standings::StandingsPipeline;

use crate::fill::FillEvent;
use crate::schema::DatasetKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one pipeline run: counts, the resulting schema, batch
/// diagnostics, and per-row fill provenance.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub dataset: DatasetKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows_written: usize,
    pub rows_total: usize,
    pub columns: Vec<String>,
    pub diagnostics: Vec<String>,
    pub fills: Vec<FillEvent>,
    pub validated: bool,
}
