//! Canonical Dataset Schemas
//!
//! Every dataset kind has one ordered, typed column declaration. The
//! normalizer and the merge store both consume the same constant, so
//! in-memory batches and persisted files can never disagree on layout.

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Declared column types. Everything persisted is one of these three or null.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Int,
    Float,
}

impl ColumnType {
    pub fn to_dtype(self) -> DataType {
        match self {
            ColumnType::Text => DataType::String,
            ColumnType::Int => DataType::Int64,
            ColumnType::Float => DataType::Float64,
        }
    }
}

/// One declared column: name plus type. Order of declaration is the order
/// of the persisted file.
#[derive(Clone, Copy, Debug)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn text(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, ty: ColumnType::Text }
}

const fn int(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, ty: ColumnType::Int }
}

const fn float(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, ty: ColumnType::Float }
}

/// Roster rows: one player per team per week.
pub const ROSTER_COLUMNS: &[ColumnSpec] = &[
    text("team_key"),
    text("team_name"),
    text("player"),
    text("player_positions"),
    int("week"),
    text("team_position"),
    float("points"),
    text("player_id"),
    text("player_name"),
    text("player_status"),
    text("position_type"),
    text("eligible_positions"),
    text("selected_position"),
    text("player_full_name"),
    text("primary_position"),
    float("pass_yds"),
    float("pass_td"),
    float("interceptions"),
    float("rush_att"),
    float("rush_yds"),
    float("rush_td"),
    float("rec"),
    float("rec_yds"),
    float("rec_td"),
    float("targets"),
    float("fum_lost"),
    float("total_points"),
];

/// Standings rows: one team per league. Upstream fields beyond these are
/// passed through after the declared set.
pub const STANDINGS_COLUMNS: &[ColumnSpec] = &[
    int("Rank"),
    text("Team"),
    int("W"),
    int("L"),
    int("T"),
    float("WinPct"),
    float("PF"),
    float("PA"),
    text("Streak"),
];

/// The dataset kinds this engine persists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    Roster,
    Standings,
}

impl DatasetKind {
    pub fn columns(self) -> &'static [ColumnSpec] {
        match self {
            DatasetKind::Roster => ROSTER_COLUMNS,
            DatasetKind::Standings => STANDINGS_COLUMNS,
        }
    }

    /// Whether columns outside the declared set are kept (after the
    /// declared ones) instead of dropped.
    pub fn passthrough_extras(self) -> bool {
        matches!(self, DatasetKind::Standings)
    }

    /// File name of the persisted store for this kind.
    pub fn file_name(self) -> &'static str {
        match self {
            DatasetKind::Roster => "team_players.parquet",
            DatasetKind::Standings => "standings.parquet",
        }
    }
}

/// Look up a declared column by name.
pub fn find_column(columns: &[ColumnSpec], name: &str) -> Option<ColumnSpec> {
    columns.iter().copied().find(|c| c.name == name)
}

/// Zero-row frame carrying the declared columns with their declared dtypes.
pub fn empty_frame(columns: &[ColumnSpec]) -> Result<DataFrame> {
    let series: Vec<Series> = columns
        .iter()
        .map(|c| Series::new_empty(c.name, &c.ty.to_dtype()))
        .collect();
    Ok(DataFrame::new(series)?)
}
