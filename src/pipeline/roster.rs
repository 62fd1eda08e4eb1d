//! Roster Pipeline
//!
//! Flattens per-team roster payloads into canonical player rows, enriches
//! each row through the stats provider, fills missing team names from the
//! standings reference, and appends the batch to the roster store.
//! Everything proceeds record-by-record in sequence; a failure on one
//! record degrades that record, never the batch.

use crate::enrich::{EnrichmentCache, StatGranularity, StatsProvider};
use crate::fill::CrossRefFiller;
use crate::normalize::SchemaNormalizer;
use crate::pipeline::RunReport;
use crate::record::extract::{extract_record, lookup_alias, ExtractorSpec, FieldAliases, FieldOutcome};
use crate::record::{coerce_int, coerce_text, RawRecord};
use crate::schema::DatasetKind;
use crate::source::RecordSource;
use crate::store::MergeStore;
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Alias table for one roster item. Order is preference order.
const ROSTER_FIELDS: &[FieldAliases] = &[
    FieldAliases {
        field: "player",
        aliases: &["player_key", "playerKey", "player_id", "id", "name", "full_name", "player_name"],
    },
    FieldAliases {
        field: "player_positions",
        aliases: &["eligible_positions", "positions", "position"],
    },
    FieldAliases { field: "week", aliases: &["week", "week_number"] },
    FieldAliases {
        field: "team_position",
        aliases: &["selected_position", "lineup_position", "slot"],
    },
    FieldAliases {
        field: "points",
        aliases: &["points", "projected_points", "season_points"],
    },
    FieldAliases {
        field: "player_id",
        aliases: &["player_key", "playerKey", "player_id", "id"],
    },
    FieldAliases {
        field: "player_name",
        aliases: &["name", "full_name", "player_name"],
    },
    FieldAliases { field: "player_status", aliases: &["status", "injury_status"] },
    FieldAliases { field: "position_type", aliases: &["position_type"] },
    FieldAliases {
        field: "eligible_positions",
        aliases: &["eligible_positions", "positions", "position"],
    },
    FieldAliases {
        field: "selected_position",
        aliases: &["selected_position", "selectedPos"],
    },
];

/// A bare scalar roster item is a player key; anything unrecognizable keeps
/// its serialized form in the same field.
const ROSTER_EXTRACTOR: ExtractorSpec = ExtractorSpec {
    fields: ROSTER_FIELDS,
    identity_field: "player",
    raw_field: "player",
};

const ENVELOPE_TEAM_KEY: &[&str] = &["team_key", "teamKey"];
const ENVELOPE_TEAM_NAME: &[&str] = &["name", "team_name", "Team"];
const ENVELOPE_WEEK: &[&str] = &["week", "current_week"];
const ENVELOPE_ROSTER: &[&str] = &["roster", "players"];

/// The team a batch of roster items belongs to.
#[derive(Clone, Debug, Default)]
pub struct TeamContext {
    pub team_key: Option<String>,
    pub team_name: Option<String>,
    pub week: Option<i64>,
}

impl TeamContext {
    /// Read team identity from a roster envelope. Non-mapping envelopes
    /// yield an empty context; their roster is empty anyway.
    pub fn from_envelope(envelope: &Value) -> Self {
        let map = match envelope {
            Value::Object(map) => map,
            _ => return Self::default(),
        };
        let text = |aliases| match lookup_alias(map, aliases) {
            FieldOutcome::Found { value, .. } => value.as_str().map(|s| s.to_string()),
            FieldOutcome::Missing => None,
        };
        let week = match lookup_alias(map, ENVELOPE_WEEK) {
            FieldOutcome::Found { value, .. } => coerce_int(value),
            FieldOutcome::Missing => None,
        };
        Self {
            team_key: text(ENVELOPE_TEAM_KEY),
            team_name: text(ENVELOPE_TEAM_NAME),
            week,
        }
    }

    fn roster_items(envelope: &Value) -> Vec<Value> {
        let map = match envelope {
            Value::Object(map) => map,
            _ => return Vec::new(),
        };
        match lookup_alias(map, ENVELOPE_ROSTER) {
            FieldOutcome::Found { value: Value::Array(items), .. } => items.clone(),
            _ => Vec::new(),
        }
    }
}

/// Rows flattened from one or more rosters, plus extraction notes destined
/// for the run diagnostics.
#[derive(Clone, Debug, Default)]
pub struct RowBatch {
    pub rows: Vec<Map<String, Value>>,
    pub notes: Vec<String>,
}

pub struct RosterPipeline {
    store: MergeStore,
    filler: CrossRefFiller,
    normalizer: SchemaNormalizer,
}

impl RosterPipeline {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            store: MergeStore::in_dir(data_dir, DatasetKind::Roster),
            filler: CrossRefFiller::new(
                data_dir.join(DatasetKind::Standings.file_name()),
                &["team_key", "teamKey"],
                &["Team", "name", "team_name"],
            ),
            normalizer: SchemaNormalizer::new(DatasetKind::Roster),
        }
    }

    pub fn store(&self) -> &MergeStore {
        &self.store
    }

    /// Flatten one team's roster items into canonical row cells, enriching
    /// each player when a provider is available.
    pub fn roster_rows(
        &self,
        team: &TeamContext,
        roster: &[Value],
        provider: Option<&dyn StatsProvider>,
        cache: &mut EnrichmentCache,
    ) -> RowBatch {
        let mut batch = RowBatch::default();

        for item in roster {
            let record = RawRecord::classify(item.clone());
            let mut extracted = extract_record(&ROSTER_EXTRACTOR, &record);
            batch.notes.append(&mut extracted.notes);
            let cells = &mut extracted.cells;

            if let Some(key) = &team.team_key {
                cells.insert("team_key".to_string(), Value::String(key.clone()));
            }
            if let Some(name) = &team.team_name {
                cells.insert("team_name".to_string(), Value::String(name.clone()));
            }
            let week = cells
                .get("week")
                .and_then(coerce_int)
                .or(team.week);
            if let Some(week) = week {
                cells.insert("week".to_string(), Value::from(week));
            }

            // numeric ids arrive as numbers in some payload vintages
            let player_id = cells
                .get("player_id")
                .and_then(coerce_text)
                .or_else(|| cells.get("player").and_then(coerce_text));
            if let (Some(provider), Some(id)) = (provider, player_id) {
                let granularity = week.map(StatGranularity::Week).unwrap_or(StatGranularity::Season);
                if let Some(summary) = cache.lookup(provider, &id, granularity) {
                    summary.apply_to(cells);
                    // provider had no full name; fall back to the roster one
                    if cells.get("player_full_name").map(|v| v.is_null()).unwrap_or(true) {
                        if let Some(name) = cells.get("player_name").cloned().filter(|v| !v.is_null()) {
                            cells.insert("player_full_name".to_string(), name);
                        }
                    }
                }
            }

            batch.rows.push(extracted.cells);
        }

        batch
    }

    /// Normalize a collected batch, fill team names from the standings
    /// reference, and append to the roster store.
    pub fn append(&self, batch: RowBatch) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();

        let normalized = self
            .normalizer
            .rows_to_frame(&batch.rows)
            .context("failed to normalize roster batch")?;

        let (filled, fills) = self
            .filler
            .fill(normalized.frame, "team_name", "team_key")
            .context("cross-reference fill failed")?;

        let report = self.store.append(filled)?;

        let mut diagnostics = batch.notes;
        diagnostics.extend(normalized.diagnostics);
        diagnostics.extend(report.diagnostics);

        info!(
            "roster run {}: {} row(s) appended, {} total",
            run_id, report.rows_written, report.rows_total
        );
        Ok(RunReport {
            run_id,
            dataset: DatasetKind::Roster,
            started_at,
            finished_at: Utc::now(),
            rows_written: report.rows_written,
            rows_total: report.rows_total,
            columns: report.columns,
            diagnostics,
            fills,
            validated: report.validated,
        })
    }

    /// Full run: pull roster envelopes from a source, flatten every team,
    /// append once. The enrichment cache lives exactly as long as the run.
    pub fn run(
        &self,
        source: &mut dyn RecordSource,
        provider: Option<&dyn StatsProvider>,
    ) -> Result<RunReport> {
        let envelopes = source
            .fetch()
            .with_context(|| format!("failed to fetch from source '{}'", source.source_id()))?;
        debug!(
            "roster source '{}' delivered {} envelope(s)",
            source.source_id(),
            envelopes.len()
        );

        let mut cache = EnrichmentCache::new();
        let mut batch = RowBatch::default();
        for envelope in &envelopes {
            let team = TeamContext::from_envelope(envelope);
            if team.team_key.is_none() {
                batch
                    .notes
                    .push("roster envelope without a team key; rows kept with null team_key".to_string());
            }
            let items = TeamContext::roster_items(envelope);
            let mut team_batch = self.roster_rows(&team, &items, provider, &mut cache);
            batch.rows.append(&mut team_batch.rows);
            batch.notes.append(&mut team_batch.notes);
        }

        self.append(batch)
    }
}
