//! Standings Pipeline
//!
//! Transforms the raw standings payload into the declared standings schema:
//! alias renames, streak and outcome-totals flattening, rank-or-percentage
//! ordering. The standings store is rebuilt wholesale each run; it is the
//! reference dataset the roster pipeline joins against.

use crate::normalize::SchemaNormalizer;
use crate::pipeline::RunReport;
use crate::record::extract::{lookup_alias, FieldAliases, FieldOutcome};
use crate::record::{coerce_float, coerce_int, flatten_outcome_totals, flatten_streak};
use crate::schema::DatasetKind;
use crate::source::RecordSource;
use crate::store::MergeStore;
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Declared standings fields and their upstream names.
const STANDINGS_FIELDS: &[FieldAliases] = &[
    FieldAliases { field: "Rank", aliases: &["Rank", "rank"] },
    FieldAliases { field: "Team", aliases: &["Team", "name"] },
    FieldAliases { field: "W", aliases: &["W", "wins"] },
    FieldAliases { field: "L", aliases: &["L", "losses"] },
    FieldAliases { field: "T", aliases: &["T", "ties"] },
    FieldAliases { field: "WinPct", aliases: &["WinPct", "pct", "percentage"] },
    FieldAliases { field: "PF", aliases: &["PF", "points_for"] },
    FieldAliases { field: "PA", aliases: &["PA", "points_against"] },
];

const STREAK_ALIASES: &[&str] = &["Streak", "streak"];
const OUTCOME_TOTALS_ALIASES: &[&str] = &["outcome_totals", "outcomeTotals"];

pub struct StandingsPipeline {
    store: MergeStore,
    normalizer: SchemaNormalizer,
}

impl StandingsPipeline {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            store: MergeStore::in_dir(data_dir, DatasetKind::Standings),
            normalizer: SchemaNormalizer::new(DatasetKind::Standings),
        }
    }

    pub fn store(&self) -> &MergeStore {
        &self.store
    }

    /// Flatten raw standings payloads into canonical row cells. Upstream
    /// fields with no declared counterpart pass through untouched.
    pub fn transform(&self, payloads: &[Value]) -> (Vec<Map<String, Value>>, Vec<String>) {
        let mut rows = Vec::with_capacity(payloads.len());
        let mut notes = Vec::new();

        for payload in payloads {
            let map = match payload {
                Value::Object(map) => map,
                other => {
                    notes.push(format!(
                        "standings record is not a mapping ({}); skipped",
                        shape_name(other)
                    ));
                    continue;
                }
            };
            rows.push(transform_team(map));
        }

        sort_rows(&mut rows);
        (rows, notes)
    }

    /// Full run: fetch, transform, replace the standings store.
    pub fn run(&self, source: &mut dyn RecordSource) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();

        let payloads = source
            .fetch()
            .with_context(|| format!("failed to fetch from source '{}'", source.source_id()))?;
        let (rows, notes) = self.transform(&payloads);

        let normalized = self
            .normalizer
            .rows_to_frame(&rows)
            .context("failed to normalize standings batch")?;
        let report = self.store.replace(normalized.frame)?;

        let mut diagnostics = notes;
        diagnostics.extend(normalized.diagnostics);
        diagnostics.extend(report.diagnostics);

        info!(
            "standings run {}: {} team(s) persisted",
            run_id, report.rows_total
        );
        Ok(RunReport {
            run_id,
            dataset: DatasetKind::Standings,
            started_at,
            finished_at: Utc::now(),
            rows_written: report.rows_written,
            rows_total: report.rows_total,
            columns: report.columns,
            diagnostics,
            fills: Vec::new(),
            validated: report.validated,
        })
    }
}

fn transform_team(map: &Map<String, Value>) -> Map<String, Value> {
    let mut consumed: HashSet<&str> = HashSet::new();
    let mut cells = Map::new();

    for f in STANDINGS_FIELDS {
        match lookup_alias(map, f.aliases) {
            FieldOutcome::Found { alias, value } => {
                consumed.insert(alias);
                cells.insert(f.field.to_string(), value.clone());
            }
            FieldOutcome::Missing => {
                cells.insert(f.field.to_string(), Value::Null);
            }
        }
    }

    // streak: composite shapes compress to "W3"-style strings, flat strings
    // pass through as they are
    cells.insert("Streak".to_string(), Value::Null);
    if let FieldOutcome::Found { alias, value } = lookup_alias(map, STREAK_ALIASES) {
        consumed.insert(alias);
        match flatten_streak(value) {
            Some(streak) => cells.insert("Streak".to_string(), Value::String(streak)),
            None => cells.insert("Streak".to_string(), value.clone()),
        };
    }

    if let FieldOutcome::Found { alias, value } = lookup_alias(map, OUTCOME_TOTALS_ALIASES) {
        consumed.insert(alias);
        if let Some(totals) = flatten_outcome_totals(value) {
            insert_opt_int(&mut cells, "wins", totals.wins);
            insert_opt_int(&mut cells, "losses", totals.losses);
            insert_opt_int(&mut cells, "ties", totals.ties);
            let win_pct_null = cells.get("WinPct").map(|v| v.is_null()).unwrap_or(true);
            if win_pct_null {
                if let Some(pct) = totals.percentage {
                    cells.insert("WinPct".to_string(), Value::from(pct));
                }
            }
        }
    }

    for (key, value) in map {
        if consumed.contains(key.as_str()) || cells.contains_key(key) {
            continue;
        }
        cells.insert(key.clone(), value.clone());
    }

    cells
}

fn insert_opt_int(cells: &mut Map<String, Value>, key: &str, value: Option<i64>) {
    cells.insert(
        key.to_string(),
        value.map(Value::from).unwrap_or(Value::Null),
    );
}

/// Rank ascending (nulls last) when any team has one, otherwise win
/// percentage descending with wins as the tiebreak.
fn sort_rows(rows: &mut [Map<String, Value>]) {
    let any_rank = rows
        .iter()
        .any(|r| r.get("Rank").and_then(coerce_int).is_some());

    if any_rank {
        rows.sort_by(|a, b| {
            let ra = a.get("Rank").and_then(coerce_int);
            let rb = b.get("Rank").and_then(coerce_int);
            nulls_last(ra, rb, |x, y| x.cmp(&y))
        });
    } else {
        rows.sort_by(|a, b| {
            let pa = a.get("WinPct").and_then(coerce_float);
            let pb = b.get("WinPct").and_then(coerce_float);
            let primary = nulls_last(pa, pb, |x, y| y.partial_cmp(&x).unwrap_or(Ordering::Equal));
            primary.then_with(|| {
                let wa = a.get("W").and_then(coerce_int);
                let wb = b.get("W").and_then(coerce_int);
                nulls_last(wa, wb, |x, y| y.cmp(&x))
            })
        });
    }
}

fn nulls_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_transform_renames_and_flattens() {
        let cells = transform_team(&map(json!({
            "name": "Gridiron Giants",
            "rank": "1",
            "wins": 5,
            "losses": 2,
            "ties": 1,
            "points_for": "812.4",
            "points_against": 700.1,
            "streak": {"type": "win", "value": "3"},
            "outcome_totals": {"wins": 5, "losses": 2, "ties": 1, "percentage": "0.7"},
            "playoff_seed": "2"
        })));

        assert_eq!(cells["Team"], json!("Gridiron Giants"));
        assert_eq!(cells["W"], json!(5));
        assert_eq!(cells["Streak"], json!("W3"));
        assert_eq!(cells["WinPct"], json!(0.7));
        assert_eq!(cells["wins"], json!(5));
        assert_eq!(cells["playoff_seed"], json!("2"));
        // the raw composites never leak through
        assert!(!cells.contains_key("outcome_totals"));
        assert!(!cells.contains_key("streak"));
    }

    #[test]
    fn test_existing_win_pct_is_left_untouched() {
        let cells = transform_team(&map(json!({
            "name": "Turf Burners",
            "pct": 0.5,
            "outcome_totals": {"wins": 5, "losses": 2, "ties": 1, "percentage": "0.7"}
        })));
        assert_eq!(cells["WinPct"], json!(0.5));
    }

    #[test]
    fn test_sort_by_rank_with_nulls_last() {
        let mut rows = vec![
            map(json!({"Team": "b", "Rank": null})),
            map(json!({"Team": "c", "Rank": 2})),
            map(json!({"Team": "a", "Rank": 1})),
        ];
        sort_rows(&mut rows);
        let teams: Vec<&str> = rows.iter().map(|r| r["Team"].as_str().unwrap()).collect();
        assert_eq!(teams, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_sort_by_win_pct_when_no_rank() {
        let mut rows = vec![
            map(json!({"Team": "low", "WinPct": 0.25})),
            map(json!({"Team": "high", "WinPct": 0.75})),
            map(json!({"Team": "mid", "WinPct": 0.5})),
        ];
        sort_rows(&mut rows);
        let teams: Vec<&str> = rows.iter().map(|r| r["Team"].as_str().unwrap()).collect();
        assert_eq!(teams, vec!["high", "mid", "low"]);
    }
}
