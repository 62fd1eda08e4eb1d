/// Test: End-To-End Roster Run
///
/// Drives the whole chain with realistic payloads:
/// 1. Standings are transformed and persisted first (the reference dataset)
/// 2. Roster envelopes with mixed record shapes - keyed objects, bare
///    player keys, garbage - flatten into canonical rows
/// 3. Null team names are filled from the standings reference by team key
/// 4. Enrichment pulls metadata/stat lines through a provider, per record
/// 5. The persisted roster file carries the declared schema

use anyhow::Result;
use polars::prelude::*;
use serde_json::json;
use statline::enrich::{PlayerSummary, StatGranularity, StatsProvider};
use statline::pipeline::{RosterPipeline, StandingsPipeline};
use statline::schema::ROSTER_COLUMNS;
use statline::source::InMemorySource;
use std::fs;
use std::path::PathBuf;

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("statline_pipeline_tests").join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

struct FixtureProvider;

impl StatsProvider for FixtureProvider {
    fn player_summary(&self, player_id: &str, _granularity: StatGranularity) -> Result<PlayerSummary> {
        if player_id != "449.p.100" {
            anyhow::bail!("unknown player {}", player_id);
        }
        let summary = json!({
            "metadata": {"full_name": "Arlo Example", "primary_position": "QB"},
            "stats": {"Pass Yds": "287", "Pass TD": 2, "Int": 1, "total_points": "18.48"}
        });
        Ok(serde_json::from_value(summary)?)
    }
}

fn seed_standings(data_dir: &PathBuf) {
    let pipeline = StandingsPipeline::new(data_dir);
    let mut source = InMemorySource::new(
        "standings-fixture".to_string(),
        vec![
            json!({
                "team_key": "449.l.1.t.2",
                "name": "Gridiron Giants",
                "rank": 1,
                "outcome_totals": {"wins": 5, "losses": 2, "ties": 1, "percentage": "0.7"},
                "streak": ["win", "3"],
                "points_for": "812.4",
                "points_against": 700.1
            }),
            json!({
                "team_key": "449.l.1.t.5",
                "name": "Turf Burners",
                "rank": 2,
                "outcome_totals": [3, 4, 1, "0.4375"],
                "streak": {"type": "loss", "value": "2"}
            }),
        ],
    );
    let report = pipeline.run(&mut source).unwrap();
    assert_eq!(report.rows_total, 2);
}

#[test]
fn test_standings_reference_is_flattened_and_ordered() {
    let data_dir = test_dir("standings_only");
    seed_standings(&data_dir);

    let persisted = LazyFrame::scan_parquet(
        data_dir.join("standings.parquet"),
        ScanArgsParquet::default(),
    )
    .unwrap()
    .collect()
    .unwrap();

    let teams = persisted.column("Team").unwrap().str().unwrap();
    assert_eq!(teams.get(0), Some("Gridiron Giants"));
    assert_eq!(teams.get(1), Some("Turf Burners"));

    let streaks = persisted.column("Streak").unwrap().str().unwrap();
    assert_eq!(streaks.get(0), Some("W3"));
    assert_eq!(streaks.get(1), Some("L2"));

    let pct = persisted.column("WinPct").unwrap().f64().unwrap();
    assert_eq!(pct.get(0), Some(0.7));
    assert_eq!(pct.get(1), Some(0.4375));

    // flattened outcome totals pass through as extra int columns
    let wins = persisted.column("wins").unwrap().i64().unwrap();
    assert_eq!(wins.get(0), Some(5));
    assert_eq!(wins.get(1), Some(3));
}

#[test]
fn test_roster_run_fills_team_names_and_enriches() {
    let data_dir = test_dir("roster_end_to_end");
    seed_standings(&data_dir);

    let pipeline = RosterPipeline::new(&data_dir);
    let mut source = InMemorySource::new(
        "rosters-fixture".to_string(),
        vec![json!({
            "team_key": "449.l.1.t.2",
            "week": 3,
            "roster": [
                // keyed object; preferred alias (player_key) must win over player_id
                {
                    "player_key": "449.p.100",
                    "player_id": "100",
                    "name": "A. Example",
                    "eligible_positions": ["QB", "WR"],
                    "selected_position": "QB",
                    "status": "Q",
                    "points": "18.48"
                },
                // bare scalar: identity field only
                "449.p.200",
                // garbage: serialized fallback, row survives
                true
            ]
        })],
    );

    let report = pipeline.run(&mut source, Some(&FixtureProvider)).unwrap();
    assert_eq!(report.rows_written, 3);
    assert_eq!(report.fills.len(), 3);
    assert!(report.fills.iter().all(|f| f.value == "Gridiron Giants"));
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.contains("unrecognized record shape")));

    let persisted = LazyFrame::scan_parquet(pipeline.store().path(), ScanArgsParquet::default())
        .unwrap()
        .collect()
        .unwrap();
    assert_eq!(persisted.height(), 3);

    let names: Vec<String> = persisted
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let declared: Vec<String> = ROSTER_COLUMNS.iter().map(|c| c.name.to_string()).collect();
    assert_eq!(names, declared);

    let players = persisted.column("player").unwrap().str().unwrap();
    assert_eq!(players.get(0), Some("449.p.100"));
    assert_eq!(players.get(1), Some("449.p.200"));
    assert_eq!(players.get(2), Some("true"));

    // team name came from the standings reference for every row
    let team_names = persisted.column("team_name").unwrap().str().unwrap();
    for idx in 0..3 {
        assert_eq!(team_names.get(idx), Some("Gridiron Giants"));
    }

    // enrichment hit for the known player, degraded to null for the rest
    let full_names = persisted.column("player_full_name").unwrap().str().unwrap();
    assert_eq!(full_names.get(0), Some("Arlo Example"));
    assert_eq!(full_names.get(1), None);

    let pass_yds = persisted.column("pass_yds").unwrap().f64().unwrap();
    assert_eq!(pass_yds.get(0), Some(287.0));
    assert_eq!(pass_yds.get(1), None);

    // positions list materialized, week carried from the envelope
    let positions = persisted.column("eligible_positions").unwrap().str().unwrap();
    assert_eq!(positions.get(0), Some("QB,WR"));
    let weeks = persisted.column("week").unwrap().i64().unwrap();
    assert_eq!(weeks.get(0), Some(3));
    assert_eq!(weeks.get(1), Some(3));
}

#[test]
fn test_unmapped_key_stays_null_after_fill() {
    let data_dir = test_dir("fill_unmapped");
    seed_standings(&data_dir);

    let pipeline = RosterPipeline::new(&data_dir);
    let mut source = InMemorySource::new(
        "rosters-fixture".to_string(),
        vec![
            json!({"team_key": "449.l.1.t.2", "roster": ["449.p.1"]}),
            json!({"team_key": "449.l.9.t.9", "roster": ["449.p.2"]}),
        ],
    );

    let report = pipeline.run(&mut source, None).unwrap();
    assert_eq!(report.rows_written, 2);
    assert_eq!(report.fills.len(), 1);
    assert_eq!(report.fills[0].key, "449.l.1.t.2");

    let persisted = LazyFrame::scan_parquet(pipeline.store().path(), ScanArgsParquet::default())
        .unwrap()
        .collect()
        .unwrap();
    let team_names = persisted.column("team_name").unwrap().str().unwrap();
    assert_eq!(team_names.get(0), Some("Gridiron Giants"));
    assert_eq!(team_names.get(1), None);
}

#[test]
fn test_missing_reference_degrades_to_no_fill() {
    let data_dir = test_dir("fill_missing_reference");
    // no standings seeded: the filler must be a silent no-op

    let pipeline = RosterPipeline::new(&data_dir);
    let mut source = InMemorySource::new(
        "rosters-fixture".to_string(),
        vec![json!({"team_key": "449.l.1.t.2", "roster": ["449.p.1"]})],
    );

    let report = pipeline.run(&mut source, None).unwrap();
    assert_eq!(report.rows_written, 1);
    assert!(report.fills.is_empty());

    let persisted = LazyFrame::scan_parquet(pipeline.store().path(), ScanArgsParquet::default())
        .unwrap()
        .collect()
        .unwrap();
    let team_names = persisted.column("team_name").unwrap().str().unwrap();
    assert_eq!(team_names.get(0), None);
}

#[test]
fn test_reprocessing_accumulates_rows_across_runs() {
    let data_dir = test_dir("two_runs");
    seed_standings(&data_dir);

    let pipeline = RosterPipeline::new(&data_dir);
    let envelope = json!({"team_key": "449.l.1.t.2", "week": 1, "roster": ["449.p.1", "449.p.2"]});

    let mut first = InMemorySource::new("run-1".to_string(), vec![envelope.clone()]);
    let report = pipeline.run(&mut first, None).unwrap();
    assert_eq!(report.rows_total, 2);

    let mut second = InMemorySource::new("run-2".to_string(), vec![envelope]);
    let report = pipeline.run(&mut second, None).unwrap();
    assert_eq!(report.rows_written, 2);
    assert_eq!(report.rows_total, 4);
}
