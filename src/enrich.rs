//! Per-Record Player Enrichment
//!
//! Roster rows carry only what the roster payload mentions; fuller player
//! metadata and stat lines come from a separate provider lookup. The lookup
//! is an external collaborator behind [`StatsProvider`]; this module owns
//! the per-run cache and the mapping of provider stat names onto canonical
//! columns. A failed lookup degrades that record's enrichment columns to
//! null and never aborts the batch.

use crate::record::extract::{lookup_alias, FieldOutcome};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Stat granularity requested from the provider. Part of the cache key so
/// weekly and season lookups for the same player stay distinct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatGranularity {
    Week(i64),
    Season,
}

impl fmt::Display for StatGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatGranularity::Week(n) => write!(f, "week:{}", n),
            StatGranularity::Season => write!(f, "season"),
        }
    }
}

/// Raw provider answer for one player: metadata and a stat line, both with
/// whatever key names the provider uses.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlayerSummary {
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub stats: Map<String, Value>,
}

const FULL_NAME_ALIASES: &[&str] = &["full_name", "fullName"];
const PRIMARY_POSITION_ALIASES: &[&str] = &["primary_position", "primaryPosition"];

/// Provider stat names, in preference order, per canonical column.
const STAT_ALIASES: &[(&str, &[&str])] = &[
    ("pass_yds", &["Pass Yds", "PassYds", "pass_yds"]),
    ("pass_td", &["Pass TD", "PassTD", "pass_td"]),
    ("interceptions", &["Int", "INT", "interceptions"]),
    ("rush_att", &["Rush Att", "RushAtt", "rush_att"]),
    ("rush_yds", &["Rush Yds", "RushYds", "rush_yds"]),
    ("rush_td", &["Rush TD", "RushTD", "rush_td"]),
    ("rec", &["Rec", "REC", "rec"]),
    ("rec_yds", &["Rec Yds", "RecYds", "rec_yds"]),
    ("rec_td", &["Rec TD", "RecTD", "rec_td"]),
    ("targets", &["Targets", "targets"]),
    ("fum_lost", &["Fum Lost", "FumLost", "fum_lost"]),
    ("total_points", &["total_points", "Total Points"]),
];

impl PlayerSummary {
    pub fn full_name(&self) -> Option<&str> {
        match lookup_alias(&self.metadata, FULL_NAME_ALIASES) {
            FieldOutcome::Found { value, .. } => value.as_str(),
            FieldOutcome::Missing => None,
        }
    }

    pub fn primary_position(&self) -> Option<&str> {
        match lookup_alias(&self.metadata, PRIMARY_POSITION_ALIASES) {
            FieldOutcome::Found { value, .. } => value.as_str(),
            FieldOutcome::Missing => None,
        }
    }

    /// Copy recognized metadata and stat values onto a row's cells. Cells
    /// the provider has nothing for are left as they are.
    pub fn apply_to(&self, cells: &mut Map<String, Value>) {
        if let Some(name) = self.full_name() {
            cells.insert("player_full_name".to_string(), Value::String(name.to_string()));
        }
        if let Some(position) = self.primary_position() {
            cells.insert("primary_position".to_string(), Value::String(position.to_string()));
        }
        for (column, aliases) in STAT_ALIASES {
            if let FieldOutcome::Found { value, .. } = lookup_alias(&self.stats, aliases) {
                cells.insert(column.to_string(), value.clone());
            }
        }
    }
}

/// One provider-backed lookup. Implementations own session handling and
/// transport; this crate only consumes their already-fetched answers.
pub trait StatsProvider {
    fn player_summary(&self, player_id: &str, granularity: StatGranularity) -> Result<PlayerSummary>;
}

/// Lookup cache constructed once per run and passed into extraction, keyed
/// by (player id, granularity). Failures are cached too so one bad player
/// is probed once per run, not once per appearance.
#[derive(Default)]
pub struct EnrichmentCache {
    entries: HashMap<(String, StatGranularity), Option<PlayerSummary>>,
}

impl EnrichmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached lookup. A provider error is caught at this single-record
    /// scope and reported as an absent summary.
    pub fn lookup(
        &mut self,
        provider: &dyn StatsProvider,
        player_id: &str,
        granularity: StatGranularity,
    ) -> Option<PlayerSummary> {
        let key = (player_id.to_string(), granularity);
        if let Some(cached) = self.entries.get(&key) {
            return cached.clone();
        }
        let fetched = match provider.player_summary(player_id, granularity) {
            Ok(summary) => Some(summary),
            Err(e) => {
                debug!(
                    "enrichment lookup failed for {} ({}): {}",
                    player_id, granularity, e
                );
                None
            }
        };
        self.entries.insert(key, fetched.clone());
        fetched
    }
}

/// Summaries pre-fetched to disk as one JSON object keyed by player id.
/// Granularity is ignored: the dump carries whatever was fetched.
pub struct FileStatsProvider {
    summaries: HashMap<String, PlayerSummary>,
}

impl FileStatsProvider {
    pub fn load(path: PathBuf) -> Result<Self> {
        let text = fs::read_to_string(&path)?;
        let summaries: HashMap<String, PlayerSummary> = serde_json::from_str(&text)?;
        Ok(Self { summaries })
    }
}

impl StatsProvider for FileStatsProvider {
    fn player_summary(&self, player_id: &str, _granularity: StatGranularity) -> Result<PlayerSummary> {
        self.summaries
            .get(player_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no summary for player {}", player_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    struct CountingProvider {
        calls: Cell<usize>,
    }

    impl StatsProvider for CountingProvider {
        fn player_summary(&self, player_id: &str, _g: StatGranularity) -> Result<PlayerSummary> {
            self.calls.set(self.calls.get() + 1);
            if player_id == "bad" {
                anyhow::bail!("upstream hiccup");
            }
            Ok(PlayerSummary {
                metadata: match json!({"full_name": "Arlo Example"}) {
                    Value::Object(m) => m,
                    _ => unreachable!(),
                },
                stats: Map::new(),
            })
        }
    }

    #[test]
    fn test_cache_hits_skip_the_provider() {
        let provider = CountingProvider { calls: Cell::new(0) };
        let mut cache = EnrichmentCache::new();
        cache.lookup(&provider, "449.p.1", StatGranularity::Week(3));
        cache.lookup(&provider, "449.p.1", StatGranularity::Week(3));
        assert_eq!(provider.calls.get(), 1);
        cache.lookup(&provider, "449.p.1", StatGranularity::Season);
        assert_eq!(provider.calls.get(), 2);
    }

    #[test]
    fn test_failed_lookup_is_cached_and_absent() {
        let provider = CountingProvider { calls: Cell::new(0) };
        let mut cache = EnrichmentCache::new();
        assert!(cache.lookup(&provider, "bad", StatGranularity::Season).is_none());
        assert!(cache.lookup(&provider, "bad", StatGranularity::Season).is_none());
        assert_eq!(provider.calls.get(), 1);
    }

    #[test]
    fn test_apply_to_maps_stat_aliases() {
        let summary = PlayerSummary {
            metadata: Map::new(),
            stats: match json!({"Pass Yds": 287, "Rush TD": "1"}) {
                Value::Object(m) => m,
                _ => unreachable!(),
            },
        };
        let mut cells = Map::new();
        summary.apply_to(&mut cells);
        assert_eq!(cells["pass_yds"], json!(287));
        assert_eq!(cells["rush_td"], json!("1"));
        assert!(!cells.contains_key("rec"));
    }
}
