//! Alias-Based Field Extraction
//!
//! Each canonical field carries an ordered list of acceptable upstream
//! names; the first alias present with a non-null value wins. Extraction
//! never fails: every record shape yields a row with the complete field
//! set, padded with nulls where nothing usable was found.

use crate::record::raw::RawRecord;
use serde_json::{Map, Value};

/// Ordered alias list for one canonical field.
#[derive(Clone, Copy, Debug)]
pub struct FieldAliases {
    pub field: &'static str,
    pub aliases: &'static [&'static str],
}

/// Extraction contract for one dataset kind: the alias table, the field a
/// bare scalar maps to, and the field that receives the serialized fallback
/// for unrecognized shapes.
#[derive(Clone, Copy, Debug)]
pub struct ExtractorSpec {
    pub fields: &'static [FieldAliases],
    pub identity_field: &'static str,
    pub raw_field: &'static str,
}

/// Outcome of a single field lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldOutcome<'a> {
    /// Value found under the named alias.
    Found { alias: &'static str, value: &'a Value },
    /// No alias present with a non-null value.
    Missing,
}

/// One extracted row: every canonical field present, plus shape notes that
/// the normalizer aggregates into batch diagnostics.
#[derive(Clone, Debug, Default)]
pub struct ExtractedRow {
    pub cells: Map<String, Value>,
    pub notes: Vec<String>,
}

/// Resolve one field against a mapping. First present, non-null alias wins.
pub fn lookup_alias<'a>(map: &'a Map<String, Value>, aliases: &[&'static str]) -> FieldOutcome<'a> {
    for &alias in aliases {
        if let Some(value) = map.get(alias) {
            if !value.is_null() {
                return FieldOutcome::Found { alias, value };
            }
        }
    }
    FieldOutcome::Missing
}

/// Extract every canonical field from one record.
pub fn extract_record(spec: &ExtractorSpec, record: &RawRecord) -> ExtractedRow {
    let mut cells = Map::new();
    for f in spec.fields {
        cells.insert(f.field.to_string(), Value::Null);
    }
    let mut notes = Vec::new();

    match record {
        RawRecord::Mapping(map) => {
            for f in spec.fields {
                if let FieldOutcome::Found { value, .. } = lookup_alias(map, f.aliases) {
                    cells.insert(f.field.to_string(), value.clone());
                }
            }
        }
        RawRecord::Scalar(id) => {
            cells.insert(spec.identity_field.to_string(), Value::String(id.clone()));
        }
        RawRecord::Sequence(_) | RawRecord::Opaque(_) => {
            cells.insert(spec.raw_field.to_string(), Value::String(record.serialized()));
            notes.push(format!(
                "unrecognized record shape; serialized fallback kept in '{}'",
                spec.raw_field
            ));
        }
    }

    ExtractedRow { cells, notes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[FieldAliases] = &[
        FieldAliases { field: "player", aliases: &["player_key", "playerKey", "player_id", "id"] },
        FieldAliases { field: "player_name", aliases: &["name", "full_name", "player_name"] },
        FieldAliases { field: "points", aliases: &["points", "projected_points"] },
    ];

    const EXTRACTOR: ExtractorSpec = ExtractorSpec {
        fields: FIELDS,
        identity_field: "player",
        raw_field: "player",
    };

    #[test]
    fn test_preferred_alias_wins() {
        let record = RawRecord::classify(json!({
            "player_id": "449.p.100",
            "player_key": "449.p.200",
        }));
        let row = extract_record(&EXTRACTOR, &record);
        assert_eq!(row.cells["player"], json!("449.p.200"));
    }

    #[test]
    fn test_null_alias_falls_through() {
        let record = RawRecord::classify(json!({
            "player_key": null,
            "player_id": "449.p.100",
        }));
        let row = extract_record(&EXTRACTOR, &record);
        assert_eq!(row.cells["player"], json!("449.p.100"));
    }

    #[test]
    fn test_missing_field_is_null() {
        let record = RawRecord::classify(json!({"name": "J. Kicker"}));
        let row = extract_record(&EXTRACTOR, &record);
        assert_eq!(row.cells["player"], Value::Null);
        assert_eq!(row.cells["player_name"], json!("J. Kicker"));
        assert_eq!(row.cells["points"], Value::Null);
    }

    #[test]
    fn test_scalar_maps_to_identity_field_only() {
        let record = RawRecord::classify(json!("449.p.321"));
        let row = extract_record(&EXTRACTOR, &record);
        assert_eq!(row.cells["player"], json!("449.p.321"));
        assert_eq!(row.cells["player_name"], Value::Null);
        assert!(row.notes.is_empty());
    }

    #[test]
    fn test_opaque_shape_keeps_serialized_fallback() {
        let record = RawRecord::classify(json!(true));
        let row = extract_record(&EXTRACTOR, &record);
        assert_eq!(row.cells["player"], json!("true"));
        assert_eq!(row.notes.len(), 1);
    }
}
