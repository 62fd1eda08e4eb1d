//! Record Sources
//!
//! The fetch collaborator authenticates and queries the upstream provider;
//! by the time payloads reach this crate they are plain JSON values. A
//! [`RecordSource`] is that hand-off seam: pipelines pull one batch of raw
//! records from it without knowing how the records were obtained.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

pub trait RecordSource {
    /// Pull the batch of raw records. Drained after the first call.
    fn fetch(&mut self) -> Result<Vec<Value>>;

    /// Unique identifier for logging and reports.
    fn source_id(&self) -> &str;

    /// Source kind, e.g. "memory" or "file".
    fn source_type(&self) -> &str;
}

/// Wraps payloads that are already in memory (tests, embedding callers).
pub struct InMemorySource {
    source_id: String,
    payloads: Vec<Value>,
    consumed: bool,
}

impl InMemorySource {
    pub fn new(source_id: String, payloads: Vec<Value>) -> Self {
        Self {
            source_id,
            payloads,
            consumed: false,
        }
    }
}

impl RecordSource for InMemorySource {
    fn fetch(&mut self) -> Result<Vec<Value>> {
        if self.consumed {
            return Ok(Vec::new());
        }
        self.consumed = true;
        Ok(std::mem::take(&mut self.payloads))
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn source_type(&self) -> &str {
        "memory"
    }
}

/// Reads a payload dump: one JSON file holding an array of records (a lone
/// object is treated as a single-record batch).
pub struct JsonFileSource {
    source_id: String,
    path: PathBuf,
    consumed: bool,
}

impl JsonFileSource {
    pub fn new(source_id: String, path: PathBuf) -> Self {
        Self {
            source_id,
            path,
            consumed: false,
        }
    }
}

impl RecordSource for JsonFileSource {
    fn fetch(&mut self) -> Result<Vec<Value>> {
        if self.consumed {
            return Ok(Vec::new());
        }
        self.consumed = true;

        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read payload file {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("payload file {} is not valid JSON", self.path.display()))?;

        match value {
            Value::Array(items) => Ok(items),
            other => Ok(vec![other]),
        }
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn source_type(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_memory_source_drains_once() {
        let mut source = InMemorySource::new("t".to_string(), vec![json!({"a": 1})]);
        assert_eq!(source.fetch().unwrap().len(), 1);
        assert!(source.fetch().unwrap().is_empty());
    }
}
