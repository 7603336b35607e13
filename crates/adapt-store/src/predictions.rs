//! JSONL prediction-log reader.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::warn;

use adapt_core::{PredictionLog, PredictionRecord, StoreError};

/// Read side of the append-only JSONL prediction log the inference
/// collaborator writes, one record per line.
///
/// The file is re-read per call; log sizes in the intended deployments
/// are modest and truncation is the collaborator's business. Malformed
/// lines are logged and skipped so one bad write cannot stall the
/// loop.
pub struct JsonlPredictionLog {
    path: PathBuf,
}

impl JsonlPredictionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io("reading prediction log", &err)),
        };
        let mut rows = Vec::new();
        for (number, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => rows.push(record),
                Err(err) => {
                    warn!(line = number + 1, error = %err, "skipping malformed prediction row");
                }
            }
        }
        Ok(rows)
    }
}

impl PredictionLog for JsonlPredictionLog {
    fn read_from(&self, cursor: u64) -> Result<Vec<PredictionRecord>, StoreError> {
        let rows = self.read_all()?;
        let start = (cursor as usize).min(rows.len());
        Ok(rows[start..].to_vec())
    }

    fn tail(&self, n: usize) -> Result<Vec<PredictionRecord>, StoreError> {
        let rows = self.read_all()?;
        let start = rows.len().saturating_sub(n);
        Ok(rows[start..].to_vec())
    }

    fn len(&self) -> Result<u64, StoreError> {
        Ok(self.read_all()?.len() as u64)
    }
}
