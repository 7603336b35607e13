//! JSONL audit-event log.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use adapt_core::{AuditEvent, AuditSink, StoreError};

/// Append-only audit log, one JSON event per line.
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(event)
            .map_err(|err| StoreError::serde("encoding audit event", &err))?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| StoreError::io("opening audit log", &err))?;
        file.write_all(line.as_bytes())
            .map_err(|err| StoreError::io("appending audit event", &err))?;
        Ok(())
    }
}
