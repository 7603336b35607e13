//! JSON-file knowledge store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use adapt_core::{KnowledgeState, KnowledgeStore, StoreError};

/// Knowledge state persisted as one JSON document.
///
/// Saves go through a temp file and rename so a crash mid-write never
/// leaves a truncated state behind. A missing file is a fresh
/// deployment; a corrupt file is an error, never silently reset.
pub struct JsonKnowledgeStore {
    path: PathBuf,
}

impl JsonKnowledgeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KnowledgeStore for JsonKnowledgeStore {
    fn load(&self) -> Result<Option<KnowledgeState>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no knowledge file yet");
                return Ok(None);
            }
            Err(err) => return Err(StoreError::io("reading knowledge file", &err)),
        };
        let state = serde_json::from_str(&raw)
            .map_err(|err| StoreError::serde("parsing knowledge file", &err))?;
        Ok(Some(state))
    }

    fn save(&self, state: &KnowledgeState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|err| StoreError::serde("encoding knowledge state", &err))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|err| StoreError::io("writing knowledge temp file", &err))?;
        fs::rename(&tmp, &self.path)
            .map_err(|err| StoreError::io("renaming knowledge temp file", &err))?;
        Ok(())
    }
}
