//! Directory-backed model version repository.
//!
//! Layout, shared with the training collaborator:
//!
//! ```text
//! versions/
//!   lstm_v1.model
//!   lstm_v1_fingerprint.json
//!   lstm_v2.model
//!   lstm_v2_fingerprint.json
//! active/
//!   lstm.model        <- written by activate()
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::warn;

use adapt_core::{
    Histogram, ModelId, ModelVersion, StoreError, VersionId, VersionRepository,
};

const FINGERPRINT_SUFFIX: &str = "_fingerprint";

/// Version artifacts plus training-distribution fingerprints on disk.
pub struct DirVersionRepository {
    versions_dir: PathBuf,
    active_dir: PathBuf,
}

impl DirVersionRepository {
    pub fn new(versions_dir: impl Into<PathBuf>, active_dir: impl Into<PathBuf>) -> Self {
        Self {
            versions_dir: versions_dir.into(),
            active_dir: active_dir.into(),
        }
    }

    fn artifact_path(&self, version: &VersionId) -> PathBuf {
        self.versions_dir.join(format!("{version}.model"))
    }

    fn fingerprint_path(&self, version: &VersionId) -> PathBuf {
        self.versions_dir
            .join(format!("{version}{FINGERPRINT_SUFFIX}.json"))
    }

    /// All fingerprinted versions on disk, grouped by family.
    fn scan(&self) -> Result<BTreeMap<ModelId, Vec<u32>>, StoreError> {
        let entries = match fs::read_dir(&self.versions_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(StoreError::io("scanning versions directory", &err)),
        };
        let mut map: BTreeMap<ModelId, Vec<u32>> = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io("scanning versions directory", &err))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name
                .strip_suffix(".json")
                .and_then(|s| s.strip_suffix(FINGERPRINT_SUFFIX))
            else {
                continue;
            };
            let Some((family, index)) = parse_version_stem(stem) else {
                warn!(file = name, "unrecognized fingerprint file name; skipped");
                continue;
            };
            map.entry(family).or_default().push(index);
        }
        for indices in map.values_mut() {
            indices.sort_unstable();
        }
        Ok(map)
    }

    fn load_fingerprint(&self, version: &VersionId) -> Result<Histogram, StoreError> {
        let path = self.fingerprint_path(version);
        let raw = fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound(format!("fingerprint of {version}")),
            _ => StoreError::io("reading version fingerprint", &err),
        })?;
        serde_json::from_str(&raw)
            .map_err(|err| StoreError::serde("parsing version fingerprint", &err))
    }
}

/// Split `lstm_v3` into family and index; families may themselves
/// contain underscores.
fn parse_version_stem(stem: &str) -> Option<(ModelId, u32)> {
    let (family, index) = stem.rsplit_once("_v")?;
    if family.is_empty() {
        return None;
    }
    let index: u32 = index.parse().ok()?;
    Some((ModelId::new(family), index))
}

impl VersionRepository for DirVersionRepository {
    fn families(&self) -> Result<Vec<ModelId>, StoreError> {
        Ok(self.scan()?.into_keys().collect())
    }

    fn versions(&self, family: &ModelId) -> Result<Vec<ModelVersion>, StoreError> {
        let scan = self.scan()?;
        let Some(indices) = scan.get(family) else {
            return Ok(Vec::new());
        };
        let mut versions = Vec::with_capacity(indices.len());
        for &index in indices {
            let id = VersionId::new(family, index);
            let fingerprint = self.load_fingerprint(&id)?;
            versions.push(ModelVersion { id, fingerprint });
        }
        Ok(versions)
    }

    fn activate(&self, version: &VersionId) -> Result<(), StoreError> {
        let source = self.artifact_path(version);
        if !source.exists() {
            return Err(StoreError::NotFound(format!("artifact of {version}")));
        }
        fs::create_dir_all(&self.active_dir)
            .map_err(|err| StoreError::io("creating active-model directory", &err))?;
        let target = self.active_dir.join(format!("{}.model", version.family));
        fs::copy(&source, &target)
            .map_err(|err| StoreError::io("copying version artifact into active slot", &err))?;
        Ok(())
    }
}
