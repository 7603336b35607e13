//! In-memory collaborator doubles.
//!
//! Used by the test suites of this crate and `adapt-store`, and usable
//! as-is for ephemeral deployments that do not need durability.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{StoreError, TrainingError};
use crate::traits::{
    ActiveModelStore, AuditSink, EnergyMeter, PredictionLog, Trainer, VersionRepository,
};
use crate::types::{AuditEvent, ModelId, ModelVersion, PredictionRecord, VersionId};

/// Append-only prediction log backed by a vector.
#[derive(Debug, Default)]
pub struct InMemoryPredictionLog {
    rows: Mutex<Vec<PredictionRecord>>,
}

impl InMemoryPredictionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: PredictionRecord) {
        self.rows.lock().push(record);
    }

    pub fn extend(&self, records: impl IntoIterator<Item = PredictionRecord>) {
        self.rows.lock().extend(records);
    }
}

impl PredictionLog for InMemoryPredictionLog {
    fn read_from(&self, cursor: u64) -> Result<Vec<PredictionRecord>, StoreError> {
        let rows = self.rows.lock();
        let start = (cursor as usize).min(rows.len());
        Ok(rows[start..].to_vec())
    }

    fn tail(&self, n: usize) -> Result<Vec<PredictionRecord>, StoreError> {
        let rows = self.rows.lock();
        let start = rows.len().saturating_sub(n);
        Ok(rows[start..].to_vec())
    }

    fn len(&self) -> Result<u64, StoreError> {
        Ok(self.rows.lock().len() as u64)
    }
}

/// Active-model pointer backed by a mutex cell.
#[derive(Debug, Default)]
pub struct InMemoryActiveModel {
    current: Mutex<Option<ModelId>>,
}

impl InMemoryActiveModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: ModelId) -> Self {
        Self {
            current: Mutex::new(Some(model)),
        }
    }
}

impl ActiveModelStore for InMemoryActiveModel {
    fn current(&self) -> Result<Option<ModelId>, StoreError> {
        Ok(self.current.lock().clone())
    }

    fn set_current(&self, model: &ModelId) -> Result<(), StoreError> {
        *self.current.lock() = Some(model.clone());
        Ok(())
    }
}

/// Version repository backed by a map, recording every activation.
#[derive(Debug, Default)]
pub struct InMemoryVersionRepository {
    versions: Mutex<BTreeMap<ModelId, Vec<ModelVersion>>>,
    activated: Mutex<Vec<VersionId>>,
    fail_activation: AtomicBool,
}

impl InMemoryVersionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_version(&self, version: ModelVersion) {
        let mut map = self.versions.lock();
        let family = map.entry(version.id.family.clone()).or_default();
        family.push(version);
        family.sort_by_key(|v| v.id.index);
    }

    /// Versions activated so far, in order.
    pub fn activations(&self) -> Vec<VersionId> {
        self.activated.lock().clone()
    }

    /// Make every subsequent `activate` call fail, for failure-path
    /// tests.
    pub fn fail_activations(&self, fail: bool) {
        self.fail_activation.store(fail, Ordering::SeqCst);
    }
}

impl VersionRepository for InMemoryVersionRepository {
    fn families(&self) -> Result<Vec<ModelId>, StoreError> {
        Ok(self.versions.lock().keys().cloned().collect())
    }

    fn versions(&self, family: &ModelId) -> Result<Vec<ModelVersion>, StoreError> {
        Ok(self.versions.lock().get(family).cloned().unwrap_or_default())
    }

    fn activate(&self, version: &VersionId) -> Result<(), StoreError> {
        if self.fail_activation.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                context: format!("activating {version}"),
                message: "injected failure".into(),
            });
        }
        let known = self
            .versions
            .lock()
            .get(&version.family)
            .map(|vs| vs.iter().any(|v| &v.id == version))
            .unwrap_or(false);
        if !known {
            return Err(StoreError::NotFound(version.to_string()));
        }
        self.activated.lock().push(version.clone());
        Ok(())
    }
}

/// Trainer that records requests and hands out sequential versions.
#[derive(Debug, Default)]
pub struct RecordingTrainer {
    calls: Mutex<Vec<ModelId>>,
    fail_with: Mutex<Option<String>>,
}

impl RecordingTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Families retrained so far, in order.
    pub fn calls(&self) -> Vec<ModelId> {
        self.calls.lock().clone()
    }

    /// Make every subsequent `retrain` call fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.fail_with.lock() = Some(reason.into());
    }
}

impl Trainer for RecordingTrainer {
    fn retrain(&self, family: &ModelId) -> Result<VersionId, TrainingError> {
        if let Some(reason) = self.fail_with.lock().clone() {
            return Err(TrainingError::new(reason));
        }
        let mut calls = self.calls.lock();
        calls.push(family.clone());
        let index = calls.iter().filter(|f| *f == family).count() as u32;
        Ok(VersionId::new(family, index))
    }
}

/// Audit sink collecting events into a vector.
#[derive(Debug, Default)]
pub struct VecAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl VecAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }
}

impl AuditSink for VecAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), StoreError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Meter reporting a fixed energy cost per measured span.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedEnergyMeter(pub f64);

impl EnergyMeter for FixedEnergyMeter {
    fn begin(&self) {}

    fn end(&self) -> f64 {
        self.0
    }
}
