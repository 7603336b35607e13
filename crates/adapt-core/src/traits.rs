//! Collaborator seams of the adaptation engine.
//!
//! The loop never touches the filesystem, the inference process, or
//! the training pipeline directly; it talks to these traits. File
//! backed implementations live in `adapt-store`; in-memory doubles in
//! [`crate::stubs`].

use crate::error::{StoreError, TrainingError};
use crate::types::{AuditEvent, ModelId, ModelVersion, PredictionRecord, VersionId};

/// Read-only view of the append-only prediction log.
///
/// The log is written exclusively by the inference collaborator.
pub trait PredictionLog: Send + Sync {
    /// All rows with index >= `cursor`, in append order.
    fn read_from(&self, cursor: u64) -> Result<Vec<PredictionRecord>, StoreError>;

    /// The most recent `n` rows (fewer if the log is shorter).
    fn tail(&self, n: usize) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Total number of rows.
    fn len(&self) -> Result<u64, StoreError>;
}

/// The single mutable cell naming the currently active model.
///
/// Written exclusively by the executor; read by the inference
/// collaborator before each prediction.
pub trait ActiveModelStore: Send + Sync {
    /// Current active model, `None` before first activation.
    fn current(&self) -> Result<Option<ModelId>, StoreError>;

    /// Repoint the cell at `model`.
    fn set_current(&self, model: &ModelId) -> Result<(), StoreError>;
}

/// Repository of immutable model versions and their training-data
/// distribution fingerprints.
pub trait VersionRepository: Send + Sync {
    /// All model families with at least one stored version.
    fn families(&self) -> Result<Vec<ModelId>, StoreError>;

    /// Versions of `family`, sorted ascending by creation index.
    fn versions(&self, family: &ModelId) -> Result<Vec<ModelVersion>, StoreError>;

    /// Copy the version's artifact into the family's active slot.
    fn activate(&self, version: &VersionId) -> Result<(), StoreError>;
}

/// Training collaborator. Synchronous and blocking from the loop's
/// perspective; how training is actually launched (subprocess, task
/// queue) is the collaborator's business.
pub trait Trainer: Send + Sync {
    /// Retrain `family` on current data and return the new version.
    fn retrain(&self, family: &ModelId) -> Result<VersionId, TrainingError>;
}

/// Meter for the adaptation loop's own energy footprint.
///
/// `begin`/`end` bracket one executed decision; the measured energy is
/// accounted under `mape_k_energy_uj`, apart from the inference energy
/// the loop is trying to minimize.
pub trait EnergyMeter: Send + Sync {
    /// Start a measurement span.
    fn begin(&self);

    /// Finish the span and return microjoules consumed since `begin`.
    fn end(&self) -> f64;
}

/// Meter that always reports zero, for hosts without RAPL access.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEnergyMeter;

impl EnergyMeter for NullEnergyMeter {
    fn begin(&self) {}

    fn end(&self) -> f64 {
        0.0
    }
}

/// Sink for executed-decision audit events.
pub trait AuditSink: Send + Sync {
    /// Append one event. Sink failures are logged by the caller and
    /// never abort the cycle.
    fn record(&self, event: &AuditEvent) -> Result<(), StoreError>;
}
