//! Durable state of one managed-system instance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{EventCounters, ModelId, VersionSearchOutcome};

/// Default EMA score assigned to a model the first time it is seen.
pub const EMA_SEED: f64 = 0.5;

/// Durable state of one managed-system instance, mutated in place by
/// the loop and persisted at well-defined checkpoints.
///
/// Single-writer semantics: nothing else mutates this state while a
/// Monitor/Analyze/Plan/Execute cycle is in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeState {
    /// Cursor into the append-only prediction log. Monotonically
    /// non-decreasing; new reads only scan rows beyond it.
    pub last_processed_row: u64,

    /// Exponential moving average of the composite score per model.
    /// Entries are created lazily with [`EMA_SEED`].
    pub ema_scores: BTreeMap<ModelId, f64>,

    /// Adaptively drifting ceiling on normalized energy usage,
    /// recalculated every analysis cycle.
    pub current_energy_threshold: f64,

    /// Hysteresis counter; while positive, the analyzer suppresses new
    /// switch verdicts and decrements it once per consultation.
    pub recovery_cycles: u32,

    /// Monotonically increasing audit counters.
    pub event_counters: EventCounters,

    /// Outcome of the most recent version search, for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_version_search: Option<VersionSearchOutcome>,
}

impl KnowledgeState {
    /// Fresh state for a new deployment. The dynamic energy threshold
    /// starts at the static ceiling.
    pub fn new(initial_energy_threshold: f64) -> Self {
        Self {
            last_processed_row: 0,
            ema_scores: BTreeMap::new(),
            current_energy_threshold: initial_energy_threshold,
            recovery_cycles: 0,
            event_counters: EventCounters::default(),
            last_version_search: None,
        }
    }

    /// EMA score for `model`, defaulting to [`EMA_SEED`] if unseen.
    pub fn ema_score(&self, model: &ModelId) -> f64 {
        self.ema_scores.get(model).copied().unwrap_or(EMA_SEED)
    }

    /// Replace the EMA score for `model`.
    pub fn set_ema_score(&mut self, model: &ModelId, score: f64) {
        self.ema_scores.insert(model.clone(), score);
    }

    /// Inflate the EMA score for `model` by `bonus`, capped at 1.0.
    /// Applied after a version rollback to bias the loop toward
    /// stability while the restored version proves itself.
    pub fn inflate_ema_score(&mut self, model: &ModelId, bonus: f64) -> f64 {
        let new = (self.ema_score(model) + bonus).min(1.0);
        self.ema_scores.insert(model.clone(), new);
        new
    }

    /// Models with a known EMA entry, in deterministic order.
    pub fn known_models(&self) -> Vec<ModelId> {
        self.ema_scores.keys().cloned().collect()
    }

    /// Advance the prediction-log cursor by `rows`.
    pub fn advance_cursor(&mut self, rows: u64) {
        self.last_processed_row += rows;
    }
}

impl Default for KnowledgeState {
    fn default() -> Self {
        Self::new(crate::config::Thresholds::default().max_energy)
    }
}
