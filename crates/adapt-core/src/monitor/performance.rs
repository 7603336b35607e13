//! The Monitor service: performance summaries and drift readings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{MonitorConfig, Thresholds};
use crate::error::{ConfigError, StoreError};
use crate::knowledge::KnowledgeState;
use crate::traits::{ActiveModelStore, PredictionLog};
use crate::types::{EventCounters, Histogram, ModelId, PredictionRecord};

use super::drift::{DriftReading, DriftSignal};
use super::proxy::AccuracyProxy;

/// Point-in-time performance/energy summary produced each monitoring
/// cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Accuracy proxy over the scanned rows (r-squared or mean
    /// confidence, depending on the variant)
    pub accuracy_proxy: f64,
    /// Mean raw energy per inference over the scanned rows, microjoules
    pub energy_uj: f64,
    /// Energy normalized into [0, 1] against the configured band
    pub normalized_energy: f64,
    /// `beta * accuracy + (1 - beta) * (1 - normalized_energy)`
    pub composite_score: f64,
    /// EMA score of the active model after this cycle's update (or
    /// the cached value on the no-new-data path)
    pub ema_score: f64,
    /// Model the summary describes
    pub model: ModelId,
    /// Whether this summary was rebuilt from recent rows because no
    /// new rows had arrived (cursor and EMA untouched)
    pub cached: bool,
    /// Running audit counters at summary time
    pub counters: EventCounters,
    /// When the summary was computed
    pub timestamp: DateTime<Utc>,
}

/// Monitor stage. Owns the read side of the prediction log and the
/// variant strategies; mutates only the EMA map and the cursor of the
/// knowledge state handed to it.
pub struct Monitor {
    log: Arc<dyn PredictionLog>,
    active: Arc<dyn ActiveModelStore>,
    proxy: Box<dyn AccuracyProxy>,
    signal: Box<dyn DriftSignal>,
    thresholds: Thresholds,
    config: MonitorConfig,
}

impl Monitor {
    /// Build the monitor. A malformed `config` is fatal at startup; a
    /// zero window or degenerate histogram domain would otherwise make
    /// every drift check come back empty.
    pub fn new(
        log: Arc<dyn PredictionLog>,
        active: Arc<dyn ActiveModelStore>,
        proxy: Box<dyn AccuracyProxy>,
        signal: Box<dyn DriftSignal>,
        thresholds: Thresholds,
        config: MonitorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            log,
            active,
            proxy,
            signal,
            thresholds,
            config,
        })
    }

    /// Compute a performance summary from rows beyond the cursor.
    ///
    /// With new rows: updates the active model's EMA, advances the
    /// cursor, and returns a fresh summary. Without new rows: rebuilds
    /// telemetry from the most recent `fallback_window` rows, leaving
    /// cursor and EMA untouched. `Ok(None)` when there is no active
    /// model or no data at all; that is a normal condition, not a
    /// failure.
    ///
    /// The caller persists the knowledge state after this returns
    /// (checkpoint: after EMA update).
    pub fn monitor_performance(
        &self,
        state: &mut KnowledgeState,
    ) -> Result<Option<Summary>, StoreError> {
        let Some(model) = self.active.current()? else {
            warn!("no model currently active; skipping performance monitoring");
            return Ok(None);
        };

        let rows = self.log.read_from(state.last_processed_row)?;
        if rows.is_empty() {
            return self.cached_summary(state, &model);
        }

        debug!(
            rows = rows.len(),
            model = %model,
            proxy = self.proxy.name(),
            "processing new prediction rows"
        );

        let accuracy = self.proxy.compute(&rows);
        let energy_uj = mean_energy(&rows);
        let normalized = self.normalize_energy(energy_uj);
        let composite =
            self.thresholds.beta * accuracy + (1.0 - self.thresholds.beta) * (1.0 - normalized);

        let previous = state.ema_score(&model);
        let ema = self.thresholds.gamma * composite + (1.0 - self.thresholds.gamma) * previous;
        state.set_ema_score(&model, ema);
        state.advance_cursor(rows.len() as u64);

        info!(
            model = %model,
            accuracy = accuracy,
            energy_uj = energy_uj,
            normalized_energy = normalized,
            composite_score = composite,
            ema_score = ema,
            cursor = state.last_processed_row,
            "monitoring cycle complete"
        );

        Ok(Some(Summary {
            accuracy_proxy: accuracy,
            energy_uj,
            normalized_energy: normalized,
            composite_score: composite,
            ema_score: ema,
            model,
            cached: false,
            counters: state.event_counters.clone(),
            timestamp: Utc::now(),
        }))
    }

    /// No-new-data fallback: telemetry from the most recent rows with
    /// the cached EMA score. Does not mutate the knowledge state.
    fn cached_summary(
        &self,
        state: &KnowledgeState,
        model: &ModelId,
    ) -> Result<Option<Summary>, StoreError> {
        let recent = self.log.tail(self.config.fallback_window)?;
        if recent.is_empty() {
            debug!("prediction log is empty; nothing to summarize");
            return Ok(None);
        }

        let accuracy = self.proxy.compute(&recent);
        let energy_uj = mean_energy(&recent);
        let normalized = self.normalize_energy(energy_uj);
        let ema = state.ema_score(model);
        // Composite is recomputed for display only; EMA stays cached.
        let composite =
            self.thresholds.beta * accuracy + (1.0 - self.thresholds.beta) * (1.0 - normalized);

        debug!(
            model = %model,
            rows = recent.len(),
            ema_score = ema,
            "no new rows; reusing recent telemetry"
        );

        Ok(Some(Summary {
            accuracy_proxy: accuracy,
            energy_uj,
            normalized_energy: normalized,
            composite_score: composite,
            ema_score: ema,
            model: model.clone(),
            cached: true,
            counters: state.event_counters.clone(),
            timestamp: Utc::now(),
        }))
    }

    /// Measure drift between two adjacent windows of recent records.
    ///
    /// Returns `Ok(None)` when fewer than `2 * drift_window` rows
    /// exist or the signal yields no distribution.
    pub fn monitor_drift(&self) -> Result<Option<DriftReading>, StoreError> {
        let window = self.config.drift_window;
        let rows = self.log.tail(2 * window)?;
        if rows.len() < 2 * window {
            debug!(
                have = rows.len(),
                need = 2 * window,
                "not enough rows for drift detection"
            );
            return Ok(None);
        }

        let (reference_rows, current_rows) = rows.split_at(window);
        let Some(reference) = self.signal.distribution(reference_rows) else {
            warn!(signal = self.signal.name(), "reference window yielded no distribution");
            return Ok(None);
        };
        let Some(current) = self.signal.distribution(current_rows) else {
            warn!(signal = self.signal.name(), "current window yielded no distribution");
            return Ok(None);
        };

        let Some(kl) = current.kl_divergence(&reference) else {
            warn!("drift windows are not comparable (bin mismatch)");
            return Ok(None);
        };

        info!(kl_divergence = kl, signal = self.signal.name(), "drift reading");
        Ok(Some(DriftReading {
            kl_divergence: kl,
            current,
        }))
    }

    /// Distribution of the most recent drift window, for version
    /// comparison on externally triggered drift handling where no
    /// local reading exists.
    pub fn current_distribution(&self) -> Result<Option<Histogram>, StoreError> {
        let rows = self.log.tail(self.config.drift_window)?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(self.signal.distribution(&rows))
    }

    /// Normalize raw microjoules into [0, 1] against the configured
    /// band; defined as 0 when the band is degenerate.
    fn normalize_energy(&self, energy_uj: f64) -> f64 {
        let (lo, hi) = (self.thresholds.e_min, self.thresholds.e_max);
        if hi <= lo {
            return 0.0;
        }
        ((energy_uj - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

fn mean_energy(rows: &[PredictionRecord]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|r| r.energy_uj).sum::<f64>() / rows.len() as f64
}
