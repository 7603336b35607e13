//! Analyzer stage: threshold evaluation, dynamic energy-ceiling
//! adjustment, and recovery hysteresis.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Thresholds;
use crate::knowledge::KnowledgeState;
use crate::monitor::{DriftReading, Summary};

/// Which threshold a verdict was routed on.
///
/// On a simultaneous score and energy violation, energy wins the
/// routing (it also arms the recovery cooldown); both violation flags
/// are still surfaced on the verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationReason {
    /// EMA score fell below the configured floor
    Score,
    /// Normalized energy exceeded the dynamic ceiling
    Energy,
    /// An external coordinator commanded adaptation without a local
    /// violation
    External,
}

/// Outcome of one analysis cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the planner should consider a switch
    pub switch_needed: bool,
    /// Routing reason, set only when `switch_needed`
    pub reason: Option<ViolationReason>,
    /// `ema_score < min_score` held this cycle
    pub score_violated: bool,
    /// `normalized_energy > current_energy_threshold` held this cycle
    pub energy_violated: bool,
    /// The verdict was suppressed by recovery hysteresis
    pub in_recovery: bool,
    /// EMA score the verdict was evaluated on
    pub score: f64,
}

impl Verdict {
    /// Verdict for a cycle with nothing to analyze.
    pub fn no_action() -> Self {
        Self {
            switch_needed: false,
            reason: None,
            score_violated: false,
            energy_violated: false,
            in_recovery: false,
            score: 0.0,
        }
    }
}

/// Analyzer stage. Stateless apart from the configured thresholds; the
/// drifting ceiling and the hysteresis counter live in the knowledge
/// state it is handed.
#[derive(Clone, Debug)]
pub struct Analyzer {
    thresholds: Thresholds,
}

impl Analyzer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Evaluate `summary` against the thresholds.
    ///
    /// Violations are checked against the ceiling as it stood when the
    /// summary arrived; afterwards the ceiling drifts toward the static
    /// one, discounted by this cycle's usage, whatever the verdict.
    /// While `recovery_cycles > 0` the verdict is forced to no-switch
    /// and the counter decrements by one.
    ///
    /// The caller persists the knowledge state after this returns
    /// (checkpoint: after threshold/recovery update).
    pub fn analyze(&self, summary: &Summary, state: &mut KnowledgeState) -> Verdict {
        let t = &self.thresholds;
        let ceiling = state.current_energy_threshold;
        let score = summary.ema_score;
        let score_violated = score < t.min_score;
        let energy_violated = summary.normalized_energy > ceiling;

        // First-order adaptive filter: relax when usage is low,
        // tighten when usage is high.
        state.current_energy_threshold = (ceiling
            + t.energy_discount * (t.max_energy - summary.normalized_energy))
            .clamp(0.0, 1.0);

        debug!(
            score = score,
            normalized_energy = summary.normalized_energy,
            ceiling_before = ceiling,
            ceiling_after = state.current_energy_threshold,
            "analysis thresholds evaluated"
        );

        if state.recovery_cycles > 0 {
            state.recovery_cycles -= 1;
            info!(
                remaining = state.recovery_cycles,
                "in recovery cooldown; switch suppressed"
            );
            return Verdict {
                switch_needed: false,
                reason: None,
                score_violated,
                energy_violated,
                in_recovery: true,
                score,
            };
        }

        let reason = if energy_violated {
            state.recovery_cycles = t.recovery_cooldown;
            Some(ViolationReason::Energy)
        } else if score_violated {
            Some(ViolationReason::Score)
        } else {
            None
        };

        if let Some(reason) = reason {
            info!(
                ?reason,
                score_violated, energy_violated, "threshold violation detected"
            );
        }

        Verdict {
            switch_needed: reason.is_some(),
            reason,
            score_violated,
            energy_violated,
            in_recovery: false,
            score,
        }
    }

    /// Whether a drift reading breaches the KL ceiling.
    pub fn drift_detected(&self, reading: &DriftReading) -> bool {
        let detected = reading.kl_divergence > self.thresholds.drift_ceiling;
        if detected {
            info!(
                kl_divergence = reading.kl_divergence,
                ceiling = self.thresholds.drift_ceiling,
                "data drift detected"
            );
        }
        detected
    }
}
