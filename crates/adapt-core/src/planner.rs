//! Planner stage: turning verdicts into concrete adaptation actions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analyzer::{Verdict, ViolationReason};
use crate::config::Thresholds;
use crate::knowledge::KnowledgeState;
use crate::selector::SelectionOutcome;
use crate::types::{ModelId, VersionId};

/// Why a model switch was planned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchCause {
    /// Random exploration draw, independent of any violation
    Exploration,
    /// Score-floor violation
    Score,
    /// Energy-ceiling violation
    Energy,
    /// External coordinator command with no local violation
    External,
}

impl From<ViolationReason> for SwitchCause {
    fn from(reason: ViolationReason) -> Self {
        match reason {
            ViolationReason::Score => Self::Score,
            ViolationReason::Energy => Self::Energy,
            ViolationReason::External => Self::External,
        }
    }
}

/// A concrete adaptation action for the executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// Repoint the active model
    Switch {
        /// Model to activate
        to: ModelId,
        /// Why
        cause: SwitchCause,
    },
    /// Roll back to a stored version
    ReplaceVersion {
        /// Version to activate
        version: VersionId,
        /// Its KL divergence against live data
        kl: f64,
    },
    /// Retrain a family from scratch
    Retrain {
        /// Family to retrain
        family: ModelId,
        /// Best KL the version search found
        min_kl: f64,
    },
    /// Baseline switch with no scoring input
    SimpleSwitch {
        /// Model to activate
        to: ModelId,
    },
}

/// Planner stage. Owns the exploration RNG; everything else it needs
/// is read from the knowledge state per call.
pub struct Planner {
    thresholds: Thresholds,
    rng: StdRng,
}

impl Planner {
    pub fn new(thresholds: Thresholds) -> Self {
        Self::with_rng(thresholds, StdRng::from_entropy())
    }

    /// Deterministic construction for tests.
    pub fn with_rng(thresholds: Thresholds, rng: StdRng) -> Self {
        Self { thresholds, rng }
    }

    /// Exploration draw, made before any verdict is consulted so that
    /// EMA estimates for rarely-used models stay fresh. With
    /// probability `alpha`, picks uniformly among the known models
    /// other than `current`; with no alternative, no action.
    pub fn try_explore(
        &mut self,
        state: &KnowledgeState,
        current: &ModelId,
    ) -> Option<Decision> {
        if self.rng.gen::<f64>() >= self.thresholds.alpha {
            return None;
        }
        let alternatives: Vec<ModelId> = state
            .known_models()
            .into_iter()
            .filter(|m| m != current)
            .collect();
        if alternatives.is_empty() {
            debug!("exploration drawn but no alternative model exists");
            return None;
        }
        let pick = alternatives[self.rng.gen_range(0..alternatives.len())].clone();
        info!(model = %pick, "exploration switch planned");
        Some(Decision::Switch {
            to: pick,
            cause: SwitchCause::Exploration,
        })
    }

    /// Exploitation path: route the verdict's violation to a switch
    /// target.
    ///
    /// An energy violation prefers the best-scoring alternative that is
    /// not current; a score or external violation prefers the globally
    /// best-scoring model. A target equal to the current model is a
    /// redundant switch and yields no action.
    pub fn plan_from_verdict(
        &mut self,
        verdict: &Verdict,
        state: &KnowledgeState,
        current: &ModelId,
    ) -> Option<Decision> {
        if !verdict.switch_needed {
            return None;
        }
        let reason = verdict.reason?;
        let target = match reason {
            ViolationReason::Energy => self.best_scoring(state, Some(current)),
            ViolationReason::Score | ViolationReason::External => self.best_scoring(state, None),
        };
        let Some(target) = target else {
            debug!("no candidate model to switch to");
            return None;
        };
        if &target == current {
            debug!(model = %current, "best model already active; no switch");
            return None;
        }
        info!(from = %current, to = %target, ?reason, "switch planned");
        Some(Decision::Switch {
            to: target,
            cause: reason.into(),
        })
    }

    /// Map a version-search outcome to an action. Retrains target the
    /// currently active family.
    pub fn plan_drift(&self, outcome: SelectionOutcome, current: &ModelId) -> Decision {
        match outcome {
            SelectionOutcome::SwitchVersion { version, kl } => {
                Decision::ReplaceVersion { version, kl }
            }
            SelectionOutcome::Retrain { min_kl } => Decision::Retrain {
                family: current.clone(),
                min_kl,
            },
        }
    }

    /// Baseline tactic: uniform choice among the other known models
    /// with no scoring input. Used for comparison runs, not the
    /// adaptive path.
    pub fn plan_simple_switch(
        &mut self,
        state: &KnowledgeState,
        current: &ModelId,
    ) -> Option<Decision> {
        let alternatives: Vec<ModelId> = state
            .known_models()
            .into_iter()
            .filter(|m| m != current)
            .collect();
        if alternatives.is_empty() {
            return None;
        }
        let pick = alternatives[self.rng.gen_range(0..alternatives.len())].clone();
        Some(Decision::SimpleSwitch { to: pick })
    }

    /// Best-scoring known model, optionally excluding one.
    fn best_scoring(&self, state: &KnowledgeState, exclude: Option<&ModelId>) -> Option<ModelId> {
        state
            .ema_scores
            .iter()
            .filter(|(model, _)| exclude.map_or(true, |e| *model != e))
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(model, _)| model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner(alpha: f64, seed: u64) -> Planner {
        let thresholds = Thresholds {
            alpha,
            ..Thresholds::default()
        };
        Planner::with_rng(thresholds, StdRng::seed_from_u64(seed))
    }

    fn state_with(scores: &[(&str, f64)]) -> KnowledgeState {
        let mut state = KnowledgeState::new(0.6);
        for (name, score) in scores {
            state.set_ema_score(&ModelId::new(*name), *score);
        }
        state
    }

    fn violated(reason: ViolationReason) -> Verdict {
        Verdict {
            switch_needed: true,
            reason: Some(reason),
            score_violated: reason == ViolationReason::Score,
            energy_violated: reason == ViolationReason::Energy,
            in_recovery: false,
            score: 0.5,
        }
    }

    #[test]
    fn test_energy_violation_picks_best_alternative() {
        let mut planner = planner(0.0, 7);
        // Current model scores best globally; energy routing must still
        // move away from it.
        let state = state_with(&[("lstm", 0.9), ("svm", 0.7), ("linear", 0.6)]);
        let decision = planner
            .plan_from_verdict(
                &violated(ViolationReason::Energy),
                &state,
                &ModelId::new("lstm"),
            )
            .expect("decision expected");
        assert_eq!(
            decision,
            Decision::Switch {
                to: ModelId::new("svm"),
                cause: SwitchCause::Energy,
            }
        );
        println!("[PASS] test_energy_violation_picks_best_alternative");
    }

    #[test]
    fn test_score_violation_picks_global_best() {
        let mut planner = planner(0.0, 7);
        let state = state_with(&[("lstm", 0.4), ("svm", 0.8)]);
        let decision = planner
            .plan_from_verdict(
                &violated(ViolationReason::Score),
                &state,
                &ModelId::new("lstm"),
            )
            .expect("decision expected");
        assert_eq!(
            decision,
            Decision::Switch {
                to: ModelId::new("svm"),
                cause: SwitchCause::Score,
            }
        );
        println!("[PASS] test_score_violation_picks_global_best");
    }

    #[test]
    fn test_redundant_switch_is_suppressed() {
        let mut planner = planner(0.0, 7);
        // Global best is the current model: score routing stands pat.
        let state = state_with(&[("lstm", 0.9), ("svm", 0.3)]);
        let decision = planner.plan_from_verdict(
            &violated(ViolationReason::Score),
            &state,
            &ModelId::new("lstm"),
        );
        assert!(decision.is_none());
        println!("[PASS] test_redundant_switch_is_suppressed");
    }

    #[test]
    fn test_no_verdict_no_action() {
        let mut planner = planner(0.0, 7);
        let state = state_with(&[("lstm", 0.9), ("svm", 0.3)]);
        let calm = Verdict::no_action();
        assert!(planner
            .plan_from_verdict(&calm, &state, &ModelId::new("lstm"))
            .is_none());
        println!("[PASS] test_no_verdict_no_action");
    }

    #[test]
    fn test_exploration_never_picks_current() {
        let mut planner = planner(1.0, 42);
        let state = state_with(&[("lstm", 0.5), ("svm", 0.5), ("linear", 0.5)]);
        let current = ModelId::new("lstm");
        for _ in 0..50 {
            let decision = planner
                .try_explore(&state, &current)
                .expect("alpha 1.0 always explores");
            match decision {
                Decision::Switch { to, cause } => {
                    assert_ne!(to, current);
                    assert_eq!(cause, SwitchCause::Exploration);
                }
                other => panic!("unexpected decision {other:?}"),
            }
        }
        println!("[PASS] test_exploration_never_picks_current");
    }

    #[test]
    fn test_exploration_without_alternatives() {
        let mut planner = planner(1.0, 42);
        let state = state_with(&[("lstm", 0.5)]);
        assert!(planner.try_explore(&state, &ModelId::new("lstm")).is_none());
        println!("[PASS] test_exploration_without_alternatives");
    }

    #[test]
    fn test_exploration_frequency_tracks_alpha() {
        let mut planner = planner(0.1, 1234);
        let state = state_with(&[("lstm", 0.5), ("svm", 0.5)]);
        let current = ModelId::new("lstm");
        let trials = 10_000;
        let explored = (0..trials)
            .filter(|_| planner.try_explore(&state, &current).is_some())
            .count();
        let fraction = explored as f64 / trials as f64;
        assert!((fraction - 0.1).abs() < 0.02, "fraction was {fraction}");
        println!("[PASS] test_exploration_frequency_tracks_alpha");
    }

    #[test]
    fn test_drift_plan_maps_selector_outcome() {
        let planner = planner(0.0, 7);
        let current = ModelId::new("lstm");
        let rollback = planner.plan_drift(
            SelectionOutcome::SwitchVersion {
                version: VersionId::new("svm", 2),
                kl: 0.05,
            },
            &current,
        );
        assert!(matches!(rollback, Decision::ReplaceVersion { version, .. }
            if version == VersionId::new("svm", 2)));

        let retrain = planner.plan_drift(SelectionOutcome::Retrain { min_kl: 0.9 }, &current);
        assert_eq!(
            retrain,
            Decision::Retrain {
                family: current,
                min_kl: 0.9,
            }
        );
        println!("[PASS] test_drift_plan_maps_selector_outcome");
    }

    #[test]
    fn test_simple_switch_ignores_scores() {
        let mut planner = planner(0.0, 9);
        let state = state_with(&[("lstm", 0.99), ("svm", 0.01)]);
        let decision = planner
            .plan_simple_switch(&state, &ModelId::new("lstm"))
            .expect("alternative exists");
        assert_eq!(
            decision,
            Decision::SimpleSwitch {
                to: ModelId::new("svm"),
            }
        );
        assert!(planner
            .plan_simple_switch(&state_with(&[("lstm", 0.5)]), &ModelId::new("lstm"))
            .is_none());
        println!("[PASS] test_simple_switch_ignores_scores");
    }
}
