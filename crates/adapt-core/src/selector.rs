//! Version selection: finding the stored model version whose training
//! distribution is statistically closest to live data.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::knowledge::KnowledgeState;
use crate::traits::VersionRepository;
use crate::types::{Histogram, ModelId, VersionId, VersionSearchOutcome, KL_MAX};

/// What the version search concluded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SelectionOutcome {
    /// A stored version is close enough to the live distribution;
    /// roll back to it.
    SwitchVersion {
        /// The version to activate
        version: VersionId,
        /// Its KL divergence against the live distribution
        kl: f64,
    },
    /// No stored version matches; a full retrain is warranted.
    Retrain {
        /// Best (lowest) KL found, or [`KL_MAX`] when nothing was
        /// comparable
        min_kl: f64,
    },
}

/// Searches stored version fingerprints for the lowest KL divergence
/// against a live distribution.
pub struct VersionSelector {
    repo: Arc<dyn VersionRepository>,
    drift_ceiling: f64,
}

impl VersionSelector {
    pub fn new(repo: Arc<dyn VersionRepository>, drift_ceiling: f64) -> Self {
        Self {
            repo,
            drift_ceiling,
        }
    }

    /// Lowest-KL version of one family against `current`.
    ///
    /// A family with fewer than two stored versions has nothing to
    /// compare against and yields `(None, KL_MAX)`. Ties keep the
    /// first version encountered, in ascending index order.
    pub fn select_best_version(
        &self,
        family: &ModelId,
        current: &Histogram,
    ) -> Result<(Option<VersionId>, f64), StoreError> {
        let versions = self.repo.versions(family)?;
        if versions.len() < 2 {
            debug!(family = %family, stored = versions.len(), "family excluded from version search");
            return Ok((None, KL_MAX));
        }

        let mut best: Option<(VersionId, f64)> = None;
        for version in &versions {
            let Some(kl) = current.kl_divergence(&version.fingerprint) else {
                debug!(version = %version.id, "fingerprint not comparable; skipped");
                continue;
            };
            let better = match &best {
                None => true,
                Some((_, min)) => kl < *min,
            };
            if better {
                best = Some((version.id.clone(), kl));
            }
        }

        Ok(match best {
            Some((id, kl)) => (Some(id), kl),
            None => (None, KL_MAX),
        })
    }

    /// Search every stored family and decide between rollback and
    /// retrain against the configured KL ceiling.
    ///
    /// Records a [`VersionSearchOutcome`] on the knowledge state for
    /// operator diagnostics; the caller persists it.
    pub fn select_across_families(
        &self,
        current: &Histogram,
        state: &mut KnowledgeState,
    ) -> Result<SelectionOutcome, StoreError> {
        let mut per_family = BTreeMap::new();
        let mut best: Option<(VersionId, f64)> = None;

        for family in self.repo.families()? {
            let (candidate, kl) = self.select_best_version(&family, current)?;
            let Some(candidate) = candidate else { continue };
            per_family.insert(family, kl);
            let better = match &best {
                None => true,
                Some((_, min)) => kl < *min,
            };
            if better {
                best = Some((candidate, kl));
            }
        }

        let min_kl = best.as_ref().map(|(_, kl)| *kl).unwrap_or(KL_MAX);
        state.last_version_search = Some(VersionSearchOutcome {
            best: best.as_ref().map(|(id, _)| id.clone()),
            min_kl,
            per_family,
            timestamp: Utc::now(),
        });

        match best {
            Some((version, kl)) if kl < self.drift_ceiling => {
                info!(version = %version, kl = kl, "stored version matches live distribution");
                Ok(SelectionOutcome::SwitchVersion { version, kl })
            }
            _ => {
                info!(
                    min_kl = min_kl,
                    ceiling = self.drift_ceiling,
                    "no stored version close enough; retrain"
                );
                Ok(SelectionOutcome::Retrain { min_kl })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stubs::InMemoryVersionRepository;
    use crate::types::ModelVersion;

    fn fingerprint(left: f64) -> Histogram {
        Histogram {
            densities: vec![left, 1.0 - left],
        }
    }

    fn repo_with(versions: Vec<(VersionId, Histogram)>) -> Arc<InMemoryVersionRepository> {
        let repo = Arc::new(InMemoryVersionRepository::new());
        for (id, fingerprint) in versions {
            repo.add_version(ModelVersion { id, fingerprint });
        }
        repo
    }

    #[test]
    fn test_selects_lowest_kl_version() {
        let repo = repo_with(vec![
            (VersionId::new("lstm", 1), fingerprint(0.95)), // far
            (VersionId::new("lstm", 2), fingerprint(0.55)), // close
        ]);
        let selector = VersionSelector::new(repo, 0.75);
        let current = fingerprint(0.5);
        let (best, kl) = selector
            .select_best_version(&ModelId::new("lstm"), &current)
            .unwrap();
        assert_eq!(best, Some(VersionId::new("lstm", 2)));
        assert!(kl < 0.75);
        println!("[PASS] test_selects_lowest_kl_version");
    }

    #[test]
    fn test_single_version_family_is_skipped() {
        let repo = repo_with(vec![(VersionId::new("lstm", 1), fingerprint(0.5))]);
        let selector = VersionSelector::new(repo, 0.75);
        let (best, kl) = selector
            .select_best_version(&ModelId::new("lstm"), &fingerprint(0.5))
            .unwrap();
        assert!(best.is_none());
        assert!((kl - KL_MAX).abs() < f64::EPSILON);
        println!("[PASS] test_single_version_family_is_skipped");
    }

    #[test]
    fn test_tie_break_keeps_first_version() {
        let repo = repo_with(vec![
            (VersionId::new("lstm", 1), fingerprint(0.6)),
            (VersionId::new("lstm", 2), fingerprint(0.6)),
        ]);
        let selector = VersionSelector::new(repo, 0.75);
        let (best, _) = selector
            .select_best_version(&ModelId::new("lstm"), &fingerprint(0.5))
            .unwrap();
        assert_eq!(best, Some(VersionId::new("lstm", 1)));
        println!("[PASS] test_tie_break_keeps_first_version");
    }

    #[test]
    fn test_ceiling_decides_rollback_vs_retrain() {
        // One distant version (high KL) and one near version.
        let repo = repo_with(vec![
            (VersionId::new("lstm", 1), fingerprint(0.999)),
            (VersionId::new("lstm", 2), fingerprint(0.52)),
        ]);
        let current = fingerprint(0.5);

        let generous = VersionSelector::new(repo.clone(), 0.75);
        let mut state = KnowledgeState::new(0.6);
        match generous.select_across_families(&current, &mut state).unwrap() {
            SelectionOutcome::SwitchVersion { version, kl } => {
                assert_eq!(version, VersionId::new("lstm", 2));
                assert!(kl < 0.75);
            }
            other => panic!("expected rollback, got {other:?}"),
        }

        let strict = VersionSelector::new(repo, 1e-6);
        match strict.select_across_families(&current, &mut state).unwrap() {
            SelectionOutcome::Retrain { min_kl } => assert!(min_kl > 1e-6),
            other => panic!("expected retrain, got {other:?}"),
        }
        println!("[PASS] test_ceiling_decides_rollback_vs_retrain");
    }

    #[test]
    fn test_search_spans_families_and_records_outcome() {
        let repo = repo_with(vec![
            (VersionId::new("lstm", 1), fingerprint(0.9)),
            (VersionId::new("lstm", 2), fingerprint(0.8)),
            (VersionId::new("svm", 1), fingerprint(0.45)),
            (VersionId::new("svm", 2), fingerprint(0.51)),
        ]);
        let selector = VersionSelector::new(repo, 0.75);
        let mut state = KnowledgeState::new(0.6);
        let outcome = selector
            .select_across_families(&fingerprint(0.5), &mut state)
            .unwrap();
        match outcome {
            SelectionOutcome::SwitchVersion { version, .. } => {
                assert_eq!(version.family, ModelId::new("svm"));
            }
            other => panic!("expected rollback, got {other:?}"),
        }

        let search = state.last_version_search.expect("outcome recorded");
        assert_eq!(search.per_family.len(), 2);
        assert!(search.per_family[&ModelId::new("svm")] < search.per_family[&ModelId::new("lstm")]);
        println!("[PASS] test_search_spans_families_and_records_outcome");
    }

    #[test]
    fn test_empty_repository_signals_retrain() {
        let repo = Arc::new(InMemoryVersionRepository::new());
        let selector = VersionSelector::new(repo, 0.75);
        let mut state = KnowledgeState::new(0.6);
        let outcome = selector
            .select_across_families(&fingerprint(0.5), &mut state)
            .unwrap();
        assert_eq!(outcome, SelectionOutcome::Retrain { min_kl: KL_MAX });
        println!("[PASS] test_empty_repository_signals_retrain");
    }

    #[test]
    fn test_selection_is_deterministic() {
        let repo = repo_with(vec![
            (VersionId::new("lstm", 1), fingerprint(0.7)),
            (VersionId::new("lstm", 2), fingerprint(0.55)),
            (VersionId::new("lstm", 3), fingerprint(0.62)),
        ]);
        let selector = VersionSelector::new(repo, 0.75);
        let current = fingerprint(0.5);
        let first = selector
            .select_best_version(&ModelId::new("lstm"), &current)
            .unwrap();
        for _ in 0..5 {
            let again = selector
                .select_best_version(&ModelId::new("lstm"), &current)
                .unwrap();
            assert_eq!(again.0, first.0);
            assert!((again.1 - first.1).abs() < f64::EPSILON);
        }
        println!("[PASS] test_selection_is_deterministic");
    }
}
