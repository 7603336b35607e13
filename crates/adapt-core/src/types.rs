//! Core domain types shared across the adaptation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Epsilon added to every histogram bin before a KL computation to
/// avoid zero-probability singularities.
pub const KL_EPSILON: f64 = 1e-10;

/// Upper clamp applied to computed KL divergences.
pub const KL_MAX: f64 = 10.0;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Identifier of a model family (one interchangeable model variant).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&ModelId> for ModelId {
    fn from(m: &ModelId) -> Self {
        m.clone()
    }
}

/// Identifier of one immutable trained version within a model family.
///
/// Versions of a family are totally ordered by `index` (v1, v2, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId {
    /// Owning model family
    pub family: ModelId,
    /// Creation index, starting at 1
    pub index: u32,
}

impl VersionId {
    pub fn new(family: impl Into<ModelId>, index: u32) -> Self {
        Self {
            family: family.into(),
            index,
        }
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_v{}", self.family, self.index)
    }
}

// ============================================================================
// PREDICTION LOG
// ============================================================================

/// One entry of the append-only prediction log.
///
/// Written exclusively by the inference collaborator; the engine only
/// reads rows past its cursor. For the vision variant the detection
/// confidence is carried in `predicted_value` and `true_value` holds
/// the confidence proxy the collaborator chose to record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Ground truth (regression) or confidence proxy (vision)
    pub true_value: f64,
    /// Predicted value (regression) or detection confidence (vision)
    pub predicted_value: f64,
    /// Model that produced this prediction
    pub model_used: ModelId,
    /// Inference duration in milliseconds
    pub inference_time_ms: f64,
    /// Energy consumed by this inference, in microjoules
    pub energy_uj: f64,
    /// Optional distribution fingerprint of the input (vision variant:
    /// per-image luminance histogram, already normalized to sum 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Histogram>,
}

// ============================================================================
// HISTOGRAM
// ============================================================================

/// A fixed-bin empirical distribution, normalized to sum 1.
///
/// Used both as the drift fingerprint of live data windows and as the
/// stored training-distribution fingerprint of model versions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram {
    /// Per-bin probability mass
    pub densities: Vec<f64>,
}

impl Histogram {
    /// Build a histogram of `values` over `bins` equal-width bins
    /// spanning `range`, normalized to sum 1.
    ///
    /// Values outside `range` are clamped into the boundary bins.
    /// Returns `None` for empty input or a degenerate range.
    pub fn from_values(values: &[f64], bins: usize, range: (f64, f64)) -> Option<Self> {
        let (lo, hi) = range;
        if values.is_empty() || bins == 0 || hi <= lo {
            return None;
        }
        let width = (hi - lo) / bins as f64;
        let mut counts = vec![0.0f64; bins];
        for &v in values {
            let idx = (((v - lo) / width) as isize).clamp(0, bins as isize - 1) as usize;
            counts[idx] += 1.0;
        }
        let total: f64 = counts.iter().sum();
        for c in &mut counts {
            *c /= total;
        }
        Some(Self { densities: counts })
    }

    /// Element-wise mean of a set of equally-binned histograms,
    /// renormalized to sum 1. Returns `None` if the set is empty or
    /// the bin counts disagree.
    pub fn mean<'a, I>(histograms: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Histogram>,
    {
        let mut iter = histograms.into_iter();
        let first = iter.next()?;
        let mut sums = first.densities.clone();
        for h in iter {
            if h.densities.len() != sums.len() {
                return None;
            }
            for (s, d) in sums.iter_mut().zip(&h.densities) {
                *s += d;
            }
        }
        let total: f64 = sums.iter().sum();
        if total <= 0.0 {
            return None;
        }
        for s in &mut sums {
            *s /= total;
        }
        Some(Self { densities: sums })
    }

    /// KL divergence `KL(self || reference)` with epsilon smoothing,
    /// clamped to `[0, KL_MAX]`.
    ///
    /// Returns `None` if the bin counts disagree or either side is
    /// empty; callers treat that as "not comparable", not as drift.
    pub fn kl_divergence(&self, reference: &Histogram) -> Option<f64> {
        if self.densities.is_empty() || self.densities.len() != reference.densities.len() {
            return None;
        }
        let p_total: f64 = self.densities.iter().map(|d| d + KL_EPSILON).sum();
        let q_total: f64 = reference.densities.iter().map(|d| d + KL_EPSILON).sum();
        let mut kl = 0.0;
        for (p, q) in self.densities.iter().zip(&reference.densities) {
            let p = (p + KL_EPSILON) / p_total;
            let q = (q + KL_EPSILON) / q_total;
            kl += p * (p / q).ln();
        }
        Some(kl.clamp(0.0, KL_MAX))
    }
}

// ============================================================================
// MODEL VERSIONS
// ============================================================================

/// An immutable trained model version with the fingerprint of the
/// data distribution it was trained or fine-tuned on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Version identity (family + creation index)
    pub id: VersionId,
    /// Training-data distribution fingerprint
    pub fingerprint: Histogram,
}

/// Diagnostic record of the most recent version search, persisted to
/// the knowledge state for operator inspection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionSearchOutcome {
    /// Globally best version found, if any family had >= 2 versions
    pub best: Option<VersionId>,
    /// KL divergence of the best version against the live distribution
    pub min_kl: f64,
    /// Per-family minimum KL among compared versions
    pub per_family: std::collections::BTreeMap<ModelId, f64>,
    /// When the search ran
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// EVENT COUNTERS & AUDIT LOG
// ============================================================================

/// Monotonically increasing audit counters for the managed instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCounters {
    /// Adaptive model switches executed
    pub model_switches: u64,
    /// Full retrains triggered
    pub retrains: u64,
    /// Version/model replacement (rollback) events
    pub vmr_events: u64,
    /// Baseline (non-adaptive) switches, tracked separately
    pub simple_switches: u64,
    /// Energy consumed by the adaptation loop itself, in microjoules.
    /// Deliberately metered apart from the inference energy the loop
    /// is trying to minimize.
    pub mape_k_energy_uj: f64,
}

/// Kind of an executed adaptation event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// Adaptive switch of the active model
    Switch,
    /// Version/model replacement (rollback)
    Vmr,
    /// Full retrain
    Retrain,
    /// Baseline switch with no scoring input
    SimpleSwitch,
}

/// Outcome of an executed adaptation event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    /// The action was carried out
    Confirmed,
    /// The action was attempted and failed; the loop continues
    Failed,
}

/// One row of the append-only adaptation audit log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event id
    pub id: Uuid,
    /// What was executed
    pub kind: AuditEventKind,
    /// Outcome
    pub status: AuditStatus,
    /// Model involved, if any
    pub model: Option<ModelId>,
    /// Version involved, if any
    pub version: Option<VersionId>,
    /// Free-form detail for operators
    pub details: String,
    /// Prediction-log length at the time of the event
    pub log_row: u64,
    /// When the event was executed
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(kind: AuditEventKind, status: AuditStatus, log_row: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status,
            model: None,
            version: None,
            details: String::new(),
            log_row,
            timestamp: Utc::now(),
        }
    }

    pub fn with_model(mut self, model: ModelId) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_version(mut self, version: VersionId) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_id_display() {
        let id = VersionId::new("lstm", 3);
        assert_eq!(id.to_string(), "lstm_v3");
        assert_eq!(id.family, ModelId::new("lstm"));
        println!("[PASS] test_version_id_display");
    }

    #[test]
    fn test_histogram_from_values_normalizes() {
        let h = Histogram::from_values(&[0.1, 0.2, 0.8, 0.9], 2, (0.0, 1.0)).unwrap();
        assert_eq!(h.densities.len(), 2);
        assert!((h.densities.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((h.densities[0] - 0.5).abs() < 1e-12);
        println!("[PASS] test_histogram_from_values_normalizes");
    }

    #[test]
    fn test_histogram_from_values_clamps_outliers() {
        let h = Histogram::from_values(&[-5.0, 0.5, 42.0], 4, (0.0, 1.0)).unwrap();
        // Outliers land in the boundary bins instead of being dropped.
        assert!((h.densities.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(h.densities[0] > 0.0);
        assert!(h.densities[3] > 0.0);
        println!("[PASS] test_histogram_from_values_clamps_outliers");
    }

    #[test]
    fn test_histogram_from_values_rejects_degenerate_input() {
        assert!(Histogram::from_values(&[], 4, (0.0, 1.0)).is_none());
        assert!(Histogram::from_values(&[0.5], 0, (0.0, 1.0)).is_none());
        assert!(Histogram::from_values(&[0.5], 4, (1.0, 1.0)).is_none());
        println!("[PASS] test_histogram_from_values_rejects_degenerate_input");
    }

    #[test]
    fn test_kl_divergence_identical_is_zero() {
        let h = Histogram::from_values(&[0.1, 0.4, 0.6, 0.9], 4, (0.0, 1.0)).unwrap();
        let kl = h.kl_divergence(&h).unwrap();
        assert!(kl.abs() < 1e-9);
        println!("[PASS] test_kl_divergence_identical_is_zero");
    }

    #[test]
    fn test_kl_divergence_disjoint_is_large_but_clamped() {
        let p = Histogram {
            densities: vec![1.0, 0.0],
        };
        let q = Histogram {
            densities: vec![0.0, 1.0],
        };
        let kl = p.kl_divergence(&q).unwrap();
        assert!(kl > 1.0);
        assert!(kl <= KL_MAX);
        println!("[PASS] test_kl_divergence_disjoint_is_large_but_clamped");
    }

    #[test]
    fn test_kl_divergence_bin_mismatch_is_none() {
        let p = Histogram {
            densities: vec![0.5, 0.5],
        };
        let q = Histogram {
            densities: vec![0.3, 0.3, 0.4],
        };
        assert!(p.kl_divergence(&q).is_none());
        println!("[PASS] test_kl_divergence_bin_mismatch_is_none");
    }

    #[test]
    fn test_histogram_mean() {
        let a = Histogram {
            densities: vec![1.0, 0.0],
        };
        let b = Histogram {
            densities: vec![0.0, 1.0],
        };
        let m = Histogram::mean([&a, &b]).unwrap();
        assert!((m.densities[0] - 0.5).abs() < 1e-12);
        assert!((m.densities[1] - 0.5).abs() < 1e-12);
        assert!(Histogram::mean(std::iter::empty::<&Histogram>()).is_none());
        println!("[PASS] test_histogram_mean");
    }

    #[test]
    fn test_audit_event_builder() {
        let event = AuditEvent::new(AuditEventKind::Switch, AuditStatus::Confirmed, 120)
            .with_model(ModelId::new("svm"))
            .with_details("switched from lstm");
        assert_eq!(event.kind, AuditEventKind::Switch);
        assert_eq!(event.status, AuditStatus::Confirmed);
        assert_eq!(event.model, Some(ModelId::new("svm")));
        assert_eq!(event.log_row, 120);
        println!("[PASS] test_audit_event_builder");
    }

    #[test]
    fn test_prediction_record_serialization() {
        let record = PredictionRecord {
            true_value: 1.5,
            predicted_value: 1.4,
            model_used: ModelId::new("linear"),
            inference_time_ms: 2.0,
            energy_uj: 1800.0,
            histogram: None,
        };
        let json = serde_json::to_string(&record).expect("serialize failed");
        let back: PredictionRecord = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(back, record);
        assert!(!json.contains("histogram"));
        println!("[PASS] test_prediction_record_serialization");
    }
}
