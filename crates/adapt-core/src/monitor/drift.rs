//! Drift-signal strategies and the drift reading type.

use serde::{Deserialize, Serialize};

use crate::config::MonitorConfig;
use crate::types::{Histogram, PredictionRecord};

/// Result of one drift measurement: KL divergence of the current
/// window's distribution relative to the reference window's, plus the
/// current distribution itself for downstream version comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftReading {
    /// KL(current || reference), clamped to [0, 10]
    pub kl_divergence: f64,
    /// Empirical distribution of the current window
    pub current: Histogram,
}

/// Extracts the empirical distribution of a window of records.
pub trait DriftSignal: Send + Sync {
    /// Distribution fingerprint of `rows`, or `None` when the window
    /// carries no usable signal.
    fn distribution(&self, rows: &[PredictionRecord]) -> Option<Histogram>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Histogram of the regression target over a fixed, configured value
/// range, so that windows and version fingerprints are binned
/// identically.
#[derive(Debug, Clone, Copy)]
pub struct TargetValueSignal {
    bins: usize,
    range: (f64, f64),
}

impl TargetValueSignal {
    pub fn new(bins: usize, range: (f64, f64)) -> Self {
        Self { bins, range }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.histogram_bins, config.target_range)
    }
}

impl DriftSignal for TargetValueSignal {
    fn distribution(&self, rows: &[PredictionRecord]) -> Option<Histogram> {
        let values: Vec<f64> = rows.iter().map(|r| r.true_value).collect();
        Histogram::from_values(&values, self.bins, self.range)
    }

    fn name(&self) -> &'static str {
        "target_value"
    }
}

/// Mean of the per-record luminance histograms the vision collaborator
/// attaches to each prediction. Rows without a fingerprint are
/// skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct LuminanceSignal;

impl DriftSignal for LuminanceSignal {
    fn distribution(&self, rows: &[PredictionRecord]) -> Option<Histogram> {
        Histogram::mean(rows.iter().filter_map(|r| r.histogram.as_ref()))
    }

    fn name(&self) -> &'static str {
        "luminance"
    }
}
