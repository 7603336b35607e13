//! Static configuration for the adaptation loop.
//!
//! Thresholds are read-only to the loop; the only adaptively drifting
//! value (`current_energy_threshold`) lives in the knowledge state.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Static thresholds supplied at startup.
///
/// Field names on the wire match the configuration record the
/// inference deployment already ships (`E_m`/`E_M` are the raw
/// energy normalization bounds in microjoules).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Floor on the composite score; below it a switch is considered
    pub min_score: f64,

    /// Static ceiling on normalized energy usage. The dynamic
    /// threshold in the knowledge state drifts toward this value.
    pub max_energy: f64,

    /// Lower bound of raw energy for normalization, microjoules
    #[serde(rename = "E_m")]
    pub e_min: f64,

    /// Upper bound of raw energy for normalization, microjoules
    #[serde(rename = "E_M")]
    pub e_max: f64,

    /// Exploration probability
    pub alpha: f64,

    /// Score weight between accuracy proxy and energy
    pub beta: f64,

    /// EMA decay (weight of the newest composite score)
    pub gamma: f64,

    /// KL divergence ceiling for drift detection and version selection
    pub drift_ceiling: f64,

    /// Discount applied when drifting the dynamic energy threshold
    /// toward `max_energy`. Deployment-specific; observed values range
    /// 0.4 to 0.95 across variants.
    #[serde(default = "default_energy_discount")]
    pub energy_discount: f64,

    /// Number of cycles switching stays suppressed after an energy
    /// violation triggers a switch
    #[serde(default = "default_recovery_cooldown")]
    pub recovery_cooldown: u32,
}

fn default_energy_discount() -> f64 {
    0.4
}

fn default_recovery_cooldown() -> u32 {
    3
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_score: 0.7,
            max_energy: 0.6,
            e_min: 0.0,
            e_max: 10_000_000.0,
            alpha: 0.1,
            beta: 0.5,
            gamma: 0.8,
            drift_ceiling: 0.75,
            energy_discount: default_energy_discount(),
            recovery_cooldown: default_recovery_cooldown(),
        }
    }
}

impl Thresholds {
    /// Validate all fields. A malformed configuration is fatal at
    /// startup and never retried.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |name: &str, v: f64| -> Result<(), ConfigError> {
            if !(0.0..=1.0).contains(&v) || v.is_nan() {
                return Err(ConfigError::InvalidValue {
                    field: name.to_string(),
                    reason: format!("must be within [0, 1], got {v}"),
                });
            }
            Ok(())
        };
        unit("min_score", self.min_score)?;
        unit("max_energy", self.max_energy)?;
        unit("alpha", self.alpha)?;
        unit("beta", self.beta)?;
        unit("gamma", self.gamma)?;
        if self.drift_ceiling <= 0.0 || self.drift_ceiling.is_nan() {
            return Err(ConfigError::InvalidValue {
                field: "drift_ceiling".into(),
                reason: format!("must be positive, got {}", self.drift_ceiling),
            });
        }
        if self.energy_discount <= 0.0 || self.energy_discount > 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "energy_discount".into(),
                reason: format!("must be within (0, 1], got {}", self.energy_discount),
            });
        }
        if self.e_max < self.e_min {
            return Err(ConfigError::InvalidValue {
                field: "E_M".into(),
                reason: format!(
                    "must be >= E_m ({} < {})",
                    self.e_max, self.e_min
                ),
            });
        }
        Ok(())
    }
}

/// Monitor-specific tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Size of each drift window; drift needs `2 * drift_window` rows
    pub drift_window: usize,

    /// Rows reused for the cached summary when no new rows exist
    pub fallback_window: usize,

    /// Bin count for target-value histograms (regression variant)
    pub histogram_bins: usize,

    /// Expected value range of the regression target, used as the
    /// fixed histogram domain so windows and version fingerprints are
    /// binned identically
    pub target_range: (f64, f64),
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            drift_window: 1000,
            fallback_window: 50,
            histogram_bins: 50,
            target_range: (0.0, 1.0),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drift_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "drift_window".into(),
                reason: "must be positive".into(),
            });
        }
        if self.fallback_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fallback_window".into(),
                reason: "must be positive".into(),
            });
        }
        if self.histogram_bins == 0 {
            return Err(ConfigError::InvalidValue {
                field: "histogram_bins".into(),
                reason: "must be positive".into(),
            });
        }
        if self.target_range.1 <= self.target_range.0 {
            return Err(ConfigError::InvalidValue {
                field: "target_range".into(),
                reason: format!(
                    "upper bound must exceed lower bound, got ({}, {})",
                    self.target_range.0, self.target_range.1
                ),
            });
        }
        Ok(())
    }
}
