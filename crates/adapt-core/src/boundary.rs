//! Boundary expressions for declarative adaptation policies.
//!
//! A coordinator watches a quality attribute and delivers a tactic to
//! the command inbox when the attribute crosses a boundary. The
//! boundary is either a static threshold or one scaled by the
//! attribute's historical average.

use serde::{Deserialize, Serialize};

/// Which side of the boundary counts as a violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Violated when the observed value exceeds the boundary
    GreaterThan,
    /// Violated when the observed value falls below the boundary
    LessThan,
}

/// The boundary value itself.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundaryExpr {
    /// Fixed threshold
    Static {
        /// The threshold value
        threshold: f64,
    },
    /// Threshold proportional to the attribute's historical average
    ScaledByHistoricAverage {
        /// Multiplier applied to the historical average
        factor: f64,
    },
}

impl BoundaryExpr {
    /// Effective threshold given the attribute's historical average.
    /// A scaled boundary has no threshold before any history exists.
    pub fn threshold(&self, historic_avg: Option<f64>) -> Option<f64> {
        match self {
            Self::Static { threshold } => Some(*threshold),
            Self::ScaledByHistoricAverage { factor } => historic_avg.map(|avg| factor * avg),
        }
    }

    /// Whether `value` violates this boundary under `condition`.
    /// Without a threshold (scaled boundary, no history yet) nothing
    /// counts as a violation.
    pub fn is_violated(&self, condition: Condition, value: f64, historic_avg: Option<f64>) -> bool {
        let Some(threshold) = self.threshold(historic_avg) else {
            return false;
        };
        match condition {
            Condition::GreaterThan => value > threshold,
            Condition::LessThan => value < threshold,
        }
    }
}
