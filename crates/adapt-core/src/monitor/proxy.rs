//! Accuracy-proxy strategies.
//!
//! The regression variant scores a batch by the coefficient of
//! determination between predicted and true values; the vision
//! variant by mean detection confidence.

use crate::types::PredictionRecord;

/// Computes the accuracy-proxy metric over a batch of new rows.
pub trait AccuracyProxy: Send + Sync {
    /// Proxy value for `rows`. Empty batches are the caller's problem;
    /// implementations may return 0.0 for them.
    fn compute(&self, rows: &[PredictionRecord]) -> f64;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Coefficient of determination (r-squared) between predicted and
/// true values.
#[derive(Debug, Default, Clone, Copy)]
pub struct RSquared;

impl AccuracyProxy for RSquared {
    fn compute(&self, rows: &[PredictionRecord]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let n = rows.len() as f64;
        let mean_true: f64 = rows.iter().map(|r| r.true_value).sum::<f64>() / n;
        let ss_res: f64 = rows
            .iter()
            .map(|r| (r.true_value - r.predicted_value).powi(2))
            .sum();
        let ss_tot: f64 = rows
            .iter()
            .map(|r| (r.true_value - mean_true).powi(2))
            .sum();
        if ss_tot <= f64::EPSILON {
            // Constant target: perfect predictions score 1, anything
            // else is uninformative.
            return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
        }
        1.0 - ss_res / ss_tot
    }

    fn name(&self) -> &'static str {
        "r2"
    }
}

/// Mean detection confidence (vision variant). The collaborator
/// records the confidence in `predicted_value`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeanConfidence;

impl AccuracyProxy for MeanConfidence {
    fn compute(&self, rows: &[PredictionRecord]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        rows.iter().map(|r| r.predicted_value).sum::<f64>() / rows.len() as f64
    }

    fn name(&self) -> &'static str {
        "mean_confidence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelId;

    fn row(true_value: f64, predicted_value: f64) -> PredictionRecord {
        PredictionRecord {
            true_value,
            predicted_value,
            model_used: ModelId::new("lstm"),
            inference_time_ms: 1.0,
            energy_uj: 1000.0,
            histogram: None,
        }
    }

    #[test]
    fn test_r2_perfect_predictions() {
        let rows = vec![row(1.0, 1.0), row(2.0, 2.0), row(3.0, 3.0)];
        let r2 = RSquared.compute(&rows);
        assert!((r2 - 1.0).abs() < 1e-12);
        println!("[PASS] test_r2_perfect_predictions");
    }

    #[test]
    fn test_r2_mean_prediction_scores_zero() {
        // Predicting the mean of the target everywhere gives r2 = 0.
        let rows = vec![row(1.0, 2.0), row(2.0, 2.0), row(3.0, 2.0)];
        let r2 = RSquared.compute(&rows);
        assert!(r2.abs() < 1e-12);
        println!("[PASS] test_r2_mean_prediction_scores_zero");
    }

    #[test]
    fn test_r2_can_be_negative() {
        // Worse than predicting the mean.
        let rows = vec![row(1.0, 3.0), row(2.0, 2.0), row(3.0, 1.0)];
        assert!(RSquared.compute(&rows) < 0.0);
        println!("[PASS] test_r2_can_be_negative");
    }

    #[test]
    fn test_r2_constant_target() {
        let perfect = vec![row(2.0, 2.0), row(2.0, 2.0)];
        assert!((RSquared.compute(&perfect) - 1.0).abs() < f64::EPSILON);
        let imperfect = vec![row(2.0, 2.5), row(2.0, 2.0)];
        assert!(RSquared.compute(&imperfect).abs() < f64::EPSILON);
        println!("[PASS] test_r2_constant_target");
    }

    #[test]
    fn test_mean_confidence() {
        let rows = vec![row(0.0, 0.8), row(0.0, 0.6)];
        let conf = MeanConfidence.compute(&rows);
        assert!((conf - 0.7).abs() < 1e-12);
        println!("[PASS] test_mean_confidence");
    }

    #[test]
    fn test_empty_batch_scores_zero() {
        assert!(RSquared.compute(&[]).abs() < f64::EPSILON);
        assert!(MeanConfidence.compute(&[]).abs() < f64::EPSILON);
        println!("[PASS] test_empty_batch_scores_zero");
    }
}
