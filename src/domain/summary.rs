// ============================================================
// Layer 3 - Evaluation Summary
// ============================================================
// Turns the running totals of the evaluation loop into the
// per-sample means that get logged:
//
//   loss        = total_loss        / n_samples
//   <metric_i>  = total_metric[i]   / n_samples
//
// Totals are sample weighted (each batch contributes
// value × batch_size) so these are exact per-sample means even
// when the final batch is smaller.

use serde::Serialize;

use crate::domain::error::EvalError;

/// Final loss / metric means, in metric registration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalSummary {
    pub loss:      f64,
    pub metrics:   Vec<(String, f64)>,
    pub n_samples: usize,
}

impl EvalSummary {
    /// Divide the totals by the sample count.
    ///
    /// An empty run is reported as [`EvalError::EmptyDataset`] instead of
    /// quietly producing NaN means.
    pub fn from_totals(
        total_loss:    f64,
        metric_totals: &[f64],
        metric_names:  &[&str],
        n_samples:     usize,
    ) -> Result<Self, EvalError> {
        if n_samples == 0 {
            return Err(EvalError::EmptyDataset);
        }
        debug_assert_eq!(metric_totals.len(), metric_names.len());

        let n = n_samples as f64;
        let metrics = metric_names
            .iter()
            .zip(metric_totals)
            .map(|(name, total)| (name.to_string(), total / n))
            .collect();

        Ok(Self { loss: total_loss / n, metrics, n_samples })
    }

    pub fn log(&self) {
        tracing::info!("{}", self);
    }
}

impl std::fmt::Display for EvalSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{loss: {:.6}", self.loss)?;
        for (name, value) in &self.metrics {
            write!(f, ", {name}: {value:.6}")?;
        }
        write!(f, "}}")
    }
}
