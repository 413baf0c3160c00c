// ============================================================
// Layer 5 - Evaluation Loop
// ============================================================
// Drives inference over every batch of the held-out split and
// keeps everything the report and the analysis need:
//
//   per batch:
//     prediction = model(volumes)
//     loss       = loss_fn(prediction, target)
//     bias       = prediction − target
//     accumulate bias / prediction / target / sums / indices
//     total_loss       += loss      × batch_size
//     metric_totals[i] += metric_i  × batch_size
//
// The model runs on a plain (non-autodiff) backend, so no
// gradient graph is recorded. Batches are consumed exactly once
// in the order the source yields them. This module never logs;
// the caller decides what to report.
//
// Reference: Burn Book §5 (Training, validation step)

use burn::prelude::*;

use crate::data::batcher::ShowerBatch;
use crate::domain::error::EvalError;
use crate::ml::{loss::LossFn, metric::Metric, model::Predictor};

// ─── Accumulator ──────────────────────────────────────────────────────────────
/// Per-sample results, one chunk per batch. Chunks are only
/// concatenated when the accumulator is consumed.
pub struct Accumulator<B: Backend> {
    bias:    Vec<Tensor<B, 2>>,
    output:  Vec<Tensor<B, 2>>,
    target:  Vec<Tensor<B, 2>>,
    sums:    Vec<Tensor<B, 1>>,
    indices: Vec<Tensor<B, 1, Int>>,
    len:     usize,
}

impl<B: Backend> Default for Accumulator<B> {
    fn default() -> Self {
        Self {
            bias:    Vec::new(),
            output:  Vec::new(),
            target:  Vec::new(),
            sums:    Vec::new(),
            indices: Vec::new(),
            len:     0,
        }
    }
}

impl<B: Backend> Accumulator<B> {
    /// Samples accumulated so far
    pub fn len(&self) -> usize {
        self.len
    }

    /// Append one batch worth of results. All five must share the
    /// same leading dimension.
    pub fn push(
        &mut self,
        bias:    Tensor<B, 2>,
        output:  Tensor<B, 2>,
        target:  Tensor<B, 2>,
        sums:    Tensor<B, 1>,
        indices: Tensor<B, 1, Int>,
    ) -> Result<(), EvalError> {
        let dims = vec![
            bias.dims()[0],
            output.dims()[0],
            target.dims()[0],
            sums.dims()[0],
            indices.dims()[0],
        ];
        let n = dims[0];
        if dims.iter().any(|&d| d != n) {
            return Err(EvalError::BatchShape(dims));
        }

        self.bias.push(bias);
        self.output.push(output);
        self.target.push(target);
        self.sums.push(sums);
        self.indices.push(indices);
        self.len += n;
        Ok(())
    }

    /// Concatenate along the sample dimension and copy to the host.
    pub fn into_host(self) -> Result<HostResults, EvalError> {
        let num_outputs = self.output.first().map(|t| t.dims()[1]).unwrap_or(1);

        Ok(HostResults {
            bias:    float_host("bias", self.bias)?,
            output:  float_host("output", self.output)?,
            target:  float_host("target", self.target)?,
            sums:    float_host("sums", self.sums)?,
            indices: int_host("indices", self.indices)?,
            n_samples: self.len,
            num_outputs,
        })
    }
}

fn float_host<B: Backend, const D: usize>(
    what:   &'static str,
    chunks: Vec<Tensor<B, D>>,
) -> Result<Vec<f32>, EvalError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }
    Tensor::cat(chunks, 0)
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| EvalError::HostTransfer { what, reason: format!("{e:?}") })
}

fn int_host<B: Backend>(
    what:   &'static str,
    chunks: Vec<Tensor<B, 1, Int>>,
) -> Result<Vec<i64>, EvalError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }
    Tensor::cat(chunks, 0)
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| EvalError::HostTransfer { what, reason: format!("{e:?}") })
}

/// Accumulated results as plain host arrays. Float arrays with a
/// per-sample width (`bias`, `output`, `target`) are row-major
/// `[n_samples, num_outputs]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HostResults {
    pub bias:        Vec<f32>,
    pub output:      Vec<f32>,
    pub target:      Vec<f32>,
    pub sums:        Vec<f32>,
    pub indices:     Vec<i64>,
    pub n_samples:   usize,
    pub num_outputs: usize,
}

impl HostResults {
    /// One output column, one value per sample
    pub fn output_column(&self, col: usize) -> Vec<f32> {
        column(&self.output, self.num_outputs, col)
    }

    pub fn target_column(&self, col: usize) -> Vec<f32> {
        column(&self.target, self.num_outputs, col)
    }

    pub fn bias_column(&self, col: usize) -> Vec<f32> {
        column(&self.bias, self.num_outputs, col)
    }
}

fn column(values: &[f32], width: usize, col: usize) -> Vec<f32> {
    values.iter().skip(col).step_by(width.max(1)).copied().collect()
}

// ─── evaluate ─────────────────────────────────────────────────────────────────

/// Everything one pass over the data produced
pub struct EvalOutcome<B: Backend> {
    pub accumulator:   Accumulator<B>,
    pub total_loss:    f64,
    pub metric_totals: Vec<f64>,
    pub n_samples:     usize,
}

/// Run `model` over every batch and accumulate results.
///
/// A source with no batches yields zero totals and an empty
/// accumulator; dividing by `n_samples` is the caller's concern.
pub fn evaluate<B, P, I>(
    model:   &P,
    batches: I,
    loss_fn: LossFn<B>,
    metrics: &[Metric<B>],
    device:  &B::Device,
) -> Result<EvalOutcome<B>, EvalError>
where
    B: Backend,
    P: Predictor<B> + ?Sized,
    I: IntoIterator<Item = ShowerBatch<B>>,
{
    let mut accumulator   = Accumulator::default();
    let mut total_loss    = 0.0f64;
    let mut metric_totals = vec![0.0f64; metrics.len()];

    for batch in batches {
        let batch = batch.to_device(device);
        let batch_size = batch.volumes.dims()[0];

        let output = model.predict(batch.volumes);
        let loss: f64 = loss_fn(output.clone(), batch.targets.clone())
            .into_scalar()
            .elem::<f64>();
        let bias = output.clone() - batch.targets.clone();

        for (total, metric) in metric_totals.iter_mut().zip(metrics) {
            *total += (metric.func)(output.clone(), batch.targets.clone()) * batch_size as f64;
        }
        total_loss += loss * batch_size as f64;

        accumulator.push(bias, output, batch.targets, batch.sums, batch.indices)?;
    }

    let n_samples = accumulator.len();
    Ok(EvalOutcome { accumulator, total_loss, metric_totals, n_samples })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::data::dataloader::batcher::Batcher;
    use rand::Rng;

    use crate::data::batcher::ShowerBatcher;
    use crate::domain::{sample::{ShowerSample, VolumeShape}, summary::EvalSummary};
    use crate::ml::{loss::mse_loss, metric::MetricKind};

    type TestBackend = NdArray;

    const SHAPE: VolumeShape = VolumeShape::new(1, 2, 2);

    /// Predicts target + 0.5 by reading the target smuggled into the
    /// first cell of every volume.
    struct OffsetPredictor;

    impl<B: Backend> Predictor<B> for OffsetPredictor {
        fn predict(&self, volumes: Tensor<B, 4>) -> Tensor<B, 2> {
            let [n, _, _, _] = volumes.dims();
            volumes.slice([0..n, 0..1, 0..1, 0..1]).reshape([n, 1]) + 0.5
        }
    }

    fn batch(targets: &[f32], first_index: i64) -> ShowerBatch<TestBackend> {
        let mut rng = rand::thread_rng();
        let samples = targets
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let mut volume: Vec<f32> = (0..SHAPE.len()).map(|_| rng.gen()).collect();
                volume[0] = t;
                ShowerSample { volume, target: t, num: 2.0 * t, index: first_index + i as i64 }
            })
            .collect();
        ShowerBatcher::<TestBackend>::new(Default::default(), SHAPE).batch(samples)
    }

    /// Loss that reports 0.2 for batches of 3 and 0.8 otherwise
    fn staged_loss<B: Backend>(output: Tensor<B, 2>, _target: Tensor<B, 2>) -> Tensor<B, 1> {
        let value = if output.dims()[0] == 3 { 0.2 } else { 0.8 };
        Tensor::from_floats([value], &output.device())
    }

    #[test]
    fn test_two_sample_scenario() {
        let device = Default::default();
        let outcome = evaluate(
            &OffsetPredictor,
            vec![batch(&[1.0, 2.0], 0)],
            mse_loss::<TestBackend>,
            &[],
            &device,
        )
        .unwrap();

        assert_eq!(outcome.n_samples, 2);
        let summary = EvalSummary::from_totals(outcome.total_loss, &[], &[], outcome.n_samples).unwrap();
        assert!((summary.loss - 0.25).abs() < 1e-6);

        let host = outcome.accumulator.into_host().unwrap();
        assert_eq!(host.output, vec![1.5, 2.5]);
        assert_eq!(host.bias, vec![0.5, 0.5]);
        assert_eq!(host.target, vec![1.0, 2.0]);
        assert_eq!(host.sums, vec![2.0, 4.0]);
        assert_eq!(host.indices, vec![0, 1]);
    }

    #[test]
    fn test_empty_source() {
        let device = Default::default();
        let metrics = [MetricKind::Mae.metric::<TestBackend>()];
        let outcome = evaluate(
            &OffsetPredictor,
            Vec::<ShowerBatch<TestBackend>>::new(),
            mse_loss::<TestBackend>,
            &metrics,
            &device,
        )
        .unwrap();

        assert_eq!(outcome.n_samples, 0);
        assert_eq!(outcome.total_loss, 0.0);
        assert_eq!(outcome.metric_totals, vec![0.0]);
        assert_eq!(outcome.accumulator.len(), 0);

        let host = outcome.accumulator.into_host().unwrap();
        assert!(host.output.is_empty() && host.indices.is_empty());

        // the mean step refuses instead of producing NaN
        assert!(EvalSummary::from_totals(0.0, &[0.0], &["mae"], 0).is_err());
    }

    #[test]
    fn test_uneven_batches_are_sample_weighted() {
        let device = Default::default();
        let outcome = evaluate(
            &OffsetPredictor,
            vec![batch(&[1.0, 2.0, 3.0], 0), batch(&[4.0], 3)],
            staged_loss::<TestBackend>,
            &[],
            &device,
        )
        .unwrap();

        assert!((outcome.total_loss - 1.4).abs() < 1e-6);
        assert_eq!(outcome.n_samples, 4);
        let summary = EvalSummary::from_totals(outcome.total_loss, &[], &[], 4).unwrap();
        assert!((summary.loss - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_metric_totals_weighted_by_batch_size() {
        let device = Default::default();
        let metrics = [
            MetricKind::Mae.metric::<TestBackend>(),
            MetricKind::MeanBias.metric::<TestBackend>(),
        ];
        let outcome = evaluate(
            &OffsetPredictor,
            vec![batch(&[1.0, 2.0, 3.0], 0), batch(&[4.0], 3)],
            mse_loss::<TestBackend>,
            &metrics,
            &device,
        )
        .unwrap();

        // every sample is off by exactly 0.5
        assert!((outcome.metric_totals[0] - 2.0).abs() < 1e-6);
        assert!((outcome.metric_totals[1] - 2.0).abs() < 1e-6);
        assert!((outcome.total_loss - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_accumulators_keep_yield_order_and_bias() {
        let device = Default::default();
        let sizes = [5usize, 2, 7, 1];
        let mut next = 100i64;
        let mut batches: Vec<_> = sizes
            .iter()
            .map(|&n| {
                let targets: Vec<f32> = (0..n).map(|i| (next + i as i64) as f32).collect();
                let b = batch(&targets, next);
                next += n as i64;
                b
            })
            .collect();
        // yield newest first; the loop must not reorder
        batches.reverse();

        let outcome = evaluate(&OffsetPredictor, batches, mse_loss::<TestBackend>, &[], &device).unwrap();
        assert_eq!(outcome.n_samples, sizes.iter().sum::<usize>());

        let host = outcome.accumulator.into_host().unwrap();
        assert_eq!(host.output.len(), 15);
        assert_eq!(host.bias.len(), 15);
        assert_eq!(host.target.len(), 15);
        assert_eq!(host.sums.len(), 15);
        assert_eq!(host.indices.len(), 15);

        // batches were reversed, samples within each batch were not
        assert_eq!(&host.indices[..3], &[114, 107, 108]);
        for i in 0..15 {
            assert!((host.bias[i] - (host.output[i] - host.target[i])).abs() < 1e-6);
        }
    }

    #[test]
    fn test_push_rejects_mismatched_batch() {
        let device = Default::default();
        let mut acc = Accumulator::<TestBackend>::default();
        let two = Tensor::<TestBackend, 2>::zeros([2, 1], &device);
        let three = Tensor::<TestBackend, 2>::zeros([3, 1], &device);
        let err = acc
            .push(
                two.clone(),
                two,
                three,
                Tensor::zeros([2], &device),
                Tensor::zeros([2], &device),
            )
            .unwrap_err();
        assert!(matches!(err, EvalError::BatchShape(_)));
        assert_eq!(acc.len(), 0);
    }

    #[test]
    fn test_host_columns() {
        let host = HostResults {
            bias:        vec![],
            output:      vec![1.0, 10.0, 2.0, 20.0],
            target:      vec![0.0, 5.0, 0.0, 6.0],
            sums:        vec![0.0, 0.0],
            indices:     vec![0, 1],
            n_samples:   2,
            num_outputs: 2,
        };
        assert_eq!(host.output_column(0), vec![1.0, 2.0]);
        assert_eq!(host.target_column(1), vec![5.0, 6.0]);
    }
}
