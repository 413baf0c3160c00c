// ============================================================
// Layer 2 - Test Use Case
// ============================================================
// Evaluates a trained checkpoint on the held-out split:
//
//   1. Plan devices (CPU, one GPU, or several replicas)
//   2. Build the test loader (batch 512, no shuffle)
//   3. Build the configured architecture and load its weights
//   4. Run the evaluation loop behind a progress bar
//   5. Log the per-sample means of loss and metrics
//   6. Hand the per-sample arrays to the analysis
//
// The backend is chosen once from the device plan; everything
// below `run` is generic over it.

use anyhow::{bail, Result};
use burn::backend::{ndarray::NdArrayDevice, NdArray};
use burn::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::data::test_loader::build_test_loader;
use crate::domain::summary::EvalSummary;
use crate::infra::{analysis::TestAnalysis, checkpoint::CheckpointManager, config::EvalConfig};
use crate::ml::{
    device::{prepare_device, probe_gpus, DevicePlan},
    evaluator::evaluate,
    metric::Metric,
    replicated::into_predictor,
};

pub struct TestUseCase {
    config: EvalConfig,
}

impl TestUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvalSummary> {
        let _span = tracing::info_span!("test", name = %self.config.name).entered();
        let cfg = &self.config;

        let plan = prepare_device(
            cfg.device_policy,
            cfg.n_gpu,
            cfg.device_ids.as_deref(),
            probe_gpus(),
        )?;
        tracing::info!("Device plan: {}", plan.describe());

        match plan {
            DevicePlan::Cpu => self.run::<NdArray>(&[NdArrayDevice::Cpu]),
            #[cfg(feature = "wgpu")]
            DevicePlan::Gpu(adapters) => {
                let devices: Vec<_> = adapters.iter().map(|a| a.wgpu_device()).collect();
                self.run::<burn::backend::Wgpu>(&devices)
            }
            #[cfg(not(feature = "wgpu"))]
            DevicePlan::Gpu(_) => bail!(crate::domain::error::DeviceError::GpuSupportDisabled),
        }
    }

    fn run<B: Backend>(&self, devices: &[B::Device]) -> Result<EvalSummary> {
        let cfg = &self.config;
        let Some(primary) = devices.first() else {
            bail!("Device plan holds no device");
        };

        // ── Step 1: Data ─────────────────────────────────────────────────────
        let test = build_test_loader::<B>(&cfg.data, primary)?;
        tracing::info!(
            "Test set: {} samples from '{}'",
            test.n_samples,
            cfg.data.data_dir.display()
        );

        // ── Step 2: Model ────────────────────────────────────────────────────
        let model = cfg.arch.init::<B>(primary);
        tracing::info!("{} with {} parameters", cfg.arch.name(), model.num_params());

        let model = match &cfg.resume {
            Some(path) => {
                let ckpt = CheckpointManager::new(path);
                tracing::info!("Loading checkpoint: {}", ckpt.file_path().display());
                ckpt.load_regressor::<B>(model, primary)?
            }
            None => {
                tracing::warn!("No --resume checkpoint given, evaluating freshly initialised weights");
                model
            }
        };
        let predictor = into_predictor(model, devices);

        // ── Step 3: Loss and metrics ─────────────────────────────────────────
        let loss_fn = cfg.loss.func::<B>();
        let metrics: Vec<Metric<B>> = cfg.metrics.iter().map(|m| m.metric::<B>()).collect();
        let metric_names: Vec<&str> = metrics.iter().map(|m| m.name).collect();
        tracing::info!("Loss: {}, metrics: [{}]", cfg.loss.name(), metric_names.join(", "));

        // ── Step 4: Evaluate ─────────────────────────────────────────────────
        let progress = ProgressBar::new(test.n_samples as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} samples")?,
        );
        let batches = test
            .loader
            .iter()
            .inspect(|batch| progress.inc(batch.batch_dims()[0] as u64));

        let outcome = evaluate(&*predictor, batches, loss_fn, &metrics, primary);
        progress.finish_and_clear();
        let outcome = outcome?;

        // ── Step 5: Report ───────────────────────────────────────────────────
        let summary = EvalSummary::from_totals(
            outcome.total_loss,
            &outcome.metric_totals,
            &metric_names,
            outcome.n_samples,
        )?;
        summary.log();
        if outcome.n_samples != test.n_samples {
            tracing::warn!(
                "Evaluated {} samples but the test set holds {}",
                outcome.n_samples,
                test.n_samples
            );
        }

        // ── Step 6: Analysis ─────────────────────────────────────────────────
        let host = outcome.accumulator.into_host()?;
        TestAnalysis::new(&cfg.analysis_dir, cfg.bins).evaluate_test(&host)?;

        Ok(summary)
    }
}
