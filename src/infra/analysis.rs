// ============================================================
// Layer 6 - Test Analysis
// ============================================================
// Turns the per-sample host arrays of a finished run into
// files for later study:
//
//   <output_dir>/predictions.csv
//     index,target,output,bias,sum
//     17,52.300000,51.870000,-0.430000,48.120000
//     ...
//
//   <output_dir>/analysis.json
//     mean / std of the bias, mean / std of bias ÷ target
//     ("relative resolution") and a histogram of each
//
// Samples whose target is exactly zero have no relative bias
// and are left out of the relative statistics only.
// Multi-output models are analysed on their first output.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
};

use crate::ml::evaluator::HostResults;

/// Equal-width bins over the observed [lo, hi] range.
/// `edges` holds the lower edge of every bin plus the upper
/// edge of the last.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub lo:     f64,
    pub hi:     f64,
    pub edges:  Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn build(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        if values.is_empty() {
            return Self { lo: 0.0, hi: 0.0, edges: vec![0.0; bins + 1], counts: vec![0; bins] };
        }

        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let width = (hi - lo) / bins as f64;

        let mut counts = vec![0usize; bins];
        for &v in values {
            let slot = if width > 0.0 {
                (((v - lo) / width) as usize).min(bins - 1)
            } else {
                0
            };
            counts[slot] += 1;
        }
        let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
        Self { lo, hi, edges, counts }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub n_samples:               usize,
    pub n_relative:              usize,
    pub mean_bias:               f64,
    pub bias_std:                f64,
    pub mean_relative_bias:      f64,
    pub relative_resolution:     f64,
    pub bias_histogram:          Histogram,
    pub relative_bias_histogram: Histogram,
}

pub struct TestAnalysis {
    output_dir: PathBuf,
    bins:       usize,
}

impl TestAnalysis {
    pub fn new(output_dir: impl Into<PathBuf>, bins: usize) -> Self {
        Self { output_dir: output_dir.into(), bins }
    }

    /// Write predictions.csv and analysis.json, then log the summary.
    pub fn evaluate_test(&self, results: &HostResults) -> Result<AnalysisReport> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Cannot create analysis dir '{}'", self.output_dir.display())
        })?;

        tracing::debug!("Analysing {} samples", results.n_samples);
        let output = results.output_column(0);
        let target = results.target_column(0);
        let bias   = results.bias_column(0);
        self.write_predictions(results, &output, &target, &bias)?;

        let report = self.report(&target, &bias);
        let json_path = self.output_dir.join("analysis.json");
        fs::write(&json_path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Cannot write '{}'", json_path.display()))?;

        tracing::info!(
            "Bias {:.4} ± {:.4}, relative bias {:.4}, relative resolution {:.4} ({} samples)",
            report.mean_bias,
            report.bias_std,
            report.mean_relative_bias,
            report.relative_resolution,
            report.n_samples,
        );
        if report.n_relative < report.n_samples {
            tracing::debug!(
                "{} zero-target sample(s) left out of relative statistics",
                report.n_samples - report.n_relative
            );
        }
        tracing::info!("Analysis written to '{}'", self.output_dir.display());
        Ok(report)
    }

    fn write_predictions(
        &self,
        results: &HostResults,
        output:  &[f32],
        target:  &[f32],
        bias:    &[f32],
    ) -> Result<()> {
        let csv_path = self.output_dir.join("predictions.csv");
        let file = File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "index,target,output,bias,sum")?;
        for (i, ((&out, &tgt), &b)) in output.iter().zip(target).zip(bias).enumerate() {
            let index = results.indices.get(i).copied().unwrap_or(i as i64);
            let sum = results.sums.get(i).copied().unwrap_or(0.0);
            writeln!(w, "{},{:.6},{:.6},{:.6},{:.6}", index, tgt, out, b, sum)?;
        }
        w.flush()?;
        tracing::debug!("Wrote {} rows to '{}'", output.len(), csv_path.display());
        Ok(())
    }

    fn report(&self, target: &[f32], bias: &[f32]) -> AnalysisReport {
        let bias: Vec<f64> = bias.iter().map(|&b| b as f64).collect();
        let relative: Vec<f64> = bias
            .iter()
            .zip(target)
            .filter(|(_, t)| **t != 0.0)
            .map(|(b, &t)| b / t as f64)
            .collect();

        let (mean_bias, bias_std) = mean_std(&bias);
        let (mean_relative_bias, relative_resolution) = mean_std(&relative);

        AnalysisReport {
            n_samples: bias.len(),
            n_relative: relative.len(),
            mean_bias,
            bias_std,
            mean_relative_bias,
            relative_resolution,
            bias_histogram: Histogram::build(&bias, self.bins),
            relative_bias_histogram: Histogram::build(&relative, self.bins),
        }
    }
}

/// Population mean and standard deviation; (0, 0) when empty
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
