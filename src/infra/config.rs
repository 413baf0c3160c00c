// ============================================================
// Layer 6 - Configuration
// ============================================================
// Reads the run's JSON config and resolves every name in it
// against the registries before anything else happens, so a
// typo in "loss" fails at startup rather than after the data
// has been loaded.
//
// Example config.json:
//   {
//     "name": "CaloEnergyRegression",
//     "n_gpu": 1,
//     "arch": { "type": "ConvRegressor",
//               "args": { "depth": 110, "height": 11, "width": 21 } },
//     "data_loader": { "type": "ShowerDataLoader",
//                      "args": { "data_dir": "data/test" } },
//     "loss": "mse_loss",
//     "metrics": ["mae", "mean_bias"]
//   }
//
// Keys used only for training (optimizer, trainer, ...) are
// ignored. When no `-c` is given the config.json saved next to
// the checkpoint is used.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::{Path, PathBuf}};

use crate::data::test_loader::DataSpec;
use crate::domain::error::ConfigError;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    device::DevicePolicy,
    loss::LossKind,
    metric::MetricKind,
    model::ArchSpec,
};

/// Inputs from the command line, free of any clap types
#[derive(Debug, Clone, Default)]
pub struct ConfigArgs {
    pub config: Option<PathBuf>,
    pub resume: Option<PathBuf>,
    pub device: Option<String>,
}

/// `{"type": ..., "args": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisSection {
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub bins: Option<usize>,
}

/// The config file as written
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default = "default_n_gpu")]
    n_gpu: usize,
    #[serde(default)]
    device_policy: DevicePolicy,
    #[serde(default = "default_verbosity")]
    verbosity: u8,
    arch: ObjectSpec,
    data_loader: ObjectSpec,
    loss: String,
    #[serde(default)]
    metrics: Vec<String>,
    #[serde(default)]
    analysis: AnalysisSection,
}

fn default_name() -> String { "CaloEnergyRegression".to_string() }
fn default_n_gpu() -> usize { 1 }
fn default_verbosity() -> u8 { 1 }

pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

/// Fully resolved configuration for one evaluation run
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub name:          String,
    pub n_gpu:         usize,
    pub device_policy: DevicePolicy,
    pub verbosity:     u8,
    pub arch:          ArchSpec,
    pub data:          DataSpec,
    pub loss:          LossKind,
    pub metrics:       Vec<MetricKind>,
    pub analysis_dir:  PathBuf,
    pub bins:          usize,
    pub resume:        Option<PathBuf>,
    pub device_ids:    Option<Vec<usize>>,
    pub source:        PathBuf,
}

impl EvalConfig {
    /// Locate, read and validate the config for this run.
    pub fn from_args(args: ConfigArgs) -> Result<Self> {
        let path = match (&args.config, &args.resume) {
            (Some(cfg), _) => cfg.clone(),
            (None, Some(resume)) => {
                let beside = CheckpointManager::new(resume).dir().join("config.json");
                if !beside.exists() {
                    return Err(ConfigError::NoConfigBesideCheckpoint(beside).into());
                }
                beside
            }
            (None, None) => return Err(ConfigError::MissingConfig.into()),
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        let mut cfg = Self::from_json(&text, &path)?;

        cfg.resume = args.resume;
        cfg.device_ids = args.device.as_deref().map(parse_device_list).transpose()?;
        Ok(cfg)
    }

    /// Parse and validate config text. `source` is only used in messages.
    pub fn from_json(text: &str, source: &Path) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)
            .with_context(|| format!("Malformed config '{}'", source.display()))?;

        let arch = ArchSpec::from_spec(&raw.arch.kind, &raw.arch.args)?;
        let data = DataSpec::from_spec(&raw.data_loader.kind, &raw.data_loader.args)?;
        let loss = LossKind::from_name(&raw.loss)?;
        let metrics = raw
            .metrics
            .iter()
            .map(|m| MetricKind::from_name(m))
            .collect::<Result<Vec<_>, _>>()?;

        if arch.input_shape() != data.shape {
            return Err(ConfigError::ShapeMismatch {
                arch: arch.input_shape().to_string(),
                data: data.shape.to_string(),
            }
            .into());
        }

        let analysis_dir = raw
            .analysis
            .output_dir
            .unwrap_or_else(|| PathBuf::from("saved/analysis").join(&raw.name));

        Ok(Self {
            name:          raw.name,
            n_gpu:         raw.n_gpu,
            device_policy: raw.device_policy,
            verbosity:     raw.verbosity,
            arch,
            data,
            loss,
            metrics,
            analysis_dir,
            bins:          raw.analysis.bins.unwrap_or(DEFAULT_HISTOGRAM_BINS).max(1),
            resume:        None,
            device_ids:    None,
            source:        source.to_path_buf(),
        })
    }
}

/// "0,2" → [0, 2]
pub fn parse_device_list(s: &str) -> Result<Vec<usize>, ConfigError> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<usize>().map_err(|_| ConfigError::BadDeviceList(s.to_string())))
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::RegistryError;
    use crate::domain::sample::VolumeShape;
    use serde_json::json;

    fn config_json(loss: &str, arch_depth: usize) -> String {
        json!({
            "name": "Calo",
            "n_gpu": 2,
            "arch": {"type": "MlpRegressor",
                     "args": {"depth": arch_depth, "height": 11, "width": 21, "hidden": 32, "num_outputs": 1}},
            "data_loader": {"type": "ShowerDataLoader",
                            "args": {"data_dir": "data/test", "batch_size": 64, "shuffle": true}},
            "loss": loss,
            "metrics": ["mae", "rmse"],
            "optimizer": {"type": "Adam", "args": {"lr": 0.001}},
            "trainer": {"epochs": 100}
        })
        .to_string()
    }

    #[test]
    fn test_parses_and_resolves() {
        let cfg = EvalConfig::from_json(&config_json("mse_loss", 110), Path::new("c.json")).unwrap();
        assert_eq!(cfg.name, "Calo");
        assert_eq!(cfg.n_gpu, 2);
        assert_eq!(cfg.device_policy, DevicePolicy::Auto);
        assert_eq!(cfg.loss, LossKind::Mse);
        assert_eq!(cfg.metrics, vec![MetricKind::Mae, MetricKind::Rmse]);
        assert_eq!(cfg.data.shape, VolumeShape::new(110, 11, 21));
        assert_eq!(cfg.analysis_dir, PathBuf::from("saved/analysis/Calo"));
        assert_eq!(cfg.bins, DEFAULT_HISTOGRAM_BINS);
    }

    #[test]
    fn test_unknown_loss_fails_at_load() {
        let err = EvalConfig::from_json(&config_json("focal_loss", 110), Path::new("c.json")).unwrap_err();
        let reg = err.downcast_ref::<RegistryError>().unwrap();
        assert!(matches!(reg, RegistryError::UnknownName { kind: "loss", .. }));
    }

    #[test]
    fn test_arch_and_data_shapes_must_agree() {
        let err = EvalConfig::from_json(&config_json("mse_loss", 50), Path::new("c.json")).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_config_found_beside_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("config.json"), config_json("l1_loss", 110)).unwrap();

        let cfg = EvalConfig::from_args(ConfigArgs {
            config: None,
            resume: Some(tmp.path().join("model_best.mpk")),
            device: Some("1, 0".to_string()),
        })
        .unwrap();
        assert_eq!(cfg.loss, LossKind::L1);
        assert_eq!(cfg.device_ids, Some(vec![1, 0]));
        assert_eq!(cfg.source, tmp.path().join("config.json"));
    }

    #[test]
    fn test_no_config_anywhere() {
        let err = EvalConfig::from_args(ConfigArgs::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::MissingConfig)));
    }

    #[test]
    fn test_bad_device_list() {
        assert_eq!(parse_device_list("0,3").unwrap(), vec![0, 3]);
        assert!(parse_device_list("gpu0").is_err());
    }
}
