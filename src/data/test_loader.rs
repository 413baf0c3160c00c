// ============================================================
// Layer 4 - Test Data Loader
// ============================================================
// Resolves `data_loader.type` from the config and builds the
// Burn DataLoader used for evaluation.
//
// Evaluation always uses the same loader settings, whatever
// the training config said:
//   batch size 512, no shuffling, no validation carve-out,
//   evaluation mode.
//
// Batches are cut from the dataset in order, so every batch
// holds 512 samples except possibly the last. Burn's worker
// pool is not used: it partitions the dataset per worker and
// would leave a short batch at the end of each partition.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use anyhow::Result;
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};
use serde::Deserialize;
use std::{path::PathBuf, sync::Arc};

use crate::data::{
    batcher::{ShowerBatch, ShowerBatcher},
    dataset::ShowerDataset,
    loader::JsonlShowerLoader,
};
use crate::domain::{
    error::RegistryError,
    sample::VolumeShape,
    traits::ShowerSource,
};

pub const TEST_BATCH_SIZE: usize = 512;

/// Detector geometry used when the config does not name one
pub const DEFAULT_VOLUME_SHAPE: [usize; 3] = [110, 11, 21];

/// Registered data loader types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLoaderKind {
    Shower,
}

impl DataLoaderKind {
    const NAMES: [&'static str; 1] = ["ShowerDataLoader"];

    pub fn from_name(name: &str) -> Result<Self, RegistryError> {
        match name {
            "ShowerDataLoader" => Ok(Self::Shower),
            other => Err(RegistryError::unknown("data loader", other, &Self::NAMES)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Shower => "ShowerDataLoader",
        }
    }
}

/// `data_loader.args`. Training-only keys (batch_size, shuffle,
/// validation_split, num_workers) are accepted and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ShowerLoaderArgs {
    pub data_dir: PathBuf,

    #[serde(default = "default_volume_shape")]
    pub volume_shape: [usize; 3],
}

fn default_volume_shape() -> [usize; 3] {
    DEFAULT_VOLUME_SHAPE
}

/// Resolved data source settings
#[derive(Debug, Clone)]
pub struct DataSpec {
    pub kind:     DataLoaderKind,
    pub data_dir: PathBuf,
    pub shape:    VolumeShape,
}

impl DataSpec {
    pub fn from_spec(kind: &str, args: &serde_json::Value) -> Result<Self, RegistryError> {
        let kind = DataLoaderKind::from_name(kind)?;
        let args: ShowerLoaderArgs = serde_json::from_value(args.clone()).map_err(|source| {
            RegistryError::InvalidArgs { kind: "data loader", name: kind.name().to_string(), source }
        })?;
        Ok(Self { kind, data_dir: args.data_dir, shape: args.volume_shape.into() })
    }
}

/// The built loader plus the number of samples behind it
pub struct TestDataLoader<B: Backend> {
    pub loader:    Arc<dyn DataLoader<ShowerBatch<B>>>,
    pub n_samples: usize,
}

/// Load the held-out split and wrap it in a Burn DataLoader
/// producing batches on `device`.
pub fn build_test_loader<B: Backend>(spec: &DataSpec, device: &B::Device) -> Result<TestDataLoader<B>> {
    let samples = match spec.kind {
        DataLoaderKind::Shower => JsonlShowerLoader::new(&spec.data_dir, spec.shape).load_all()?,
    };
    let dataset   = ShowerDataset::new(samples);
    let n_samples = dataset.len();

    // No .shuffle() and no .num_workers(): one ordered pass
    let batcher = ShowerBatcher::<B>::new(device.clone(), spec.shape);
    let loader  = DataLoaderBuilder::new(batcher)
        .batch_size(TEST_BATCH_SIZE)
        .build(dataset);

    Ok(TestDataLoader { loader, n_samples })
}
