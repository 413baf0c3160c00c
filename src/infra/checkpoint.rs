// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Restores model weights with Burn's CompactRecorder.
//
// A checkpoint is one record file holding every learned
// parameter of the model:
//
//   saved/models/CaloEnergyRegression/
//     model_best.mpk      ← weights
//     config.json         ← the run's config
//
// `--resume` may name the file with or without its .mpk
// extension; the older .mpk.gz spelling is accepted too.
// Loading is type-safe: a record that does not match the
// architecture fails to load.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::model::Regressor;

const RECORD_EXTENSION: &str = ".mpk";
const LEGACY_EXTENSION: &str = ".mpk.gz";

/// A checkpoint file on disk
pub struct CheckpointManager {
    /// Path without the recorder's extension
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy();
        let stem = raw
            .strip_suffix(LEGACY_EXTENSION)
            .or_else(|| raw.strip_suffix(RECORD_EXTENSION))
            .unwrap_or(&raw);
        Self { path: PathBuf::from(stem) }
    }

    /// The record file as it exists on disk
    pub fn file_path(&self) -> PathBuf {
        PathBuf::from(format!("{}{RECORD_EXTENSION}", self.path.display()))
    }

    /// Directory holding the checkpoint (and usually its config.json)
    pub fn dir(&self) -> PathBuf {
        self.path.parent().map(Path::to_path_buf).unwrap_or_default()
    }

    /// Save weights. Tests use it to produce checkpoints to evaluate.
    #[cfg(test)]
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M) -> Result<()> {
        let recorder = CompactRecorder::new();
        Recorder::<B>::record(&recorder, model.clone().into_record(), self.path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", self.file_path().display())
            })?;
        tracing::debug!("Saved checkpoint '{}'", self.file_path().display());
        Ok(())
    }

    /// Replace every parameter of `model` with the checkpoint's.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let recorder = CompactRecorder::new();
        let record: M::Record = Recorder::<B>::load(&recorder, self.path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'", self.file_path().display())
            })?;
        Ok(model.load_record(record))
    }

    /// Load into whichever architecture was built from the config
    pub fn load_regressor<B: Backend>(&self, model: Regressor<B>, device: &B::Device) -> Result<Regressor<B>> {
        Ok(match model {
            Regressor::Mlp(m)  => Regressor::Mlp(self.load_model::<B, _>(m, device)?),
            Regressor::Conv(m) => Regressor::Conv(self.load_model::<B, _>(m, device)?),
        })
    }
}
