// ============================================================
// Layer 3 - Error Kinds
// ============================================================
// Typed errors for the failures callers may want to match on.
// Everything else travels as anyhow::Error with context added
// at the layer boundary.
//
// Reference: Rust Book §9 (Error Handling), thiserror docs

use std::path::PathBuf;
use thiserror::Error;

/// A name in the config that does not resolve to a registered
/// architecture, data loader, loss or metric.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown {kind} '{name}' (known: {known})")]
    UnknownName {
        kind:  &'static str,
        name:  String,
        known: String,
    },

    #[error("invalid arguments for {kind} '{name}': {source}")]
    InvalidArgs {
        kind:   &'static str,
        name:   String,
        #[source]
        source: serde_json::Error,
    },
}

impl RegistryError {
    pub fn unknown(kind: &'static str, name: &str, known: &[&str]) -> Self {
        Self::UnknownName {
            kind,
            name:  name.to_string(),
            known: known.join(", "),
        }
    }
}

#[derive(Debug, Error)]
pub enum EvalError {
    /// Means are undefined when nothing was evaluated.
    #[error("no samples were evaluated; loss and metric means are undefined")]
    EmptyDataset,

    #[error("batch tensors disagree on batch size: {0:?}")]
    BatchShape(Vec<usize>),

    #[error("could not read {what} back to the host: {reason}")]
    HostTransfer { what: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file need to be specified. Add '-c config.json', for example.")]
    MissingConfig,

    #[error("cannot find config '{0}' next to the checkpoint; pass it with '-c'")]
    NoConfigBesideCheckpoint(PathBuf),

    #[error("arch expects volumes of shape {arch} but data_loader provides {data}")]
    ShapeMismatch { arch: String, data: String },

    #[error("invalid GPU index list '{0}', expected comma separated integers")]
    BadDeviceList(String),
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device_policy is 'gpu' but no GPU adapter is visible")]
    NoGpu,

    #[error("this binary was built without GPU support (enable the 'wgpu' feature)")]
    GpuSupportDisabled,
}
