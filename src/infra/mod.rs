// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the use case but owned by no
// business layer:
//
//   config.rs     - config.json parsing and eager validation
//   logging.rs    - tracing subscriber set up from verbosity
//   checkpoint.rs - model weights via Burn's CompactRecorder
//   analysis.rs   - predictions CSV and bias histograms
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Run configuration
pub mod config;

/// Tracing subscriber
pub mod logging;

/// Model checkpoint loading (and saving)
pub mod checkpoint;

/// Post-run analysis files
pub mod analysis;
