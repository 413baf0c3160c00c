// ============================================================
// Layer 5 - ML Layer (Burn)
// ============================================================
// All tensor maths lives here:
//
//   model.rs      - regression architectures + arch registry
//   loss.rs       - named loss functions
//   metric.rs     - named metric functions
//   evaluator.rs  - the inference / accumulation loop
//   replicated.rs - data-parallel wrapper for several GPUs
//   device.rs     - GPU probing and the explicit device plan
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Regression architectures and the `Predictor` trait
pub mod model;

/// Loss registry
pub mod loss;

/// Metric registry
pub mod metric;

/// Evaluation loop and result accumulation
pub mod evaluator;

/// Batch splitting over several devices
pub mod replicated;

/// Device policy, probing and planning
pub mod device;
