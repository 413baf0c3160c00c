// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs, traits and error types that describe
// what the evaluation works on: detector samples, the
// aggregate results, and the ways things can go wrong.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Keeping it free of tensors means the reporting maths can be
// unit tested without any backend at all.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One detector sample and the shape of its energy-deposit volume
pub mod sample;

// Totals -> per-sample means, keyed by metric name
pub mod summary;

// Error kinds shared across layers
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
