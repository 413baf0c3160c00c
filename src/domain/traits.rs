// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer only needs "something that yields
// samples". JsonlShowerLoader is the one implementation today;
// the use case never sees its file format.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::sample::ShowerSample;

// ─── ShowerSource ─────────────────────────────────────────────────────────────
/// Any component that can load the full held-out split.
///
/// Implementations:
///   - JsonlShowerLoader → a directory of .jsonl shards
pub trait ShowerSource {
    /// Load every sample, in a stable order.
    fn load_all(&self) -> Result<Vec<ShowerSample>>;
}
