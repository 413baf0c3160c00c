// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from shard files on disk to device-resident
// tensor batches:
//
//   *.jsonl shards
//       │
//       ▼
//   JsonlShowerLoader → parses and length-checks each sample
//       │
//       ▼
//   ShowerDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   ShowerBatcher     → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the evaluation loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads .jsonl shards from a directory
pub mod loader;

/// Implements Burn's Dataset trait for shower samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Loader registry and the fixed evaluation loader settings
pub mod test_loader;
