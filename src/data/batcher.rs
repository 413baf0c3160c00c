// ============================================================
// Layer 4 - Shower Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ShowerSample>
// into the four co-indexed tensors the evaluation loop reads.
//
//   Input:  Vec of N ShowerSamples, each volume D*H*W cells
//   Output: ShowerBatch
//             volumes  [N, D, H, W]   float
//             targets  [N, 1]         float
//             sums     [N]            float
//             indices  [N]            int
//
// Every volume was length-checked by the loader, so the flat
// buffer always reshapes cleanly.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::{ShowerSample, VolumeShape};

// ─── ShowerBatch ──────────────────────────────────────────────────────────────
/// A batch of samples ready for the model forward pass.
/// All tensors have batch_size as their first dimension.
#[derive(Debug, Clone)]
pub struct ShowerBatch<B: Backend> {
    /// Energy deposits, depth first: [batch_size, depth, height, width]
    pub volumes: Tensor<B, 4>,

    /// True energies as floats: [batch_size, 1]
    pub targets: Tensor<B, 2>,

    /// Auxiliary sums: [batch_size]
    pub sums: Tensor<B, 1>,

    /// Sample indices in the source files: [batch_size]
    pub indices: Tensor<B, 1, Int>,
}

impl<B: Backend> ShowerBatch<B> {
    /// Leading dimension of each tensor, in field order
    pub fn batch_dims(&self) -> [usize; 4] {
        [
            self.volumes.dims()[0],
            self.targets.dims()[0],
            self.sums.dims()[0],
            self.indices.dims()[0],
        ]
    }

    /// Move all four tensors to `device` (a no-op when already resident)
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            volumes: self.volumes.to_device(device),
            targets: self.targets.to_device(device),
            sums:    self.sums.to_device(device),
            indices: self.indices.to_device(device),
        }
    }
}

// ─── ShowerBatcher ────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the
/// correct GPU/CPU, and the volume shape to reshape into.
#[derive(Clone, Debug)]
pub struct ShowerBatcher<B: Backend> {
    pub device: B::Device,
    pub shape:  VolumeShape,
}

impl<B: Backend> ShowerBatcher<B> {
    pub fn new(device: B::Device, shape: VolumeShape) -> Self {
        Self { device, shape }
    }
}

impl<B: Backend> Batcher<ShowerSample, ShowerBatch<B>> for ShowerBatcher<B> {
    fn batch(&self, items: Vec<ShowerSample>) -> ShowerBatch<B> {
        let n = items.len();
        let [depth, height, width] = self.shape.dims();

        let mut volume_flat = Vec::with_capacity(n * self.shape.len());
        let mut targets     = Vec::with_capacity(n);
        let mut sums        = Vec::with_capacity(n);
        let mut indices     = Vec::with_capacity(n);

        for s in items {
            volume_flat.extend_from_slice(&s.volume);
            targets.push(s.target);
            sums.push(s.num);
            indices.push(s.index);
        }

        let volumes = Tensor::<B, 4>::from_data(
            TensorData::new(volume_flat, [n, depth, height, width]),
            &self.device,
        );
        let targets = Tensor::<B, 2>::from_data(TensorData::new(targets, [n, 1]), &self.device);
        let sums    = Tensor::<B, 1>::from_data(TensorData::new(sums, [n]), &self.device);
        let indices = Tensor::<B, 1, Int>::from_data(TensorData::new(indices, [n]), &self.device);

        ShowerBatch { volumes, targets, sums, indices }
    }
}
