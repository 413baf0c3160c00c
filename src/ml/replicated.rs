// ============================================================
// Layer 5 - Data-Parallel Replication
// ============================================================
// When the device plan holds more than one GPU, the loaded
// model is copied to every device. Each batch is split along
// the sample dimension, every replica predicts its share on
// its own device, and the pieces are concatenated back on the
// primary device in their original order.
//
// Weights are loaded into the bare model before it is wrapped,
// so checkpoints are the same with or without replication.

use burn::prelude::*;

use crate::ml::model::{Predictor, Regressor};

pub struct Replicated<B: Backend, M> {
    replicas: Vec<(B::Device, M)>,
    primary:  B::Device,
}

impl<B: Backend, M: Module<B>> Replicated<B, M> {
    /// Copy `model` onto every device; the first one is the primary.
    pub fn new(model: M, devices: &[B::Device]) -> Self {
        assert!(!devices.is_empty(), "replication needs at least one device");
        let replicas = devices
            .iter()
            .map(|device| (device.clone(), model.clone().fork(device)))
            .collect();
        Self { replicas, primary: devices[0].clone() }
    }

    pub fn num_replicas(&self) -> usize {
        self.replicas.len()
    }
}

impl<B: Backend, M: Module<B> + Predictor<B>> Predictor<B> for Replicated<B, M> {
    fn predict(&self, volumes: Tensor<B, 4>) -> Tensor<B, 2> {
        let batch_size = volumes.dims()[0];
        let parts = self.replicas.len().min(batch_size).max(1);

        let outputs = volumes
            .chunk(parts, 0)
            .into_iter()
            .zip(&self.replicas)
            .map(|(chunk, (device, replica))| {
                replica
                    .predict(chunk.to_device(device))
                    .to_device(&self.primary)
            })
            .collect();

        Tensor::cat(outputs, 0)
    }
}

/// Wrap a loaded model for inference: bare on a single device,
/// replicated when the plan has several.
pub fn into_predictor<B: Backend>(model: Regressor<B>, devices: &[B::Device]) -> Box<dyn Predictor<B>> {
    fn wrap<B: Backend, M: Module<B> + Predictor<B> + 'static>(
        model: M,
        devices: &[B::Device],
    ) -> Box<dyn Predictor<B>> {
        if devices.len() > 1 {
            let replicated = Replicated::<B, M>::new(model, devices);
            tracing::info!("Replicating the model over {} devices", replicated.num_replicas());
            Box::new(replicated)
        } else {
            Box::new(model)
        }
    }

    match model {
        Regressor::Mlp(m)  => wrap(m, devices),
        Regressor::Conv(m) => wrap(m, devices),
    }
}
