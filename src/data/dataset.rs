use burn::data::dataset::Dataset;

use crate::domain::sample::ShowerSample;

/// The held-out split, kept in memory in load order.
pub struct ShowerDataset {
    samples: Vec<ShowerSample>,
}

impl ShowerDataset {
    pub fn new(samples: Vec<ShowerSample>) -> Self { Self { samples } }
}

impl Dataset<ShowerSample> for ShowerDataset {
    fn get(&self, index: usize) -> Option<ShowerSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
