// ============================================================
// Layer 3 - ShowerSample Domain Type
// ============================================================
// One calorimeter reading: the energy deposited in every cell
// of a [depth, height, width] volume, the true shower energy
// the model should predict, an auxiliary sum carried through
// untouched for the analysis step, and the sample's index in
// the source files so results can be traced back.

use serde::{Deserialize, Serialize};

/// Shape of one detector volume. The model sees it as
/// `[depth, height, width]`, with depth used as the channel axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeShape {
    pub depth:  usize,
    pub height: usize,
    pub width:  usize,
}

impl VolumeShape {
    pub const fn new(depth: usize, height: usize, width: usize) -> Self {
        Self { depth, height, width }
    }

    /// Number of cells in one volume
    pub fn len(&self) -> usize {
        self.depth * self.height * self.width
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.depth, self.height, self.width]
    }
}

impl From<[usize; 3]> for VolumeShape {
    fn from([depth, height, width]: [usize; 3]) -> Self {
        Self::new(depth, height, width)
    }
}

impl std::fmt::Display for VolumeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}]", self.depth, self.height, self.width)
    }
}

/// A single held-out sample, already validated against its volume shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowerSample {
    /// Flattened energy deposits, row-major over [depth, height, width]
    pub volume: Vec<f32>,

    /// Ground-truth energy
    pub target: f32,

    /// Auxiliary sum (number of showers in the event)
    pub num: f32,

    /// Position of the sample in the source files
    pub index: i64,
}
