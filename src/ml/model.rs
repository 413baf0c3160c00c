use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::{error::RegistryError, sample::VolumeShape};

/// Anything that maps a batch of volumes `[n, depth, height, width]`
/// to predictions `[n, num_outputs]`. Implemented by every architecture
/// and by the data-parallel wrapper.
pub trait Predictor<B: Backend> {
    fn predict(&self, volumes: Tensor<B, 4>) -> Tensor<B, 2>;
}

// ─── MlpRegressor ─────────────────────────────────────────────────────────────

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
#[derive(Config, Debug)]
pub struct MlpRegressorConfig {
    pub depth:  usize,
    pub height: usize,
    pub width:  usize,
    #[config(default = 256)]
    pub hidden: usize,
    #[config(default = 1)]
    pub num_outputs: usize,
}

impl MlpRegressorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpRegressor<B> {
        let input = self.depth * self.height * self.width;
        MlpRegressor {
            fc1:  LinearConfig::new(input, self.hidden).init(device),
            fc2:  LinearConfig::new(self.hidden, self.hidden / 2).init(device),
            head: LinearConfig::new(self.hidden / 2, self.num_outputs).init(device),
        }
    }
}

/// Flattens the whole volume and regresses through two hidden layers.
#[derive(Module, Debug)]
pub struct MlpRegressor<B: Backend> {
    pub fc1:  Linear<B>,
    pub fc2:  Linear<B>,
    pub head: Linear<B>,
}

impl<B: Backend> MlpRegressor<B> {
    /// volumes: [batch, depth, height, width] → [batch, num_outputs]
    pub fn forward(&self, volumes: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = volumes.flatten::<2>(1, 3);
        let x = relu(self.fc1.forward(x));
        let x = relu(self.fc2.forward(x));
        self.head.forward(x)
    }
}

impl<B: Backend> Predictor<B> for MlpRegressor<B> {
    fn predict(&self, volumes: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward(volumes)
    }
}

// ─── ConvRegressor ────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct ConvRegressorConfig {
    pub depth:  usize,
    pub height: usize,
    pub width:  usize,
    #[config(default = 64)]
    pub channels: usize,
    #[config(default = 3)]
    pub kernel_size: usize,
    #[config(default = 128)]
    pub hidden: usize,
    #[config(default = 1)]
    pub num_outputs: usize,
}

impl ConvRegressorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvRegressor<B> {
        let k = [self.kernel_size, self.kernel_size];
        ConvRegressor {
            conv1: Conv2dConfig::new([self.depth, self.channels], k)
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            conv2: Conv2dConfig::new([self.channels, self.channels], k)
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            fc:    LinearConfig::new(self.channels, self.hidden).init(device),
            head:  LinearConfig::new(self.hidden, self.num_outputs).init(device),
        }
    }
}

/// Treats the depth layers as input channels of a 2D convolution over
/// the (height, width) face, then pools the face away.
#[derive(Module, Debug)]
pub struct ConvRegressor<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub fc:    Linear<B>,
    pub head:  Linear<B>,
}

impl<B: Backend> ConvRegressor<B> {
    /// volumes: [batch, depth, height, width] → [batch, num_outputs]
    pub fn forward(&self, volumes: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.conv1.forward(volumes));
        let x = relu(self.conv2.forward(x)); // [batch, channels, h, w]
        let [batch, channels, _, _] = x.dims();

        // Global average over the face
        let x = x.mean_dim(3).mean_dim(2).reshape([batch, channels]);
        let x = relu(self.fc.forward(x));
        self.head.forward(x)
    }
}

impl<B: Backend> Predictor<B> for ConvRegressor<B> {
    fn predict(&self, volumes: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward(volumes)
    }
}

// ─── Architecture registry ────────────────────────────────────────────────────

/// `arch.type` + `arch.args`, resolved and validated at config load.
#[derive(Debug, Clone)]
pub enum ArchSpec {
    Mlp(MlpRegressorConfig),
    Conv(ConvRegressorConfig),
}

impl ArchSpec {
    const NAMES: [&'static str; 2] = ["MlpRegressor", "ConvRegressor"];

    pub fn from_spec(kind: &str, args: &serde_json::Value) -> Result<Self, RegistryError> {
        let invalid = |source| RegistryError::InvalidArgs {
            kind: "arch",
            name: kind.to_string(),
            source,
        };
        match kind {
            "MlpRegressor"  => Ok(Self::Mlp(serde_json::from_value(args.clone()).map_err(invalid)?)),
            "ConvRegressor" => Ok(Self::Conv(serde_json::from_value(args.clone()).map_err(invalid)?)),
            other => Err(RegistryError::unknown("arch", other, &Self::NAMES)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mlp(_)  => "MlpRegressor",
            Self::Conv(_) => "ConvRegressor",
        }
    }

    /// Volume shape the architecture was configured for
    pub fn input_shape(&self) -> VolumeShape {
        match self {
            Self::Mlp(c)  => VolumeShape::new(c.depth, c.height, c.width),
            Self::Conv(c) => VolumeShape::new(c.depth, c.height, c.width),
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Regressor<B> {
        match self {
            Self::Mlp(c)  => Regressor::Mlp(c.init(device)),
            Self::Conv(c) => Regressor::Conv(c.init(device)),
        }
    }
}

/// A built model of whichever registered architecture the config named.
#[derive(Debug)]
pub enum Regressor<B: Backend> {
    Mlp(MlpRegressor<B>),
    Conv(ConvRegressor<B>),
}

impl<B: Backend> Regressor<B> {
    pub fn num_params(&self) -> usize {
        match self {
            Self::Mlp(m)  => m.num_params(),
            Self::Conv(m) => m.num_params(),
        }
    }
}
