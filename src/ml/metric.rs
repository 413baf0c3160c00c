// ============================================================
// Layer 5 - Metric Registry
// ============================================================
// Named metric functions, resolved from the config's "metrics"
// list. Each reads its batch value back to the host as f64.

use burn::prelude::*;

use crate::domain::error::RegistryError;

/// A resolved metric: the name it is reported under and its function
pub struct Metric<B: Backend> {
    pub name: &'static str,
    pub func: fn(Tensor<B, 2>, Tensor<B, 2>) -> f64,
}

impl<B: Backend> Clone for Metric<B> {
    fn clone(&self) -> Self {
        Self { name: self.name, func: self.func }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Mse,
    Mae,
    Rmse,
    MeanBias,
    MeanRelativeError,
}

impl MetricKind {
    const NAMES: [&'static str; 5] = ["mse", "mae", "rmse", "mean_bias", "mean_relative_error"];

    pub fn from_name(name: &str) -> Result<Self, RegistryError> {
        match name {
            "mse"                 => Ok(Self::Mse),
            "mae"                 => Ok(Self::Mae),
            "rmse"                => Ok(Self::Rmse),
            "mean_bias"           => Ok(Self::MeanBias),
            "mean_relative_error" => Ok(Self::MeanRelativeError),
            other => Err(RegistryError::unknown("metric", other, &Self::NAMES)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mse               => "mse",
            Self::Mae               => "mae",
            Self::Rmse              => "rmse",
            Self::MeanBias          => "mean_bias",
            Self::MeanRelativeError => "mean_relative_error",
        }
    }

    pub fn metric<B: Backend>(&self) -> Metric<B> {
        let func: fn(Tensor<B, 2>, Tensor<B, 2>) -> f64 = match self {
            Self::Mse               => mse::<B>,
            Self::Mae               => mae::<B>,
            Self::Rmse              => rmse::<B>,
            Self::MeanBias          => mean_bias::<B>,
            Self::MeanRelativeError => mean_relative_error::<B>,
        };
        Metric { name: self.name(), func }
    }
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> f64 {
    t.into_scalar().elem::<f64>()
}

pub fn mse<B: Backend>(output: Tensor<B, 2>, target: Tensor<B, 2>) -> f64 {
    scalar((output - target).powf_scalar(2.0).mean())
}

pub fn mae<B: Backend>(output: Tensor<B, 2>, target: Tensor<B, 2>) -> f64 {
    scalar((output - target).abs().mean())
}

pub fn rmse<B: Backend>(output: Tensor<B, 2>, target: Tensor<B, 2>) -> f64 {
    mse(output, target).sqrt()
}

pub fn mean_bias<B: Backend>(output: Tensor<B, 2>, target: Tensor<B, 2>) -> f64 {
    scalar((output - target).mean())
}

/// mean(|output − target| / |target|) over samples with a non-zero
/// target. A batch whose targets are all zero scores 0.
pub fn mean_relative_error<B: Backend>(output: Tensor<B, 2>, target: Tensor<B, 2>) -> f64 {
    let zero = target.clone().equal_elem(0.0);
    let kept = scalar(zero.clone().bool_not().float().sum());
    if kept == 0.0 {
        return 0.0;
    }

    let error = (output - target.clone()).abs().mask_fill(zero.clone(), 0.0);
    let denom = target.abs().mask_fill(zero, 1.0);
    scalar((error / denom).sum()) / kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn pair() -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 2>) {
        let device = Default::default();
        (
            Tensor::<TestBackend, 1>::from_floats([3.0, 1.0], &device).reshape([2, 1]),
            Tensor::<TestBackend, 1>::from_floats([2.0, 2.0], &device).reshape([2, 1]),
        )
    }

    #[test]
    fn test_values() {
        let (o, t) = pair();
        assert!((mse(o.clone(), t.clone()) - 1.0).abs() < 1e-6);
        assert!((mae(o.clone(), t.clone()) - 1.0).abs() < 1e-6);
        assert!((rmse(o.clone(), t.clone()) - 1.0).abs() < 1e-6);
        assert!(mean_bias(o.clone(), t.clone()).abs() < 1e-6);
        assert!((mean_relative_error(o, t) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_relative_error_skips_zero_targets() {
        let device = Default::default();
        let o = Tensor::<TestBackend, 1>::from_floats([3.0, 5.0, 1.0], &device).reshape([3, 1]);
        let t = Tensor::<TestBackend, 1>::from_floats([2.0, 0.0, 4.0], &device).reshape([3, 1]);
        // (0.5 + 0.75) / 2
        let value = mean_relative_error(o, t);
        assert!(value.is_finite());
        assert!((value - 0.625).abs() < 1e-6);

        let o = Tensor::<TestBackend, 2>::ones([2, 1], &device);
        let t = Tensor::<TestBackend, 2>::zeros([2, 1], &device);
        assert_eq!(mean_relative_error(o, t), 0.0);
    }

    #[test]
    fn test_registry_names_round_trip() {
        for name in MetricKind::NAMES {
            let kind = MetricKind::from_name(name).unwrap();
            assert_eq!(kind.metric::<TestBackend>().name, name);
        }
        assert!(MetricKind::from_name("accuracy").is_err());
    }
}
