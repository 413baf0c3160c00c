// ============================================================
// Layer 5 - Loss Registry
// ============================================================
// Named loss functions, resolved from the config's "loss" key.
// Each returns the batch mean as a one-element tensor; the
// evaluation loop weights it by batch size.

use burn::{
    nn::loss::{MseLoss, Reduction},
    prelude::*,
};

use crate::domain::error::RegistryError;

/// `(prediction, target) → mean loss`, both `[n, num_outputs]`
pub type LossFn<B> = fn(Tensor<B, 2>, Tensor<B, 2>) -> Tensor<B, 1>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    Mse,
    L1,
    SmoothL1,
}

impl LossKind {
    const NAMES: [&'static str; 3] = ["mse_loss", "l1_loss", "smooth_l1_loss"];

    pub fn from_name(name: &str) -> Result<Self, RegistryError> {
        match name {
            "mse_loss"       => Ok(Self::Mse),
            "l1_loss"        => Ok(Self::L1),
            "smooth_l1_loss" => Ok(Self::SmoothL1),
            other => Err(RegistryError::unknown("loss", other, &Self::NAMES)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mse      => "mse_loss",
            Self::L1       => "l1_loss",
            Self::SmoothL1 => "smooth_l1_loss",
        }
    }

    pub fn func<B: Backend>(&self) -> LossFn<B> {
        let func: LossFn<B> = match self {
            Self::Mse      => mse_loss::<B>,
            Self::L1       => l1_loss::<B>,
            Self::SmoothL1 => smooth_l1_loss::<B>,
        };
        func
    }
}

pub fn mse_loss<B: Backend>(output: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    MseLoss::new().forward(output, target, Reduction::Mean)
}

pub fn l1_loss<B: Backend>(output: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    (output - target).abs().mean()
}

/// Huber loss with β = 1: quadratic below 1, linear above
pub fn smooth_l1_loss<B: Backend>(output: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    let abs  = (output - target).abs();
    let quad = abs.clone().powf_scalar(2.0) * 0.5;
    let lin  = abs.clone() - 0.5;
    quad.mask_where(abs.greater_equal_elem(1.0), lin).mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn pair(out: [f32; 2], tgt: [f32; 2]) -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 2>) {
        let device = Default::default();
        (
            Tensor::<TestBackend, 1>::from_floats(out, &device).reshape([2, 1]),
            Tensor::<TestBackend, 1>::from_floats(tgt, &device).reshape([2, 1]),
        )
    }

    fn value(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    #[test]
    fn test_mse() {
        let (o, t) = pair([1.5, 2.5], [1.0, 2.0]);
        assert!((value(mse_loss(o, t)) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_l1() {
        let (o, t) = pair([1.5, 1.0], [1.0, 2.0]);
        assert!((value(l1_loss(o, t)) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_smooth_l1_branches() {
        // |d| = 0.5 → 0.125, |d| = 3 → 2.5
        let (o, t) = pair([1.5, 5.0], [1.0, 2.0]);
        assert!((value(smooth_l1_loss(o, t)) - 1.3125).abs() < 1e-6);
    }

    #[test]
    fn test_registry() {
        for name in LossKind::NAMES {
            assert_eq!(LossKind::from_name(name).unwrap().name(), name);
        }
        let err = LossKind::from_name("nll_loss").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownName { kind: "loss", .. }));

        let f = LossKind::Mse.func::<TestBackend>();
        let (o, t) = pair([0.0, 0.0], [1.0, 1.0]);
        assert!((value(f(o, t)) - 1.0).abs() < 1e-6);
    }
}
