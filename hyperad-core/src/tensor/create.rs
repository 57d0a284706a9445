use crate::tensor::{Dim, Tensor};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Creates a tensor filled with zeros.
pub fn zeros(dim: impl Into<Dim>) -> Tensor {
    full(dim, 0.0)
}

/// Creates a tensor filled with ones.
pub fn ones(dim: impl Into<Dim>) -> Tensor {
    full(dim, 1.0)
}

/// Creates a tensor filled with `value`.
pub fn full(dim: impl Into<Dim>, value: f32) -> Tensor {
    let dim = dim.into();
    let data = vec![value; dim.size()];
    Tensor { dim, data }
}

/// Creates a zero-filled tensor with the same shape as `tensor`.
pub fn zeros_like(tensor: &Tensor) -> Tensor {
    zeros(tensor.dim().clone())
}

/// Creates a one-filled tensor with the same shape as `tensor`.
pub fn ones_like(tensor: &Tensor) -> Tensor {
    ones(tensor.dim().clone())
}

// --- Random creation ---

/// Creates a tensor with elements drawn uniformly from `[-1, 1)`.
pub fn rand<R: Rng>(dim: impl Into<Dim>, rng: &mut R) -> Tensor {
    let dim = dim.into();
    let data = (0..dim.size()).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    Tensor { dim, data }
}

/// Creates a tensor with elements drawn from the standard normal distribution.
pub fn randn<R: Rng>(dim: impl Into<Dim>, rng: &mut R) -> Tensor {
    let dim = dim.into();
    let data = (0..dim.size()).map(|_| StandardNormal.sample(rng)).collect();
    Tensor { dim, data }
}
