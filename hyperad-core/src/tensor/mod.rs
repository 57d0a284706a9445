//! Dense `f32` value and gradient buffers.
//!
//! `Tensor` is the minimal buffer primitive the hypergraph needs: allocation to a
//! shape, zero-fill, and elementwise accumulation. Operator kernels live with the
//! edges that use them, not here.

use crate::error::HypergraphError;
use std::fmt;

pub mod create;

pub use create::{full, ones, ones_like, rand, randn, zeros, zeros_like};

/// The shape of a tensor, outermost extent first.
///
/// An empty `Dim` describes a scalar and has size 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Dim(Vec<usize>);

impl Dim {
    pub fn new(extents: Vec<usize>) -> Self {
        Dim(extents)
    }

    /// The shape of a scalar.
    pub fn scalar() -> Self {
        Dim(Vec::new())
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    pub fn extents(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Dim {
    fn from(extents: Vec<usize>) -> Self {
        Dim(extents)
    }
}

impl From<&[usize]> for Dim {
    fn from(extents: &[usize]) -> Self {
        Dim(extents.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Dim {
    fn from(extents: [usize; N]) -> Self {
        Dim(extents.to_vec())
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "}}")
    }
}

/// A contiguous, row-major `f32` buffer with a fixed shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    dim: Dim,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a tensor from raw data, checking that the data fills the shape exactly.
    pub fn new(data: Vec<f32>, dim: impl Into<Dim>) -> Result<Self, HypergraphError> {
        let dim = dim.into();
        if data.len() != dim.size() {
            return Err(HypergraphError::TensorCreationError {
                data_len: data.len(),
                shape: dim.extents().to_vec(),
            });
        }
        Ok(Tensor { dim, data })
    }

    /// A one-element tensor of shape `{1}`.
    pub fn scalar(value: f32) -> Self {
        Tensor {
            dim: Dim::new(vec![1]),
            data: vec![value],
        }
    }

    pub fn dim(&self) -> &Dim {
        &self.dim
    }

    pub fn shape(&self) -> &[usize] {
        self.dim.extents()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Returns the only element of a single-element tensor.
    pub fn as_scalar(&self) -> Result<f32, HypergraphError> {
        match self.data.as_slice() {
            [v] => Ok(*v),
            _ => Err(HypergraphError::NotAScalar {
                shape: self.shape().to_vec(),
            }),
        }
    }

    /// Fills the buffer with zeros in place.
    pub fn zero_(&mut self) {
        self.data.fill(0.0);
    }

    /// Elementwise `self += other`. Both tensors must have the same number of
    /// elements and the same shape.
    pub fn accumulate(&mut self, other: &Tensor) -> Result<(), HypergraphError> {
        if self.dim != other.dim {
            return Err(HypergraphError::ShapeMismatch {
                expected: self.shape().to_vec(),
                actual: other.shape().to_vec(),
                operation: "accumulate".to_string(),
            });
        }
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += *b;
        }
        Ok(())
    }

    /// Elementwise product followed by a full sum, `sum(self * other)`.
    pub fn dot(&self, other: &Tensor) -> Result<f64, HypergraphError> {
        if self.dim != other.dim {
            return Err(HypergraphError::ShapeMismatch {
                expected: self.shape().to_vec(),
                actual: other.shape().to_vec(),
                operation: "dot".to_string(),
            });
        }
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| a as f64 * b as f64)
            .sum())
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor(dim={}, data={:?})", self.dim, self.data)
    }
}
