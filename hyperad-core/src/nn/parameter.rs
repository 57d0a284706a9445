use crate::error::HypergraphError;
use crate::tensor::{self, Dim, Tensor};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared handle to a dense parameter. Graphs hold clones of the handle and read
/// the current value on every forward pass.
pub type ParameterHandle = Arc<RwLock<Parameters>>;

/// Shared handle to a lookup table.
pub type LookupHandle = Arc<RwLock<LookupParameters>>;

/// A trainable tensor together with its accumulated gradient.
///
/// The gradient is only ever added to by the graph; clearing it between steps is
/// the trainer's job.
#[derive(Debug, Clone)]
pub struct Parameters {
    values: Tensor,
    grad: Tensor,
}

impl Parameters {
    /// Creates a parameter with the given initial value and a zero gradient.
    pub fn new(values: Tensor) -> Self {
        let grad = tensor::zeros_like(&values);
        Parameters { values, grad }
    }

    /// Wraps a new parameter in a shareable handle.
    pub fn shared(values: Tensor) -> ParameterHandle {
        Arc::new(RwLock::new(Parameters::new(values)))
    }

    pub fn dim(&self) -> &Dim {
        self.values.dim()
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Tensor {
        &mut self.values
    }

    pub fn grad(&self) -> &Tensor {
        &self.grad
    }

    /// Adds `d` into the stored gradient.
    pub fn accumulate_grad(&mut self, d: &Tensor) -> Result<(), HypergraphError> {
        self.grad.accumulate(d)
    }

    pub fn clear_grad(&mut self) {
        self.grad.zero_();
    }
}

/// A table of equally shaped rows, e.g. word embeddings, addressed by index.
///
/// Only rows that received a gradient are tracked in `non_zero_grads`, so
/// clearing touches just those rows.
#[derive(Debug, Clone)]
pub struct LookupParameters {
    dim: Dim,
    values: Vec<Tensor>,
    grads: Vec<Tensor>,
    non_zero_grads: BTreeSet<usize>,
}

impl LookupParameters {
    /// Creates a table of `rows` zero-filled entries of shape `dim`.
    pub fn new(rows: usize, dim: impl Into<Dim>) -> Self {
        let dim = dim.into();
        LookupParameters {
            values: (0..rows).map(|_| tensor::zeros(dim.clone())).collect(),
            grads: (0..rows).map(|_| tensor::zeros(dim.clone())).collect(),
            dim,
            non_zero_grads: BTreeSet::new(),
        }
    }

    /// Creates a table from explicit rows. All rows must share one shape.
    pub fn from_rows(rows: Vec<Tensor>) -> Result<Self, HypergraphError> {
        let dim = match rows.first() {
            Some(first) => first.dim().clone(),
            None => {
                return Err(HypergraphError::ConfigurationError(
                    "a lookup table needs at least one row".to_string(),
                ))
            }
        };
        if let Some(bad) = rows.iter().find(|r| r.dim() != &dim) {
            return Err(HypergraphError::ShapeMismatch {
                expected: dim.extents().to_vec(),
                actual: bad.shape().to_vec(),
                operation: "LookupParameters::from_rows".to_string(),
            });
        }
        let grads = rows.iter().map(tensor::zeros_like).collect();
        Ok(LookupParameters {
            dim,
            values: rows,
            grads,
            non_zero_grads: BTreeSet::new(),
        })
    }

    /// Wraps `table` in a shareable handle.
    pub fn shared(table: LookupParameters) -> LookupHandle {
        Arc::new(RwLock::new(table))
    }

    /// Shape of a single row.
    pub fn dim(&self) -> &Dim {
        &self.dim
    }

    pub fn rows(&self) -> usize {
        self.values.len()
    }

    pub fn row(&self, index: usize) -> Result<&Tensor, HypergraphError> {
        self.values
            .get(index)
            .ok_or(HypergraphError::LookupIndexOutOfRange {
                index,
                rows: self.values.len(),
            })
    }

    pub fn row_mut(&mut self, index: usize) -> Result<&mut Tensor, HypergraphError> {
        let rows = self.values.len();
        self.values
            .get_mut(index)
            .ok_or(HypergraphError::LookupIndexOutOfRange { index, rows })
    }

    pub fn grad(&self, index: usize) -> Result<&Tensor, HypergraphError> {
        self.grads
            .get(index)
            .ok_or(HypergraphError::LookupIndexOutOfRange {
                index,
                rows: self.grads.len(),
            })
    }

    /// Rows that have received a gradient since the last `clear_grad`.
    pub fn non_zero_grads(&self) -> &BTreeSet<usize> {
        &self.non_zero_grads
    }

    /// Adds `d` into the gradient of row `index`.
    pub fn accumulate_grad(&mut self, index: usize, d: &Tensor) -> Result<(), HypergraphError> {
        let rows = self.grads.len();
        let grad = self
            .grads
            .get_mut(index)
            .ok_or(HypergraphError::LookupIndexOutOfRange { index, rows })?;
        grad.accumulate(d)?;
        self.non_zero_grads.insert(index);
        Ok(())
    }

    pub fn clear_grad(&mut self) {
        for &i in &self.non_zero_grads {
            self.grads[i].zero_();
        }
        self.non_zero_grads.clear();
    }
}

// --- Lock helpers shared by the parameter edges ---

pub(crate) fn read_params(
    handle: &ParameterHandle,
) -> Result<RwLockReadGuard<'_, Parameters>, HypergraphError> {
    handle
        .read()
        .map_err(|_| HypergraphError::LockPoisoned("parameters".to_string()))
}

pub(crate) fn write_params(
    handle: &ParameterHandle,
) -> Result<RwLockWriteGuard<'_, Parameters>, HypergraphError> {
    handle
        .write()
        .map_err(|_| HypergraphError::LockPoisoned("parameters".to_string()))
}

pub(crate) fn read_lookup(
    handle: &LookupHandle,
) -> Result<RwLockReadGuard<'_, LookupParameters>, HypergraphError> {
    handle
        .read()
        .map_err(|_| HypergraphError::LockPoisoned("lookup parameters".to_string()))
}

pub(crate) fn write_lookup(
    handle: &LookupHandle,
) -> Result<RwLockWriteGuard<'_, LookupParameters>, HypergraphError> {
    handle
        .write()
        .map_err(|_| HypergraphError::LockPoisoned("lookup parameters".to_string()))
}

#[cfg(test)]
#[path = "parameter_test.rs"]
mod tests;
