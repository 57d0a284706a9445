use crate::autograd::Edge;
use crate::binding::{self, Bound};
use crate::error::HypergraphError;
use crate::tensor::{Dim, Tensor};

fn no_inputs(edge: &str) -> HypergraphError {
    HypergraphError::InternalError(format!("{} has no inputs to differentiate", edge))
}

/// Where a scalar input reads its value from.
#[derive(Debug, Clone)]
pub enum ScalarSource {
    Value(f32),
    Bound(Bound<f32>),
}

/// A scalar input, either fixed or re-read from a binding on each forward.
#[derive(Debug)]
pub struct ScalarInputEdge {
    source: ScalarSource,
}

impl ScalarInputEdge {
    pub fn new(value: f32) -> Self {
        ScalarInputEdge {
            source: ScalarSource::Value(value),
        }
    }

    pub fn bound(value: Bound<f32>) -> Self {
        ScalarInputEdge {
            source: ScalarSource::Bound(value),
        }
    }

    fn current(&self) -> Result<f32, HypergraphError> {
        match &self.source {
            ScalarSource::Value(v) => Ok(*v),
            ScalarSource::Bound(b) => Ok(*binding::read(b, "bound scalar input")?),
        }
    }
}

impl Edge for ScalarInputEdge {
    fn arity(&self) -> usize {
        0
    }

    fn forward(&self, _inputs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
        Ok(Tensor::scalar(self.current()?))
    }

    fn backward(
        &self,
        _inputs: &[&Tensor],
        _output: &Tensor,
        _output_grad: &Tensor,
        _input_position: usize,
    ) -> Result<Tensor, HypergraphError> {
        Err(no_inputs("ScalarInputEdge"))
    }

    fn describe(&self, _tail_names: &[String]) -> String {
        match self.current() {
            Ok(v) => format!("scalar_constant({})", v),
            Err(_) => "scalar_constant(<poisoned>)".to_string(),
        }
    }
}

/// Where a tensor input reads its value from.
#[derive(Debug, Clone)]
pub enum TensorSource {
    Value(Tensor),
    /// Row-major buffer re-read on every forward; its length must match `Dim`.
    Bound(Dim, Bound<Vec<f32>>),
}

/// A tensor input, either fixed or re-read from a binding on each forward.
#[derive(Debug)]
pub struct InputEdge {
    source: TensorSource,
}

impl InputEdge {
    pub fn new(value: Tensor) -> Self {
        InputEdge {
            source: TensorSource::Value(value),
        }
    }

    /// Binds the edge to an external buffer, checking its length against `dim`.
    pub fn bound(dim: Dim, buffer: Bound<Vec<f32>>) -> Result<Self, HypergraphError> {
        check_len(&dim, binding::read(&buffer, "bound input")?.len())?;
        Ok(InputEdge {
            source: TensorSource::Bound(dim, buffer),
        })
    }

    pub fn dim(&self) -> &Dim {
        match &self.source {
            TensorSource::Value(t) => t.dim(),
            TensorSource::Bound(d, _) => d,
        }
    }
}

fn check_len(dim: &Dim, len: usize) -> Result<(), HypergraphError> {
    if len != dim.size() {
        return Err(HypergraphError::ShapeMismatch {
            expected: dim.extents().to_vec(),
            actual: vec![len],
            operation: "bound input".to_string(),
        });
    }
    Ok(())
}

impl Edge for InputEdge {
    fn arity(&self) -> usize {
        0
    }

    fn forward(&self, _inputs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
        match &self.source {
            TensorSource::Value(t) => Ok(t.clone()),
            TensorSource::Bound(dim, buffer) => {
                let data = binding::read(buffer, "bound input")?;
                // The caller may have resized the buffer since construction.
                check_len(dim, data.len())?;
                Tensor::new(data.clone(), dim.clone())
            }
        }
    }

    fn backward(
        &self,
        _inputs: &[&Tensor],
        _output: &Tensor,
        _output_grad: &Tensor,
        _input_position: usize,
    ) -> Result<Tensor, HypergraphError> {
        Err(no_inputs("InputEdge"))
    }

    fn describe(&self, _tail_names: &[String]) -> String {
        format!("constant({})", self.dim())
    }
}
