use crate::autograd::Edge;
use crate::binding::{self, Bound};
use crate::error::HypergraphError;
use crate::nn::parameter::{read_lookup, read_params, write_lookup, write_params};
use crate::nn::{LookupHandle, ParameterHandle};
use crate::tensor::Tensor;
use std::sync::Arc;

fn no_inputs(edge: &str) -> HypergraphError {
    HypergraphError::InternalError(format!("{} has no inputs to differentiate", edge))
}

/// Reads a parameter's current value; gradients flow back into its storage.
///
/// A graph built after an optimizer step simply gets a fresh `ParameterEdge`
/// that sees the updated value. Nothing in the graph is patched in place.
#[derive(Debug)]
pub struct ParameterEdge {
    params: ParameterHandle,
}

impl ParameterEdge {
    pub fn new(params: &ParameterHandle) -> Self {
        ParameterEdge {
            params: Arc::clone(params),
        }
    }
}

impl Edge for ParameterEdge {
    fn arity(&self) -> usize {
        0
    }

    fn forward(&self, _inputs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
        Ok(read_params(&self.params)?.values().clone())
    }

    fn backward(
        &self,
        _inputs: &[&Tensor],
        _output: &Tensor,
        _output_grad: &Tensor,
        _input_position: usize,
    ) -> Result<Tensor, HypergraphError> {
        Err(no_inputs("ParameterEdge"))
    }

    fn has_trainable_parameters(&self) -> bool {
        true
    }

    fn accumulate_grad(&self, grad: &Tensor) -> Result<(), HypergraphError> {
        write_params(&self.params)?.accumulate_grad(grad)
    }

    fn describe(&self, _tail_names: &[String]) -> String {
        match read_params(&self.params) {
            Ok(p) => format!("parameters({})", p.dim()),
            Err(_) => "parameters(<poisoned>)".to_string(),
        }
    }
}

/// Which row a lookup edge selects.
#[derive(Debug, Clone)]
pub enum LookupIndex {
    Fixed(usize),
    /// Re-read on every forward and again when the gradient is accumulated.
    Bound(Bound<usize>),
}

/// Selects one row of a lookup table.
///
/// Non-trainable ("const") lookups still receive a node gradient during
/// backward, but the graph never registers them for accumulation.
#[derive(Debug)]
pub struct LookupEdge {
    table: LookupHandle,
    index: LookupIndex,
    trainable: bool,
}

impl LookupEdge {
    pub fn new(table: &LookupHandle, index: LookupIndex) -> Self {
        LookupEdge {
            table: Arc::clone(table),
            index,
            trainable: true,
        }
    }

    /// A frozen lookup, e.g. for pretrained embeddings.
    pub fn frozen(table: &LookupHandle, index: LookupIndex) -> Self {
        LookupEdge {
            trainable: false,
            ..LookupEdge::new(table, index)
        }
    }

    fn current_index(&self) -> Result<usize, HypergraphError> {
        match &self.index {
            LookupIndex::Fixed(i) => Ok(*i),
            LookupIndex::Bound(b) => Ok(*binding::read(b, "bound lookup index")?),
        }
    }
}

impl Edge for LookupEdge {
    fn arity(&self) -> usize {
        0
    }

    fn forward(&self, _inputs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
        let index = self.current_index()?;
        Ok(read_lookup(&self.table)?.row(index)?.clone())
    }

    fn backward(
        &self,
        _inputs: &[&Tensor],
        _output: &Tensor,
        _output_grad: &Tensor,
        _input_position: usize,
    ) -> Result<Tensor, HypergraphError> {
        Err(no_inputs("LookupEdge"))
    }

    fn has_trainable_parameters(&self) -> bool {
        self.trainable
    }

    fn has_parameters(&self) -> bool {
        true
    }

    fn accumulate_grad(&self, grad: &Tensor) -> Result<(), HypergraphError> {
        if !self.trainable {
            return Err(HypergraphError::UnsupportedOperation(
                "accumulate_grad on a const lookup".to_string(),
            ));
        }
        let index = self.current_index()?;
        write_lookup(&self.table)?.accumulate_grad(index, grad)
    }

    fn describe(&self, _tail_names: &[String]) -> String {
        let index = match self.current_index() {
            Ok(i) => i.to_string(),
            Err(_) => "<poisoned>".to_string(),
        };
        let dim = match read_lookup(&self.table) {
            Ok(t) => t.dim().to_string(),
            Err(_) => "<poisoned>".to_string(),
        };
        if self.trainable {
            format!("lookup_parameters({})[{}]", dim, index)
        } else {
            format!("const_lookup_parameters({})[{}]", dim, index)
        }
    }
}
