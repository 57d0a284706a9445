use crate::autograd::VariableIndex;
use crate::error::HypergraphError;
use crate::tensor::Tensor;
use std::fmt::Debug;

/// A differentiable operator application: the single producer of one node.
///
/// Implementations compute the node's value from its inputs' values and, in
/// reverse, the vector-Jacobian product flowing into each input. The graph owns
/// the wiring (which nodes are the inputs); an `Edge` only sees tensors.
///
/// Implementors may carry references to external mutable state (bound inputs,
/// parameters). `forward` must then read the *current* state on every call so
/// that a graph re-evaluated after an update observes the new values.
pub trait Edge: Debug {
    /// Number of inputs this operator consumes.
    fn arity(&self) -> usize;

    /// Computes the output value from the inputs' values, in tail order.
    ///
    /// The returned shape must be the same on every call for a given edge.
    fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor, HypergraphError>;

    /// Computes the gradient contribution for the input at `input_position`.
    ///
    /// # Arguments
    /// * `inputs`: the inputs' values, in tail order.
    /// * `output`: the value `forward` produced.
    /// * `output_grad`: the gradient of the objective with respect to `output`.
    /// * `input_position`: which input to differentiate.
    ///
    /// # Returns
    /// A tensor shaped like `inputs[input_position]` holding
    /// `output_grad · ∂output/∂inputs[input_position]`.
    fn backward(
        &self,
        inputs: &[&Tensor],
        output: &Tensor,
        output_grad: &Tensor,
        input_position: usize,
    ) -> Result<Tensor, HypergraphError>;

    /// Whether this edge wraps trainable storage that `accumulate_grad` writes to.
    fn has_trainable_parameters(&self) -> bool {
        false
    }

    /// Whether this edge reads parameter storage at all, trainable or frozen.
    ///
    /// Nodes produced by such edges, and everything downstream of them, get
    /// gradients during backward. Frozen storage is differentiated for
    /// inspection but never written back.
    fn has_parameters(&self) -> bool {
        self.has_trainable_parameters()
    }

    /// Pushes the gradient of this edge's output into the storage it wraps.
    ///
    /// Only called by the graph for edges reporting trainable parameters.
    fn accumulate_grad(&self, _grad: &Tensor) -> Result<(), HypergraphError> {
        Err(HypergraphError::UnsupportedOperation(
            "accumulate_grad on an edge without trainable parameters".to_string(),
        ))
    }

    /// Renders the operator applied to the named inputs, for diagnostics.
    fn describe(&self, tail_names: &[String]) -> String;
}

/// An edge as stored in the graph arena: the operator plus its wiring.
#[derive(Debug)]
pub(crate) struct HyperEdge {
    pub(crate) tail: Vec<VariableIndex>,
    pub(crate) head: VariableIndex,
    pub(crate) op: Box<dyn Edge>,
}
