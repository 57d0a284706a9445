use crate::autograd::edge::HyperEdge;
use crate::autograd::edges::{InputEdge, LookupEdge, LookupIndex, ParameterEdge, ScalarInputEdge};
use crate::autograd::Edge;
use crate::binding::Bound;
use crate::error::HypergraphError;
use crate::nn::{LookupHandle, ParameterHandle};
use crate::tensor::{self, Dim, Tensor};
use log::{debug, trace, warn};
use std::fmt;

/// Stable handle to a node, assigned densely from 0 in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableIndex(usize);

impl VariableIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<VariableIndex> for usize {
    fn from(v: VariableIndex) -> usize {
        v.0
    }
}

impl fmt::Display for VariableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One evaluated point of the graph.
#[derive(Debug)]
pub(crate) struct Node {
    /// Index into `Hypergraph::edges` of the single edge producing this node.
    pub(crate) in_edge: usize,
    /// `None` until forward reaches the node.
    pub(crate) value: Option<Tensor>,
    /// Zeroed when `value` is computed, then only ever added to.
    pub(crate) gradient: Option<Tensor>,
}

/// A dynamically built computation graph with reverse-mode differentiation.
///
/// Nodes and edges live in append-only arenas and refer to each other by index.
/// Every `add_*` call appends exactly one node together with the edge that
/// produces it; an edge may only consume nodes that already exist, so creation
/// order is a topological order.
///
/// Evaluation is incremental: `incremental_forward` computes only the nodes
/// appended since the previous evaluation, so callers can interleave building
/// and evaluating. `forward` recomputes everything, which is what picks up
/// changes made through bindings or parameter updates.
///
/// A graph is single-threaded. Use one graph per worker for parallelism.
#[derive(Debug, Default)]
pub struct Hypergraph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<HyperEdge>,
    /// Subset of `edges` (by index) that accumulate into trainable storage.
    parameter_edges: Vec<usize>,
    /// Nodes below this index hold a value.
    last_node_evaluated: usize,
}

impl Hypergraph {
    pub fn new() -> Self {
        Hypergraph::default()
    }

    // --- Construction ---

    /// Appends a node produced by `op` applied to `tail`.
    ///
    /// This is the extension point for operators beyond the built-in leaves.
    /// Every tail index must name an existing node and the tail length must match
    /// `op.arity()`. Edges reporting trainable parameters are registered for
    /// gradient accumulation.
    pub fn add_edge(
        &mut self,
        tail: &[VariableIndex],
        op: Box<dyn Edge>,
    ) -> Result<VariableIndex, HypergraphError> {
        let head = self.nodes.len();
        if op.arity() != tail.len() {
            return Err(HypergraphError::ArityMismatch {
                edge: format!("{:?}", op),
                expected: op.arity(),
                actual: tail.len(),
            });
        }
        if let Some(bad) = tail.iter().find(|t| t.0 >= head) {
            return Err(HypergraphError::InvalidTail { head, tail: bad.0 });
        }
        Ok(self.push(tail.to_vec(), op))
    }

    /// Appends a constant scalar input.
    pub fn add_scalar_input(&mut self, value: f32) -> VariableIndex {
        self.push(Vec::new(), Box::new(ScalarInputEdge::new(value)))
    }

    /// Appends a scalar input that is re-read from `value` on every forward.
    pub fn add_bound_scalar_input(&mut self, value: Bound<f32>) -> VariableIndex {
        self.push(Vec::new(), Box::new(ScalarInputEdge::bound(value)))
    }

    /// Appends a constant tensor input.
    pub fn add_input(&mut self, value: Tensor) -> VariableIndex {
        self.push(Vec::new(), Box::new(InputEdge::new(value)))
    }

    /// Appends a tensor input re-read from `buffer` on every forward.
    ///
    /// The graph only reads the buffer. The caller may overwrite its contents
    /// between evaluations but must keep its length equal to `dim.size()`.
    pub fn add_bound_input(
        &mut self,
        dim: impl Into<Dim>,
        buffer: Bound<Vec<f32>>,
    ) -> Result<VariableIndex, HypergraphError> {
        let edge = InputEdge::bound(dim.into(), buffer)?;
        Ok(self.push(Vec::new(), Box::new(edge)))
    }

    /// Appends a reference to a trainable parameter.
    pub fn add_parameter(&mut self, params: &ParameterHandle) -> VariableIndex {
        self.push(Vec::new(), Box::new(ParameterEdge::new(params)))
    }

    /// Appends row `index` of a trainable lookup table.
    pub fn add_lookup(&mut self, table: &LookupHandle, index: usize) -> VariableIndex {
        let edge = LookupEdge::new(table, LookupIndex::Fixed(index));
        self.push(Vec::new(), Box::new(edge))
    }

    /// Appends the row of a trainable lookup table selected by a bound index.
    pub fn add_bound_lookup(&mut self, table: &LookupHandle, index: Bound<usize>) -> VariableIndex {
        let edge = LookupEdge::new(table, LookupIndex::Bound(index));
        self.push(Vec::new(), Box::new(edge))
    }

    /// Appends row `index` of a lookup table without registering it for
    /// gradient accumulation. The node still receives a gradient during backward.
    pub fn add_const_lookup(&mut self, table: &LookupHandle, index: usize) -> VariableIndex {
        let edge = LookupEdge::frozen(table, LookupIndex::Fixed(index));
        self.push(Vec::new(), Box::new(edge))
    }

    /// Bound-index form of [`add_const_lookup`](Self::add_const_lookup).
    pub fn add_const_bound_lookup(
        &mut self,
        table: &LookupHandle,
        index: Bound<usize>,
    ) -> VariableIndex {
        let edge = LookupEdge::frozen(table, LookupIndex::Bound(index));
        self.push(Vec::new(), Box::new(edge))
    }

    fn push(&mut self, tail: Vec<VariableIndex>, op: Box<dyn Edge>) -> VariableIndex {
        let head = VariableIndex(self.nodes.len());
        let edge_index = self.edges.len();
        if op.has_trainable_parameters() {
            self.parameter_edges.push(edge_index);
        }
        trace!("add {} <- edge {} (tail {:?})", head, edge_index, tail);
        self.nodes.push(Node {
            in_edge: edge_index,
            value: None,
            gradient: None,
        });
        self.edges.push(HyperEdge { tail, head, op });
        head
    }

    // --- Accessors ---

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes that currently hold a value.
    pub fn evaluated_count(&self) -> usize {
        self.last_node_evaluated
    }

    /// Number of edges that will accumulate into trainable storage.
    pub fn parameter_edge_count(&self) -> usize {
        self.parameter_edges.len()
    }

    /// Whether `v` is produced by an edge registered for gradient accumulation.
    pub fn is_parameter_node(&self, v: VariableIndex) -> Result<bool, HypergraphError> {
        let in_edge = self.node(v)?.in_edge;
        Ok(self.parameter_edges.contains(&in_edge))
    }

    /// Inputs of the edge producing `v`, in operand order.
    pub fn tail(&self, v: VariableIndex) -> Result<&[VariableIndex], HypergraphError> {
        let in_edge = self.node(v)?.in_edge;
        Ok(&self.edges[in_edge].tail)
    }

    /// The value computed for `v` by the last forward pass.
    pub fn value(&self, v: VariableIndex) -> Result<&Tensor, HypergraphError> {
        self.node(v)?
            .value
            .as_ref()
            .ok_or(HypergraphError::NodeNotEvaluated { index: v.0 })
    }

    /// The gradient accumulated into `v`; all zeros until `backward` runs.
    pub fn gradient(&self, v: VariableIndex) -> Result<&Tensor, HypergraphError> {
        self.node(v)?
            .gradient
            .as_ref()
            .ok_or(HypergraphError::NodeNotEvaluated { index: v.0 })
    }

    fn node(&self, v: VariableIndex) -> Result<&Node, HypergraphError> {
        self.nodes.get(v.0).ok_or(HypergraphError::InvalidVariable {
            index: v.0,
            node_count: self.nodes.len(),
        })
    }

    fn evaluated_value(&self, index: usize) -> Result<&Tensor, HypergraphError> {
        self.nodes[index]
            .value
            .as_ref()
            .ok_or(HypergraphError::NodeNotEvaluated { index })
    }

    fn tail_values(&self, edge: &HyperEdge) -> Result<Vec<&Tensor>, HypergraphError> {
        edge.tail
            .iter()
            .map(|t| self.evaluated_value(t.0))
            .collect()
    }

    // --- Forward ---

    /// Evaluates every node appended since the last evaluation and returns the
    /// value of the last node.
    ///
    /// Values computed by earlier calls are reused untouched.
    pub fn incremental_forward(&mut self) -> Result<&Tensor, HypergraphError> {
        if self.nodes.is_empty() {
            return Err(HypergraphError::EmptyGraph);
        }
        debug!(
            "incremental_forward: evaluating nodes {}..{}",
            self.last_node_evaluated,
            self.nodes.len()
        );
        while self.last_node_evaluated < self.nodes.len() {
            let i = self.last_node_evaluated;
            let edge = &self.edges[self.nodes[i].in_edge];
            let xs = self.tail_values(edge)?;
            let value = edge.op.forward(&xs)?;
            trace!("forward v{} = {:?}", i, value.shape());
            let node = &mut self.nodes[i];
            node.gradient = Some(tensor::zeros_like(&value));
            node.value = Some(value);
            self.last_node_evaluated += 1;
        }
        self.evaluated_value(self.nodes.len() - 1)
    }

    /// Recomputes the whole graph from scratch and returns the last node's value.
    pub fn forward(&mut self) -> Result<&Tensor, HypergraphError> {
        self.last_node_evaluated = 0;
        self.incremental_forward()
    }

    // --- Backward ---

    /// Differentiates the last node and pushes gradients into every trainable
    /// parameter it depends on.
    ///
    /// The last node is treated as the objective and seeded with ones. Node
    /// gradients are accumulated, never reset here: running backward twice
    /// without a fresh forward counts every contribution twice.
    pub fn backward(&mut self) -> Result<(), HypergraphError> {
        match self.nodes.len() {
            0 => Err(HypergraphError::EmptyGraph),
            n => self.backward_from(VariableIndex(n - 1)),
        }
    }

    /// Differentiates `target` instead of the last node.
    ///
    /// Nodes created after `target` cannot influence it and are ignored, as are
    /// parameter edges among them.
    pub fn backward_from(&mut self, target: VariableIndex) -> Result<(), HypergraphError> {
        let target = self.node(target).map(|_| target.0)?;
        if target >= self.last_node_evaluated {
            return Err(HypergraphError::NodeNotEvaluated { index: target });
        }
        let n = target + 1;
        debug!("backward: differentiating v{} over {} nodes", target, n);

        // A node needs a derivative iff some parameter edge feeds it. Tails always
        // precede their heads, so one pass in index order settles every node.
        let mut needs_derivative = vec![false; n];
        for i in 0..n {
            let edge = &self.edges[self.nodes[i].in_edge];
            let is_variable = edge.op.has_parameters()
                || edge.tail.iter().any(|t| needs_derivative[t.0]);
            needs_derivative[i] = is_variable;
        }

        // dE/dE = 1
        let seed = tensor::ones_like(self.evaluated_value(target)?);
        self.nodes[target].gradient = Some(seed);

        for i in (0..n).rev() {
            let edge = &self.edges[self.nodes[i].in_edge];
            if !edge.tail.iter().any(|t| needs_derivative[t.0]) {
                continue;
            }
            let xs = self.tail_values(edge)?;
            let output = self.evaluated_value(i)?;
            let output_grad = self.nodes[i]
                .gradient
                .as_ref()
                .ok_or(HypergraphError::NodeNotEvaluated { index: i })?;
            let mut contributions = Vec::with_capacity(edge.tail.len());
            for (position, t) in edge.tail.iter().enumerate() {
                if needs_derivative[t.0] {
                    let d = edge.op.backward(&xs, output, output_grad, position)?;
                    contributions.push((t.0, d));
                }
            }
            // A node may feed several consumers; contributions are summed.
            for (t, d) in contributions {
                self.nodes[t]
                    .gradient
                    .as_mut()
                    .ok_or(HypergraphError::NodeNotEvaluated { index: t })?
                    .accumulate(&d)?;
            }
        }

        if self.parameter_edges.is_empty() {
            warn!("backward: graph has no trainable parameters, nothing to accumulate");
        }
        for &e in &self.parameter_edges {
            let edge = &self.edges[e];
            if edge.head.0 > target {
                continue;
            }
            let grad = self.nodes[edge.head.0]
                .gradient
                .as_ref()
                .ok_or(HypergraphError::NodeNotEvaluated { index: edge.head.0 })?;
            trace!("accumulate_grad into {}", edge.head);
            edge.op.accumulate_grad(grad)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
