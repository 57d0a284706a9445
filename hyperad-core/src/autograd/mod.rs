//! Reverse-mode automatic differentiation over an append-only hypergraph.
//!
//! - [`Hypergraph`] owns the nodes and edges, builds the graph one node at a time
//!   and runs forward and backward passes.
//! - [`Edge`] is the operator interface every node producer implements.
//! - [`edges`] holds the built-in leaf edges (inputs, parameters, lookups).
//! - [`grad_check`] compares analytical gradients with finite differences.

mod debug;
pub mod edge;
pub mod edges;
pub mod grad_check;
pub mod graph;

pub use edge::Edge;
pub use graph::{Hypergraph, VariableIndex};
