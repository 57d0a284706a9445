//! Built-in edges: the graph's leaves.
//!
//! Inputs read constants or caller bindings; parameter and lookup edges read
//! trainable storage and are the only edges that accumulate gradients outside
//! the graph. All of them have arity 0. Operators with inputs are supplied by
//! callers through `Hypergraph::add_edge`.

pub mod input;
pub mod param;

pub use input::{InputEdge, ScalarInputEdge, ScalarSource, TensorSource};
pub use param::{LookupEdge, LookupIndex, ParameterEdge};

#[cfg(test)]
#[path = "edges_test.rs"]
mod tests;
