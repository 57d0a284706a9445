use thiserror::Error;

/// Error type for graph construction and evaluation.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum HypergraphError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Expected a single-element tensor, got shape {shape:?}")]
    NotAScalar { shape: Vec<usize> },

    #[error("Variable {index} does not exist (graph has {node_count} nodes)")]
    InvalidVariable { index: usize, node_count: usize },

    #[error("Edge for node {head} references tail {tail}, which is not an earlier node")]
    InvalidTail { head: usize, tail: usize },

    #[error("Edge '{edge}' declares arity {expected} but was given {actual} inputs")]
    ArityMismatch {
        edge: String,
        expected: usize,
        actual: usize,
    },

    #[error("Node {index} has not been evaluated yet")]
    NodeNotEvaluated { index: usize },

    #[error("Cannot evaluate an empty graph")]
    EmptyGraph,

    #[error("Lookup index {index} out of range for a table with {rows} rows")]
    LookupIndexOutOfRange { index: usize, rows: usize },

    #[error("Lock poisoned while accessing {0}")]
    LockPoisoned(String),

    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
