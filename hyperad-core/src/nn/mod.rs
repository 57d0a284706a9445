// src/nn/mod.rs
// Parameter storage that graphs read from and accumulate gradients into.

pub mod parameter;

// Re-export common items
pub use parameter::{LookupHandle, LookupParameters, ParameterHandle, Parameters};
