//! Externally owned values that graph edges re-read on every forward pass.
//!
//! A `Bound<T>` lets a caller build a graph once, change the bound value between
//! evaluations, and call `Hypergraph::forward()` again to pick up the change.
//! The graph only takes read locks; the caller writes with [`set`] (or a write
//! lock of its own) while no evaluation is running.

use crate::error::HypergraphError;
use std::sync::{Arc, RwLock, RwLockReadGuard};

/// A shared, externally mutable value.
pub type Bound<T> = Arc<RwLock<T>>;

/// Wraps `value` in a new binding.
pub fn bind<T>(value: T) -> Bound<T> {
    Arc::new(RwLock::new(value))
}

/// Replaces the bound value.
pub fn set<T>(binding: &Bound<T>, value: T) -> Result<(), HypergraphError> {
    let mut guard = binding
        .write()
        .map_err(|_| HypergraphError::LockPoisoned("binding".to_string()))?;
    *guard = value;
    Ok(())
}

pub(crate) fn read<'a, T>(
    binding: &'a Bound<T>,
    what: &str,
) -> Result<RwLockReadGuard<'a, T>, HypergraphError> {
    binding
        .read()
        .map_err(|_| HypergraphError::LockPoisoned(what.to_string()))
}
