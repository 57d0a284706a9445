//! Dynamically built reverse-mode automatic differentiation.
//!
//! A [`Hypergraph`] is built one node at a time, evaluated forward (fully or
//! incrementally) and differentiated with a single reverse sweep that pushes
//! gradients into externally owned parameter storage.
//!
//! ```
//! use hyperad_core::{binding, Edge, Hypergraph, HypergraphError, Parameters, Tensor};
//!
//! /// `a * b` for single-element tensors.
//! #[derive(Debug)]
//! struct Mul;
//!
//! impl Edge for Mul {
//!     fn arity(&self) -> usize {
//!         2
//!     }
//!
//!     fn forward(&self, xs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
//!         Ok(Tensor::scalar(xs[0].as_scalar()? * xs[1].as_scalar()?))
//!     }
//!
//!     fn backward(
//!         &self,
//!         xs: &[&Tensor],
//!         _output: &Tensor,
//!         output_grad: &Tensor,
//!         i: usize,
//!     ) -> Result<Tensor, HypergraphError> {
//!         Ok(Tensor::scalar(xs[1 - i].as_scalar()? * output_grad.as_scalar()?))
//!     }
//!
//!     fn describe(&self, names: &[String]) -> String {
//!         format!("{} * {}", names[0], names[1])
//!     }
//! }
//!
//! # fn main() -> Result<(), HypergraphError> {
//! let w = Parameters::shared(Tensor::scalar(2.0));
//! let x = binding::bind(3.0f32);
//!
//! let mut cg = Hypergraph::new();
//! let wi = cg.add_parameter(&w);
//! let xi = cg.add_bound_scalar_input(x.clone());
//! cg.add_edge(&[wi, xi], Box::new(Mul))?;
//!
//! assert_eq!(cg.forward()?.as_scalar()?, 6.0);
//! cg.backward()?;
//! // d(w * x)/dw = x
//! assert_eq!(w.read().unwrap().grad().as_scalar()?, 3.0);
//! # Ok(())
//! # }
//! ```

// Déclare les modules principaux de la crate
pub mod autograd;
pub mod binding;
pub mod error;
pub mod nn;
pub mod tensor;

#[cfg(test)]
pub(crate) mod test_utils;

// Ré-exporte les types principaux pour un accès direct via `hyperad_core::...`
pub use autograd::{Edge, Hypergraph, VariableIndex};
pub use error::HypergraphError;
pub use nn::{LookupHandle, LookupParameters, ParameterHandle, Parameters};
pub use tensor::{Dim, Tensor};
