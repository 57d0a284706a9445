use crate::autograd::{Edge, Hypergraph};
use crate::error::HypergraphError;
use crate::nn::parameter::{read_lookup, read_params, write_lookup, write_params};
use crate::nn::{LookupHandle, ParameterHandle};
use crate::tensor::Tensor;
use log::debug;
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for input {input_index}, element {element_index}: analytical grad {analytical_grad:?} != numerical grad {numerical_grad:?}. Difference: {difference:?}")]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Numerical gradient is NaN or infinite for input {input_index}, element {element_index}. Details: Loss+: {loss_plus:?}, Loss-: {loss_minus:?}")]
    NumericalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("Analytical gradient is NaN or infinite for input {input_index}, element {element_index}. Value: {value:?}")]
    AnalyticalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        value: f64,
    },
    #[error("Analytical gradient for input {input_index} has shape {actual:?}, expected {expected:?}")]
    GradientShape {
        input_index: usize,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Tensor error during gradient check: {0}")]
    TensorError(HypergraphError),
}

impl From<HypergraphError> for GradCheckError {
    fn from(err: HypergraphError) -> Self {
        GradCheckError::TensorError(err)
    }
}

/// Step size and acceptance threshold for finite-difference checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradCheckConfig {
    /// Perturbation applied to each element for the central difference.
    pub epsilon: f64,
    /// A mismatch is reported when both the absolute and the relative
    /// difference exceed this value.
    pub tolerance: f64,
}

impl GradCheckConfig {
    pub fn new(epsilon: f64, tolerance: f64) -> Result<Self, HypergraphError> {
        if !(epsilon > 0.0 && epsilon.is_finite()) {
            return Err(HypergraphError::ConfigurationError(format!(
                "epsilon must be positive and finite, got {}",
                epsilon
            )));
        }
        if !(tolerance > 0.0 && tolerance.is_finite()) {
            return Err(HypergraphError::ConfigurationError(format!(
                "tolerance must be positive and finite, got {}",
                tolerance
            )));
        }
        Ok(GradCheckConfig { epsilon, tolerance })
    }
}

impl Default for GradCheckConfig {
    // f32 forward passes: a larger step keeps rounding error below the tolerance.
    fn default() -> Self {
        GradCheckConfig {
            epsilon: 1e-3,
            tolerance: 1e-2,
        }
    }
}

/// Checks `edge.backward` against central differences of its `forward`.
///
/// The scalar probed is `L = sum(forward(inputs) * output_grad)`, whose exact
/// gradient with respect to input `i` is `backward(inputs, output, output_grad, i)`.
pub fn check_edge(
    edge: &dyn Edge,
    inputs: &[Tensor],
    output_grad: &Tensor,
    config: &GradCheckConfig,
) -> Result<(), GradCheckError> {
    let refs: Vec<&Tensor> = inputs.iter().collect();
    let output = edge.forward(&refs)?;
    if output.dim() != output_grad.dim() {
        return Err(HypergraphError::ShapeMismatch {
            expected: output.shape().to_vec(),
            actual: output_grad.shape().to_vec(),
            operation: "check_edge".to_string(),
        }
        .into());
    }

    for (i, input) in inputs.iter().enumerate() {
        let analytical = edge.backward(&refs, &output, output_grad, i)?;
        if analytical.dim() != input.dim() {
            return Err(GradCheckError::GradientShape {
                input_index: i,
                expected: input.shape().to_vec(),
                actual: analytical.shape().to_vec(),
            });
        }

        for elem_idx in 0..input.numel() {
            let probe = |delta: f64| -> Result<f64, GradCheckError> {
                let mut perturbed = input.clone();
                perturbed.data_mut()[elem_idx] += delta as f32;
                let mut probe_refs: Vec<&Tensor> = refs.iter().copied().collect();
                probe_refs[i] = &perturbed;
                Ok(edge.forward(&probe_refs)?.dot(output_grad)?)
            };
            let loss_plus = probe(config.epsilon)?;
            let loss_minus = probe(-config.epsilon)?;
            compare(
                i,
                elem_idx,
                analytical.data()[elem_idx] as f64,
                loss_plus,
                loss_minus,
                config,
            )?;
        }
    }
    Ok(())
}

/// Storage whose elements a graph-level check perturbs.
trait CheckedStorage {
    fn clear_grad(&self) -> Result<(), HypergraphError>;
    fn grad(&self) -> Result<Tensor, HypergraphError>;
    fn get(&self, elem_idx: usize) -> Result<f32, HypergraphError>;
    fn set(&self, elem_idx: usize, value: f32) -> Result<(), HypergraphError>;
}

impl CheckedStorage for ParameterHandle {
    fn clear_grad(&self) -> Result<(), HypergraphError> {
        write_params(self)?.clear_grad();
        Ok(())
    }

    fn grad(&self) -> Result<Tensor, HypergraphError> {
        Ok(read_params(self)?.grad().clone())
    }

    fn get(&self, elem_idx: usize) -> Result<f32, HypergraphError> {
        Ok(read_params(self)?.values().data()[elem_idx])
    }

    fn set(&self, elem_idx: usize, value: f32) -> Result<(), HypergraphError> {
        write_params(self)?.values_mut().data_mut()[elem_idx] = value;
        Ok(())
    }
}

/// One row of a lookup table.
struct LookupRow<'a> {
    table: &'a LookupHandle,
    row: usize,
}

impl CheckedStorage for LookupRow<'_> {
    fn clear_grad(&self) -> Result<(), HypergraphError> {
        write_lookup(self.table)?.clear_grad();
        Ok(())
    }

    fn grad(&self) -> Result<Tensor, HypergraphError> {
        Ok(read_lookup(self.table)?.grad(self.row)?.clone())
    }

    fn get(&self, elem_idx: usize) -> Result<f32, HypergraphError> {
        Ok(read_lookup(self.table)?.row(self.row)?.data()[elem_idx])
    }

    fn set(&self, elem_idx: usize, value: f32) -> Result<(), HypergraphError> {
        write_lookup(self.table)?.row_mut(self.row)?.data_mut()[elem_idx] = value;
        Ok(())
    }
}

/// Checks the gradient a graph accumulates into `params` against central
/// differences over the parameter's values.
///
/// `build` must append a scalar objective as the last node of the graph it is
/// given; it is called once for the analytical pass and twice per element.
/// The parameter's values and gradient are left as they were found, except that
/// the gradient is cleared.
pub fn check_parameter<F>(
    build: F,
    params: &ParameterHandle,
    config: &GradCheckConfig,
) -> Result<(), GradCheckError>
where
    F: Fn(&mut Hypergraph) -> Result<(), HypergraphError>,
{
    check_storage(build, params, config)
}

/// Like [`check_parameter`], for row `row` of a lookup table.
///
/// Every row's gradient is cleared, since the table tracks them together.
pub fn check_lookup<F>(
    build: F,
    table: &LookupHandle,
    row: usize,
    config: &GradCheckConfig,
) -> Result<(), GradCheckError>
where
    F: Fn(&mut Hypergraph) -> Result<(), HypergraphError>,
{
    check_storage(build, &LookupRow { table, row }, config)
}

fn check_storage<F, S>(
    build: F,
    storage: &S,
    config: &GradCheckConfig,
) -> Result<(), GradCheckError>
where
    F: Fn(&mut Hypergraph) -> Result<(), HypergraphError>,
    S: CheckedStorage + ?Sized,
{
    let evaluate = |backward: bool| -> Result<f64, HypergraphError> {
        let mut cg = Hypergraph::new();
        build(&mut cg)?;
        let loss = cg.forward()?.as_scalar()? as f64;
        if backward {
            cg.backward()?;
        }
        Ok(loss)
    };

    storage.clear_grad()?;
    evaluate(true)?;
    let analytical = storage.grad()?;
    storage.clear_grad()?;
    debug!("check_storage: probing {} elements", analytical.numel());

    for elem_idx in 0..analytical.numel() {
        let original = storage.get(elem_idx)?;
        let probe = |delta: f64| -> Result<f64, GradCheckError> {
            storage.set(elem_idx, original + delta as f32)?;
            Ok(evaluate(false)?)
        };
        let loss_plus = probe(config.epsilon);
        let loss_minus = probe(-config.epsilon);
        storage.set(elem_idx, original)?;
        compare(
            0,
            elem_idx,
            analytical.data()[elem_idx] as f64,
            loss_plus?,
            loss_minus?,
            config,
        )?;
    }
    Ok(())
}

fn compare(
    input_index: usize,
    element_index: usize,
    analytical_grad: f64,
    loss_plus: f64,
    loss_minus: f64,
    config: &GradCheckConfig,
) -> Result<(), GradCheckError> {
    let numerical_grad = (loss_plus - loss_minus) / (2.0 * config.epsilon);
    if !numerical_grad.is_finite() {
        return Err(GradCheckError::NumericalGradNaNOrInfinite {
            input_index,
            element_index,
            loss_plus,
            loss_minus,
        });
    }
    if !analytical_grad.is_finite() {
        return Err(GradCheckError::AnalyticalGradNaNOrInfinite {
            input_index,
            element_index,
            value: analytical_grad,
        });
    }
    let difference = (analytical_grad - numerical_grad).abs();
    if difference > config.tolerance
        && difference / (analytical_grad.abs() + config.epsilon) > config.tolerance
    {
        return Err(GradCheckError::GradientMismatch {
            input_index,
            element_index,
            analytical_grad,
            numerical_grad,
            difference,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
