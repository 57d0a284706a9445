//! Small operators for exercising the graph in unit tests.

use crate::autograd::Edge;
use crate::error::HypergraphError;
use crate::tensor::Tensor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn check_same_shape(a: &Tensor, b: &Tensor, operation: &str) -> Result<(), HypergraphError> {
    if a.dim() != b.dim() {
        return Err(HypergraphError::ShapeMismatch {
            expected: a.shape().to_vec(),
            actual: b.shape().to_vec(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

/// Elementwise sum of any number of equally shaped inputs.
#[derive(Debug)]
pub(crate) struct Sum {
    pub(crate) arity: usize,
}

impl Edge for Sum {
    fn arity(&self) -> usize {
        self.arity
    }

    fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
        let (first, rest) = inputs
            .split_first()
            .ok_or_else(|| HypergraphError::InternalError("Sum of nothing".to_string()))?;
        let mut out = (*first).clone();
        for x in rest {
            out.accumulate(x)?;
        }
        Ok(out)
    }

    fn backward(
        &self,
        _inputs: &[&Tensor],
        _output: &Tensor,
        output_grad: &Tensor,
        _input_position: usize,
    ) -> Result<Tensor, HypergraphError> {
        Ok(output_grad.clone())
    }

    fn describe(&self, tail_names: &[String]) -> String {
        tail_names.join(" + ")
    }
}

/// Elementwise product of two inputs.
#[derive(Debug)]
pub(crate) struct CwiseMultiply;

impl Edge for CwiseMultiply {
    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
        check_same_shape(inputs[0], inputs[1], "CwiseMultiply")?;
        let data = inputs[0]
            .data()
            .iter()
            .zip(inputs[1].data())
            .map(|(a, b)| a * b)
            .collect();
        Tensor::new(data, inputs[0].dim().clone())
    }

    fn backward(
        &self,
        inputs: &[&Tensor],
        _output: &Tensor,
        output_grad: &Tensor,
        input_position: usize,
    ) -> Result<Tensor, HypergraphError> {
        let other = inputs[1 - input_position];
        let data = other
            .data()
            .iter()
            .zip(output_grad.data())
            .map(|(o, g)| o * g)
            .collect();
        Tensor::new(data, other.dim().clone())
    }

    fn describe(&self, tail_names: &[String]) -> String {
        format!("{} \u{2299} {}", tail_names[0], tail_names[1])
    }
}

/// Sum of all elements, producing a `{1}` tensor.
#[derive(Debug)]
pub(crate) struct SumElements;

impl Edge for SumElements {
    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
        Ok(Tensor::scalar(inputs[0].data().iter().sum()))
    }

    fn backward(
        &self,
        inputs: &[&Tensor],
        _output: &Tensor,
        output_grad: &Tensor,
        _input_position: usize,
    ) -> Result<Tensor, HypergraphError> {
        Ok(crate::tensor::full(
            inputs[0].dim().clone(),
            output_grad.as_scalar()?,
        ))
    }

    fn describe(&self, tail_names: &[String]) -> String {
        format!("sum_elems({})", tail_names[0])
    }
}

/// Shared counters of how often an edge's forward and backward ran.
#[derive(Debug, Default, Clone)]
pub(crate) struct CallCounter {
    forward: Arc<AtomicUsize>,
    backward: Arc<AtomicUsize>,
}

impl CallCounter {
    pub(crate) fn forward_calls(&self) -> usize {
        self.forward.load(Ordering::SeqCst)
    }

    pub(crate) fn backward_calls(&self) -> usize {
        self.backward.load(Ordering::SeqCst)
    }
}

/// Wraps another edge and counts its forward and backward calls.
#[derive(Debug)]
pub(crate) struct Counting<E> {
    inner: E,
    counter: CallCounter,
}

impl<E: Edge> Counting<E> {
    pub(crate) fn new(inner: E) -> (Self, CallCounter) {
        let counter = CallCounter::default();
        (
            Counting {
                inner,
                counter: counter.clone(),
            },
            counter,
        )
    }
}

impl<E: Edge> Edge for Counting<E> {
    fn arity(&self) -> usize {
        self.inner.arity()
    }

    fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
        self.counter.forward.fetch_add(1, Ordering::SeqCst);
        self.inner.forward(inputs)
    }

    fn backward(
        &self,
        inputs: &[&Tensor],
        output: &Tensor,
        output_grad: &Tensor,
        input_position: usize,
    ) -> Result<Tensor, HypergraphError> {
        self.counter.backward.fetch_add(1, Ordering::SeqCst);
        self.inner.backward(inputs, output, output_grad, input_position)
    }

    fn has_trainable_parameters(&self) -> bool {
        self.inner.has_trainable_parameters()
    }

    fn has_parameters(&self) -> bool {
        self.inner.has_parameters()
    }

    fn accumulate_grad(&self, grad: &Tensor) -> Result<(), HypergraphError> {
        self.inner.accumulate_grad(grad)
    }

    fn describe(&self, tail_names: &[String]) -> String {
        self.inner.describe(tail_names)
    }
}

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
