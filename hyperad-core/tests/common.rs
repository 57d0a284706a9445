use hyperad_core::{Edge, HypergraphError, Tensor};

// Operators for the integration tests. Arithmetic kernels are supplied by
// callers through `Hypergraph::add_edge`, so the tests bring their own.

/// `a + b`, elementwise.
#[derive(Debug)]
#[allow(dead_code)]
pub struct Add;

impl Edge for Add {
    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
        let mut out = inputs[0].clone();
        out.accumulate(inputs[1])?;
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
        format!("{} + {}", tail_names[0], tail_names[1])
    }
}

/// `sum((a - b)^2)`, producing a `{1}` tensor.
#[derive(Debug)]
#[allow(dead_code)]
pub struct SquaredDistance;

impl Edge for SquaredDistance {
    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor, HypergraphError> {
        let d: f32 = inputs[0]
            .data()
            .iter()
            .zip(inputs[1].data())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Ok(Tensor::scalar(d))
    }

    fn backward(
        &self,
        inputs: &[&Tensor],
        _output: &Tensor,
        output_grad: &Tensor,
        input_position: usize,
    ) -> Result<Tensor, HypergraphError> {
        let g = output_grad.as_scalar()?;
        let sign = if input_position == 0 { 1.0 } else { -1.0 };
        let data = inputs[0]
            .data()
            .iter()
            .zip(inputs[1].data())
            .map(|(a, b)| sign * 2.0 * (a - b) * g)
            .collect();
        Tensor::new(data, inputs[input_position].dim().clone())
    }

    fn describe(&self, tail_names: &[String]) -> String {
        format!("squared_distance({}, {})", tail_names[0], tail_names[1])
    }
}

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
