use approx::assert_relative_eq;
use hyperad_core::{binding, Hypergraph, LookupParameters, Parameters, Tensor};

// Include the common helper module
mod common;
use common::{init_logger, Add, SquaredDistance};

#[test]
fn test_parameter_plus_bound_input() {
    init_logger();
    let p1 = Parameters::shared(Tensor::scalar(2.0));
    let x = binding::bind(3.0f32);

    let mut cg = Hypergraph::new();
    let pi = cg.add_parameter(&p1);
    let xi = cg.add_bound_scalar_input(x.clone());
    cg.add_edge(&[pi, xi], Box::new(Add)).unwrap();

    assert_relative_eq!(cg.forward().unwrap().as_scalar().unwrap(), 5.0);
    cg.backward().unwrap();
    assert_relative_eq!(p1.read().unwrap().grad().as_scalar().unwrap(), 1.0);
    assert_eq!(cg.parameter_edge_count(), 1);
    assert!(!cg.is_parameter_node(xi).unwrap());
}

#[test]
fn test_forward_picks_up_mutated_binding() {
    let p1 = Parameters::shared(Tensor::scalar(2.0));
    let x = binding::bind(3.0f32);

    let mut cg = Hypergraph::new();
    let pi = cg.add_parameter(&p1);
    let xi = cg.add_bound_scalar_input(x.clone());
    cg.add_edge(&[pi, xi], Box::new(Add)).unwrap();
    assert_relative_eq!(cg.forward().unwrap().as_scalar().unwrap(), 5.0);

    binding::set(&x, 10.0).unwrap();
    assert_relative_eq!(cg.forward().unwrap().as_scalar().unwrap(), 12.0);
}

#[test]
fn test_bound_tensor_input_reuse() {
    let buffer = binding::bind(vec![1.0f32, 2.0, 3.0]);
    let target = Parameters::shared(Tensor::new(vec![0.0, 0.0, 0.0], [3]).unwrap());

    let mut cg = Hypergraph::new();
    let x = cg.add_bound_input([3], buffer.clone()).unwrap();
    let t = cg.add_parameter(&target);
    cg.add_edge(&[t, x], Box::new(SquaredDistance)).unwrap();
    assert_relative_eq!(cg.forward().unwrap().as_scalar().unwrap(), 14.0);

    buffer.write().unwrap().copy_from_slice(&[0.0, 0.0, 1.0]);
    assert_relative_eq!(cg.forward().unwrap().as_scalar().unwrap(), 1.0);
    cg.backward().unwrap();
    assert_eq!(target.read().unwrap().grad().data(), &[0.0, 0.0, -2.0]);
}

/// Fits embedding rows to fixed targets, building a fresh graph every step the
/// way a trainer would.
#[test]
fn test_training_loop_rebuilds_graph_each_step() {
    init_logger();
    let embeddings = LookupParameters::shared(LookupParameters::new(3, [2]));
    let targets = vec![
        Tensor::new(vec![1.0, -1.0], [2]).unwrap(),
        Tensor::new(vec![0.5, 2.0], [2]).unwrap(),
        Tensor::new(vec![-3.0, 0.0], [2]).unwrap(),
    ];
    let learning_rate = 0.1f32;
    let mut last_loss = f32::INFINITY;

    for _epoch in 0..50 {
        let mut epoch_loss = 0.0;
        for (row, target) in targets.iter().enumerate() {
            let mut cg = Hypergraph::new();
            let e = cg.add_lookup(&embeddings, row);
            let t = cg.add_input(target.clone());
            cg.add_edge(&[e, t], Box::new(SquaredDistance)).unwrap();
            epoch_loss += cg.forward().unwrap().as_scalar().unwrap();
            cg.backward().unwrap();

            // plain SGD on the touched rows
            let mut table = embeddings.write().unwrap();
            let touched: Vec<usize> = table.non_zero_grads().iter().copied().collect();
            for i in touched {
                let grad = table.grad(i).unwrap().clone();
                let values = table.row_mut(i).unwrap().data_mut();
                for (v, g) in values.iter_mut().zip(grad.data()) {
                    *v -= learning_rate * g;
                }
            }
            table.clear_grad();
        }
        assert!(epoch_loss <= last_loss);
        last_loss = epoch_loss;
    }

    assert!(last_loss < 1e-4, "loss did not converge: {}", last_loss);
    let table = embeddings.read().unwrap();
    for (row, target) in targets.iter().enumerate() {
        for (v, t) in table.row(row).unwrap().data().iter().zip(target.data()) {
            assert_relative_eq!(*v, *t, epsilon = 1e-2);
        }
    }
}

#[test]
fn test_dynamic_graph_interleaves_build_and_evaluate() {
    let p = Parameters::shared(Tensor::scalar(1.0));
    let mut cg = Hypergraph::new();
    let mut acc = cg.add_parameter(&p);
    cg.incremental_forward().unwrap();
    // keep adding the parameter while the running value stays below 5
    while cg.value(acc).unwrap().as_scalar().unwrap() < 5.0 {
        let w = cg.add_parameter(&p);
        acc = cg.add_edge(&[acc, w], Box::new(Add)).unwrap();
        cg.incremental_forward().unwrap();
    }
    assert_relative_eq!(cg.value(acc).unwrap().as_scalar().unwrap(), 5.0);
    cg.backward().unwrap();
    // five uses of p, each contributing 1
    assert_relative_eq!(p.read().unwrap().grad().as_scalar().unwrap(), 5.0);
    assert_eq!(cg.parameter_edge_count(), 5);
}
