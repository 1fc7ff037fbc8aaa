//! Numerical gradient checking.
//!
//! An expression is described by a builder closure that receives one leaf per
//! input and returns the output value. The builder is replayed on fresh graphs
//! to probe the function with central differences, and once more to get the
//! analytic gradient from [`Value::backward`].

use crate::graph::Graph;
use crate::value::Value;

/// Analytic and numerical gradients of one expression at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct GradCheck {
    pub analytic: Vec<f64>,
    pub numeric: Vec<f64>,
    /// Largest absolute difference between the two; infinite if any entry
    /// of either side is not finite.
    pub max_error: f64,
}

impl GradCheck {
    pub fn passes(&self, tolerance: f64) -> bool {
        self.max_error.is_finite() && self.max_error < tolerance
    }
}

fn evaluate<F>(build: &F, point: &[f64]) -> f64
where
    F: for<'g> Fn(&[Value<'g>]) -> Value<'g>,
{
    let graph = Graph::new();
    let inputs: Vec<Value<'_>> = point.iter().map(|&x| graph.value(x)).collect();
    build(&inputs).value()
}

/// Gradient by backpropagation, one entry per input leaf.
pub fn analytic_gradient<F>(build: F, point: &[f64]) -> Vec<f64>
where
    F: for<'g> Fn(&[Value<'g>]) -> Value<'g>,
{
    let graph = Graph::new();
    let inputs: Vec<Value<'_>> = point.iter().map(|&x| graph.value(x)).collect();
    let output = build(&inputs);
    output.zero_grad();
    output.backward();
    inputs.iter().map(Value::grad).collect()
}

/// Gradient by central differences with step `eps`.
pub fn numeric_gradient<F>(build: F, point: &[f64], eps: f64) -> Vec<f64>
where
    F: for<'g> Fn(&[Value<'g>]) -> Value<'g>,
{
    let mut probe = point.to_vec();
    (0..point.len())
        .map(|i| {
            probe[i] = point[i] + eps;
            let up = evaluate(&build, &probe);
            probe[i] = point[i] - eps;
            let down = evaluate(&build, &probe);
            probe[i] = point[i];
            (up - down) / (2.0 * eps)
        })
        .collect()
}

/// Compare [`analytic_gradient`] against [`numeric_gradient`].
pub fn check_gradient<F>(build: F, point: &[f64], eps: f64) -> GradCheck
where
    F: for<'g> Fn(&[Value<'g>]) -> Value<'g>,
{
    let analytic = analytic_gradient(&build, point);
    let numeric = numeric_gradient(&build, point, eps);
    let max_error = analytic
        .iter()
        .zip(&numeric)
        .map(|(a, n)| {
            let diff = (a - n).abs();
            if diff.is_finite() {
                diff
            } else {
                f64::INFINITY
            }
        })
        .fold(0.0, f64::max);
    GradCheck {
        analytic,
        numeric,
        max_error,
    }
}
