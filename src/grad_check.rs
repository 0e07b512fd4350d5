//! Gradient checking against central finite differences.

use log::debug;
use thiserror::Error;

use crate::value::Value;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for input {input_index}: analytical grad {analytical} != numerical grad {numerical}. Difference: {difference}")]
    GradientMismatch {
        input_index: usize,
        analytical: f64,
        numerical: f64,
        difference: f64,
    },

    #[error("Numerical gradient is NaN or infinite for input {input_index}. Loss+: {loss_plus}, Loss-: {loss_minus}")]
    NumericalNonFinite {
        input_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },

    #[error("Analytical gradient is NaN or infinite for input {input_index}. Value: {value}")]
    AnalyticalNonFinite { input_index: usize, value: f64 },
}

/// Checks the gradients produced by [`Value::backward`] on `func` at `inputs`
/// against central differences with step `epsilon`.
///
/// A gradient passes if it lies within `tolerance * (1 + |numerical|)` of the
/// numerical estimate.
pub fn check_grad<F>(
    func: F,
    inputs: &[f64],
    epsilon: f64,
    tolerance: f64,
) -> Result<(), GradCheckError>
where
    F: Fn(&[Value]) -> Value,
{
    let leaves: Vec<Value> = inputs.iter().map(|&x| Value::new(x)).collect();
    let output = func(&leaves);
    output.backward();

    for (input_index, leaf) in leaves.iter().enumerate() {
        let analytical = leaf.grad();
        if !analytical.is_finite() {
            return Err(GradCheckError::AnalyticalNonFinite {
                input_index,
                value: analytical,
            });
        }

        let loss_plus = eval_shifted(&func, inputs, input_index, epsilon);
        let loss_minus = eval_shifted(&func, inputs, input_index, -epsilon);
        let numerical = (loss_plus - loss_minus) / (2. * epsilon);
        if !numerical.is_finite() {
            return Err(GradCheckError::NumericalNonFinite {
                input_index,
                loss_plus,
                loss_minus,
            });
        }

        let difference = (analytical - numerical).abs();
        debug!("input {input_index}: analytical {analytical}, numerical {numerical}");
        if difference > tolerance * (1. + numerical.abs()) {
            return Err(GradCheckError::GradientMismatch {
                input_index,
                analytical,
                numerical,
                difference,
            });
        }
    }
    Ok(())
}

fn eval_shifted<F>(func: &F, inputs: &[f64], shifted: usize, delta: f64) -> f64
where
    F: Fn(&[Value]) -> Value,
{
    let leaves: Vec<Value> = inputs
        .iter()
        .enumerate()
        .map(|(i, &x)| Value::new(if i == shifted { x + delta } else { x }))
        .collect();
    func(&leaves).data()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;
    const TOLERANCE: f64 = 1e-5;

    #[test]
    fn primitive_ops() {
        for &x in &[-2.5, -0.7, 0.3, 1., 2.2] {
            for &y in &[-1.5, 0.4, 3.] {
                check_grad(|v| v[0].add(&v[1]), &[x, y], EPSILON, TOLERANCE).unwrap();
                check_grad(|v| v[0].mul(&v[1]), &[x, y], EPSILON, TOLERANCE).unwrap();
            }
            check_grad(|v| v[0].exp(), &[x], EPSILON, TOLERANCE).unwrap();
            check_grad(|v| v[0].tanh(), &[x], EPSILON, TOLERANCE).unwrap();
            check_grad(|v| v[0].relu(), &[x], EPSILON, TOLERANCE).unwrap();
            check_grad(|v| v[0].powi(3), &[x], EPSILON, TOLERANCE).unwrap();
            check_grad(|v| v[0].pow(-2.), &[x], EPSILON, TOLERANCE).unwrap();
        }
    }

    #[test]
    fn real_exponent() {
        for &x in &[0.2, 1., 4.5] {
            check_grad(|v| v[0].pow(0.5), &[x], EPSILON, TOLERANCE).unwrap();
            check_grad(|v| v[0].pow(2.7), &[x], EPSILON, TOLERANCE).unwrap();
        }
    }

    #[test]
    fn composite_ops() {
        for &(x, y) in &[(1.5, -2.), (-0.3, 0.8), (4., 2.5)] {
            check_grad(|v| v[0].sub(&v[1]), &[x, y], EPSILON, TOLERANCE).unwrap();
            check_grad(|v| v[0].div(&v[1]), &[x, y], EPSILON, TOLERANCE).unwrap();
            check_grad(|v| v[0].neg(), &[x], EPSILON, TOLERANCE).unwrap();
        }
    }

    #[test]
    fn detects_a_wrong_gradient() {
        // Leaves the derivative of the second use of x out of the graph.
        let err = check_grad(
            |v| v[0].mul(Value::new(v[0].data())),
            &[3.],
            EPSILON,
            TOLERANCE,
        )
        .unwrap_err();
        match err {
            GradCheckError::GradientMismatch {
                input_index,
                analytical,
                ..
            } => {
                assert_eq!(input_index, 0);
                assert_eq!(analytical, 3.);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
