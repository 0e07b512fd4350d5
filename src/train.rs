//! Plain gradient descent over a [`Mlp`].

use log::{debug, info};

use crate::{
    error::EngineError,
    nn::{Mlp, Module},
    value::Value,
};

#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 40,
            learning_rate: 0.05,
        }
    }
}

/// Sum of squared differences between predictions and targets.
pub fn squared_error_loss(predictions: &[Value], targets: &[f64]) -> Value {
    predictions
        .iter()
        .zip(targets)
        .fold(Value::new(0.), |acc, (p, &y)| acc.add(p.sub(y).powi(2)))
}

/// Loss of `model` summed over every sample.
pub fn batch_loss(model: &Mlp, xs: &[Vec<f64>], ys: &[Vec<f64>]) -> Result<Value, EngineError> {
    if xs.len() != ys.len() {
        return Err(EngineError::SampleCount {
            inputs: xs.len(),
            targets: ys.len(),
        });
    }
    let mut loss = Value::new(0.);
    for (x, y) in xs.iter().zip(ys) {
        let predictions = model.predict(x)?;
        if predictions.len() != y.len() {
            return Err(EngineError::InputSize {
                expected: predictions.len(),
                actual: y.len(),
            });
        }
        loss = loss.add(squared_error_loss(&predictions, y));
    }
    Ok(loss)
}

/// Trains `model` on the samples and returns the loss of every epoch,
/// measured before that epoch's update.
pub fn fit(
    model: &mut Mlp,
    xs: &[Vec<f64>],
    ys: &[Vec<f64>],
    config: &TrainConfig,
) -> Result<Vec<f64>, EngineError> {
    debug!(
        "training {} parameters on {} samples",
        model.parameters().len(),
        xs.len()
    );
    let mut history = Vec::with_capacity(config.epochs);
    for epoch in 0..config.epochs {
        let loss = batch_loss(model, xs, ys)?;

        model.zero_grad();
        loss.backward();

        for param in model.parameters_mut() {
            *param = Value::new(param.data() - config.learning_rate * param.grad());
        }

        info!("epoch {epoch}: loss {}", loss.data());
        history.push(loss.data());
    }
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn squared_error() {
        let preds = [Value::new(1.), Value::new(-2.)];
        let loss = squared_error_loss(&preds, &[0.5, 1.]);
        assert!((loss.data() - (0.25 + 9.)).abs() < 1e-12);
        loss.backward();
        assert!((preds[0].grad() - 1.).abs() < 1e-12);
        assert!((preds[1].grad() + 6.).abs() < 1e-12);
    }

    #[test]
    fn mismatched_samples() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut mlp = Mlp::new(2, 1, 2, 1, &mut rng);
        let err = fit(
            &mut mlp,
            &[vec![1., 2.]],
            &[vec![1.], vec![0.]],
            &TrainConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::SampleCount {
                inputs: 1,
                targets: 2
            }
        );

        let err = batch_loss(&mlp, &[vec![1., 2.]], &[vec![1., 0.]]).unwrap_err();
        assert_eq!(
            err,
            EngineError::InputSize {
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn update_replaces_parameter_leaves() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut mlp = Mlp::new(2, 1, 2, 1, &mut rng);
        let before = mlp.parameters();
        let config = TrainConfig {
            epochs: 1,
            learning_rate: 0.1,
        };
        fit(&mut mlp, &[vec![0.5, -0.5]], &[vec![1.]], &config).unwrap();
        let after = mlp.parameters();
        for (old, new) in before.iter().zip(&after) {
            assert!(!old.ptr_eq(new));
            assert!(new.is_leaf());
            assert!((new.data() - (old.data() - 0.1 * old.grad())).abs() < 1e-12);
        }
    }
}
