//! Neurons, layers and a multi-layer perceptron composed from [`Value`]s.

use rand::Rng;

use crate::{error::EngineError, value::Value};

/// Anything holding trainable parameters.
pub trait Module {
    fn parameters(&self) -> Vec<Value>;

    /// Mutable slots of the same parameters, in the same order, so that an
    /// optimizer can swap in updated leaves.
    fn parameters_mut(&mut self) -> Vec<&mut Value>;

    fn zero_grad(&self) {
        for p in self.parameters() {
            p.zero_grad();
        }
    }
}

/// A single tanh neuron.
pub struct Neuron {
    weights: Vec<Value>,
    bias: Value,
}

impl Neuron {
    /// Weights and bias drawn uniformly from [-1, 1].
    pub fn new(num_inputs: usize, rng: &mut impl Rng) -> Self {
        Self {
            weights: (0..num_inputs)
                .map(|_| Value::new(rng.gen_range(-1.0..=1.0)))
                .collect(),
            bias: Value::new(rng.gen_range(-1.0..=1.0)),
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.weights.len()
    }

    pub fn forward(&self, inputs: &[Value]) -> Result<Value, EngineError> {
        if inputs.len() != self.weights.len() {
            return Err(EngineError::InputSize {
                expected: self.weights.len(),
                actual: inputs.len(),
            });
        }
        let activation = self
            .weights
            .iter()
            .zip(inputs)
            .fold(self.bias.clone(), |acc, (w, x)| acc.add(w.mul(x)));
        Ok(activation.tanh())
    }
}

impl Module for Neuron {
    fn parameters(&self) -> Vec<Value> {
        let mut params = self.weights.clone();
        params.push(self.bias.clone());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Value> {
        self.weights
            .iter_mut()
            .chain(std::iter::once(&mut self.bias))
            .collect()
    }
}

pub struct Layer {
    neurons: Vec<Neuron>,
}

impl Layer {
    pub fn new(num_inputs: usize, num_outputs: usize, rng: &mut impl Rng) -> Self {
        Self {
            neurons: (0..num_outputs)
                .map(|_| Neuron::new(num_inputs, rng))
                .collect(),
        }
    }

    pub fn num_outputs(&self) -> usize {
        self.neurons.len()
    }

    /// One output per neuron.
    pub fn forward(&self, inputs: &[Value]) -> Result<Vec<Value>, EngineError> {
        self.neurons.iter().map(|n| n.forward(inputs)).collect()
    }
}

impl Module for Layer {
    fn parameters(&self) -> Vec<Value> {
        self.neurons.iter().flat_map(|n| n.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Value> {
        self.neurons
            .iter_mut()
            .flat_map(|n| n.parameters_mut())
            .collect()
    }
}

/// Multi-layer perceptron: `num_hidden` layers of `hidden_size` neurons
/// followed by an output layer of `num_outputs` neurons.
pub struct Mlp {
    num_inputs: usize,
    hidden: Vec<Layer>,
    output: Layer,
}

impl Mlp {
    pub fn new(
        num_inputs: usize,
        num_outputs: usize,
        hidden_size: usize,
        num_hidden: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let hidden = (0..num_hidden)
            .map(|i| {
                let nin = if i == 0 { num_inputs } else { hidden_size };
                Layer::new(nin, hidden_size, rng)
            })
            .collect();
        let output_inputs = if num_hidden == 0 {
            num_inputs
        } else {
            hidden_size
        };
        Self {
            num_inputs,
            hidden,
            output: Layer::new(output_inputs, num_outputs, rng),
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.output.num_outputs()
    }

    pub fn forward(&self, inputs: &[Value]) -> Result<Vec<Value>, EngineError> {
        let mut x = inputs.to_vec();
        for layer in &self.hidden {
            x = layer.forward(&x)?;
        }
        self.output.forward(&x)
    }

    /// Runs the network on plain numbers, each turned into a fresh leaf.
    pub fn predict(&self, inputs: &[f64]) -> Result<Vec<Value>, EngineError> {
        let inputs: Vec<Value> = inputs.iter().map(|&x| Value::new(x)).collect();
        self.forward(&inputs)
    }
}

impl Module for Mlp {
    fn parameters(&self) -> Vec<Value> {
        self.hidden
            .iter()
            .chain(std::iter::once(&self.output))
            .flat_map(|layer| layer.parameters())
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Value> {
        self.hidden
            .iter_mut()
            .chain(std::iter::once(&mut self.output))
            .flat_map(|layer| layer.parameters_mut())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn parameter_counts() {
        let mut rng = StdRng::seed_from_u64(0);
        let neuron = Neuron::new(3, &mut rng);
        assert_eq!(neuron.parameters().len(), 4);

        let layer = Layer::new(3, 2, &mut rng);
        assert_eq!(layer.parameters().len(), 8);

        // 3 -> 4 -> 4 -> 1
        let mut mlp = Mlp::new(3, 1, 4, 2, &mut rng);
        assert_eq!(mlp.parameters().len(), 16 + 20 + 5);
        assert_eq!(mlp.parameters_mut().len(), 41);
        assert!(mlp
            .parameters()
            .iter()
            .all(|p| (-1.0..=1.0).contains(&p.data())));
    }

    #[test]
    fn parameters_mut_matches_parameters() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut mlp = Mlp::new(2, 2, 3, 1, &mut rng);
        let params = mlp.parameters();
        for (p, slot) in params.iter().zip(mlp.parameters_mut()) {
            assert!(p.ptr_eq(slot));
        }
    }

    #[test]
    fn neuron_output_is_tanh_of_affine() {
        let mut rng = StdRng::seed_from_u64(2);
        let neuron = Neuron::new(2, &mut rng);
        let params = neuron.parameters();
        let out = neuron
            .forward(&[Value::new(0.5), Value::new(-2.)])
            .unwrap();
        let expected = (params[0].data() * 0.5 - params[1].data() * 2. + params[2].data()).tanh();
        assert!((out.data() - expected).abs() < 1e-12);
    }

    #[test]
    fn wrong_input_size() {
        let mut rng = StdRng::seed_from_u64(3);
        let mlp = Mlp::new(3, 1, 2, 1, &mut rng);
        assert_eq!(
            mlp.predict(&[1., 2.]).unwrap_err(),
            EngineError::InputSize {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn no_hidden_layers() {
        let mut rng = StdRng::seed_from_u64(4);
        let mlp = Mlp::new(2, 3, 5, 0, &mut rng);
        assert_eq!(mlp.predict(&[0.1, 0.2]).unwrap().len(), 3);
        assert_eq!(mlp.parameters().len(), 9);
    }
}
