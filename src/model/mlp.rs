use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::activation::ActivationFunction, layers::dense::Layer};
use crate::layers::param::Param;
use crate::math::matrix::Matrix;

/// A stack of dense layers applied to a mini-batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mlp {
    pub input_size: usize,
    pub layers: Vec<Layer>,
}

impl Mlp {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        layer_specs: Vec<(usize, usize, ActivationFunction)>,
        rng: &mut R,
    ) -> Mlp {
        let layers = layer_specs.into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation, rng))
            .collect();
        Mlp { input_size, layers }
    }

    /// Hidden layers of the given widths sharing one activation.
    pub fn stack<R: Rng + ?Sized>(
        input_size: usize,
        hidden: &[usize],
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Mlp {
        let mut specs = Vec::with_capacity(hidden.len());
        let mut prev = input_size;
        for &size in hidden {
            specs.push((size, prev, activation));
            prev = size;
        }
        Mlp::new(input_size, specs, rng)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(self.input_size, |l| l.size)
    }

    /// Forward pass; stores activations in each layer for backprop.
    pub fn forward(&mut self, input: &Matrix) -> Matrix {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.feed_from(&current);
        }
        current
    }

    /// Backward pass from ∂L/∂output; returns ∂L/∂input.
    pub fn backward(&mut self, output_delta: &Matrix) -> Matrix {
        let mut delta = output_delta.clone();
        for layer in self.layers.iter_mut().rev() {
            delta = layer.backward(&delta);
        }
        delta
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        self.layers.iter_mut().flat_map(|l| l.params_mut()).collect()
    }
}
