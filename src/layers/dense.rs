use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};
use crate::layers::param::Param;

/// Fully connected layer operating on a whole mini-batch (one row per
/// example). Weights are stored as (input_size, size).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer{
    pub size: usize,
    pub weights: Param,
    pub biases: Param,
    pub activator: ActivationFunction,
    #[serde(skip)]
    inputs: Matrix,
    #[serde(skip)]
    pre_neurons: Matrix,  // pre-activation values (z = xW + b) needed for correct derivative
    #[serde(skip)]
    pub neurons: Matrix,
}

impl Layer {
    /// He init before ReLU, Xavier otherwise. Biases start at zero.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let weights = match activation {
            ActivationFunction::ReLU => Matrix::he(input_size, size, rng),
            _ => Matrix::xavier(input_size, size, rng),
        };

        Layer {
            size,
            weights: Param::new(weights),
            biases: Param::new(Matrix::zeros(1, size)),
            activator: activation,
            inputs: Matrix::default(),
            pre_neurons: Matrix::default(),
            neurons: Matrix::default(),
        }
    }

    pub fn feed_from(&mut self, input: &Matrix) -> Matrix {
        let z = input.matmul(&self.weights.value).add_row(&self.biases.value);
        let a = z.map(|x| self.activator.function(x));
        self.inputs = input.clone();
        self.pre_neurons = z;
        self.neurons = a.clone();
        a
    }

    /// Computes gradient adjustments. Returns (weights_grad, layer_delta);
    /// the bias gradient is the batch sum of `layer_delta`.
    /// `next_layer_delta` is ∂L/∂a for this layer (error in activation space).
    pub fn compute_gradients(&self, next_layer_delta: &Matrix) -> (Matrix, Matrix) {
        // Use pre-activation z so that derivative(z) = σ'(z) is computed correctly
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        // δ = error ⊙ σ'(z)
        let layer_delta = next_layer_delta.hadamard(&act_derivative);

        let weights_adjustment = self.inputs.transpose().matmul(&layer_delta);

        (weights_adjustment, layer_delta)
    }

    /// Accumulates this layer's parameter gradients and returns ∂L/∂input.
    pub fn backward(&mut self, next_layer_delta: &Matrix) -> Matrix {
        let (w_grad, layer_delta) = self.compute_gradients(next_layer_delta);
        self.weights.accumulate(&w_grad);
        self.biases.accumulate(&layer_delta.sum_rows());
        layer_delta.matmul(&self.weights.value.transpose())
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weights, &mut self.biases]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // L = Σ c ⊙ layer(x); compare analytic gradients with central differences.
    fn objective(layer: &mut Layer, x: &Matrix, c: &Matrix) -> f64 {
        layer.feed_from(x).hadamard(c).sum()
    }

    #[test]
    fn backward_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = Layer::new(3, 4, ActivationFunction::Tanh, &mut rng);
        let x = Matrix::standard_normal(2, 4, &mut rng);
        let c = Matrix::standard_normal(2, 3, &mut rng);

        layer.feed_from(&x);
        let grad_x = layer.backward(&c);

        let h = 1e-6;
        for (i, j) in [(0, 0), (1, 3), (0, 2)] {
            let mut plus = x.clone();
            plus.data[i][j] += h;
            let mut minus = x.clone();
            minus.data[i][j] -= h;
            let numeric = (objective(&mut layer, &plus, &c) - objective(&mut layer, &minus, &c)) / (2.0 * h);
            assert!((numeric - grad_x.data[i][j]).abs() < 1e-6);
        }

        let analytic_w = layer.weights.grad.data[1][2];
        let w = layer.weights.value.data[1][2];
        layer.weights.value.data[1][2] = w + h;
        let up = objective(&mut layer, &x, &c);
        layer.weights.value.data[1][2] = w - h;
        let down = objective(&mut layer, &x, &c);
        assert!(((up - down) / (2.0 * h) - analytic_w).abs() < 1e-6);
    }
}
