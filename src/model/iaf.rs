use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::layers::param::Param;
use crate::math::matrix::Matrix;
use crate::model::flow::FlowStep;

/// Dense layer whose weights are masked so output `i` only sees inputs
/// strictly before `i` in the step's ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MaskedLinear {
    weights: Param,
    biases: Param,
    mask: Matrix,
    #[serde(skip)]
    input: Matrix,
}

impl MaskedLinear {
    fn new<R: Rng + ?Sized>(dim: usize, reverse: bool, bias: f64, rng: &mut R) -> Self {
        // Row-vector convention: weights[j][i] connects input j to output i.
        let mask = Matrix::from_data(
            (0..dim)
                .map(|j| {
                    (0..dim)
                        .map(|i| if (reverse && j > i) || (!reverse && j < i) { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect(),
        );
        MaskedLinear {
            weights: Param::new(Matrix::uniform(dim, dim, rng).scale(0.05)),
            biases: Param::new(Matrix::filled(1, dim, bias)),
            mask,
            input: Matrix::default(),
        }
    }

    fn effective(&self) -> Matrix {
        self.weights.value.hadamard(&self.mask)
    }

    fn forward(&mut self, z: &Matrix) -> Matrix {
        self.input = z.clone();
        z.matmul(&self.effective()).add_row(&self.biases.value)
    }

    fn backward(&mut self, delta: &Matrix) -> Matrix {
        let w_grad = self.input.transpose().matmul(delta).hadamard(&self.mask);
        self.weights.accumulate(&w_grad);
        self.biases.accumulate(&delta.sum_rows());
        delta.matmul(&self.effective().transpose())
    }
}

/// `log σ(s)`, stable for large |s|.
fn log_sigmoid(s: f64) -> f64 {
    if s >= 0.0 {
        -(-s).exp().ln_1p()
    } else {
        s - s.exp().ln_1p()
    }
}

/// Inverse autoregressive flow step
/// `z' = σ ⊙ z + (1 - σ) ⊙ m` with `[m, s]` autoregressive in `z` and
/// `σ = sigmoid(s)`. The Jacobian is triangular, so
/// `log|det J| = Σ log σ`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IafStep {
    mean: MaskedLinear,
    gate: MaskedLinear,
    #[serde(skip)]
    z: Matrix,
    #[serde(skip)]
    m: Matrix,
    #[serde(skip)]
    sigma: Matrix,
}

impl IafStep {
    pub fn new<R: Rng + ?Sized>(dim_z: usize, reverse: bool, rng: &mut R) -> Self {
        IafStep {
            mean: MaskedLinear::new(dim_z, reverse, 0.0, rng),
            // Positive gate bias starts the step close to the identity.
            gate: MaskedLinear::new(dim_z, reverse, 1.0, rng),
            z: Matrix::default(),
            m: Matrix::default(),
            sigma: Matrix::default(),
        }
    }
}

impl FlowStep for IafStep {
    fn forward(&mut self, z: &Matrix) -> (Matrix, Vec<f64>) {
        let m = self.mean.forward(z);
        let s = self.gate.forward(z);
        let sigma = s.map(|x| ActivationFunction::Sigmoid.function(x));
        let out = sigma.hadamard(z) + sigma.map(|x| 1.0 - x).hadamard(&m);
        let log_det = s.map(log_sigmoid).row_sums();

        self.z = z.clone();
        self.m = m;
        self.sigma = sigma;
        (out, log_det)
    }

    fn backward(&mut self, grad_out: &Matrix, grad_log_det: &[f64]) -> Matrix {
        let one_minus = self.sigma.map(|x| 1.0 - x);
        let direct = grad_out.hadamard(&self.sigma);
        let grad_m = grad_out.hadamard(&one_minus);

        // ∂L/∂s = g ⊙ (z - m) ⊙ σ(1 - σ) + ∂L/∂logdet ⊙ (1 - σ)
        let spread = self.z.zip_map(&self.m, |a, b| a - b)
            .hadamard(&self.sigma)
            .hadamard(&one_minus)
            .hadamard(grad_out);
        let mut grad_s = spread;
        for (r, row) in grad_s.data.iter_mut().enumerate() {
            for (x, om) in row.iter_mut().zip(one_minus.data[r].iter()) {
                *x += grad_log_det[r] * om;
            }
        }

        direct + self.mean.backward(&grad_m) + self.gate.backward(&grad_s)
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![
            &mut self.mean.weights,
            &mut self.mean.biases,
            &mut self.gate.weights,
            &mut self.gate.biases,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::flow::testing::check_gradients;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(17);
        for reverse in [false, true] {
            let mut step = IafStep::new(3, reverse, &mut rng);
            step.mean.weights.value = Matrix::uniform(3, 3, &mut rng);
            step.gate.weights.value = Matrix::uniform(3, 3, &mut rng);
            let z = Matrix::standard_normal(2, 3, &mut rng);
            let c = Matrix::standard_normal(2, 3, &mut rng);
            check_gradients(&mut step, &z, &c, &[0.4, 1.1]);
        }
    }

    #[test]
    fn step_is_autoregressive() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut step = IafStep::new(3, false, &mut rng);
        step.mean.weights.value = Matrix::uniform(3, 3, &mut rng);
        let z = Matrix::from_data(vec![vec![0.1, 0.2, 0.3]]);
        let (a, _) = step.forward(&z);
        let mut later = z.clone();
        later.data[0][2] = 5.0;
        let (b, _) = step.forward(&later);
        // Changing the last coordinate leaves earlier outputs untouched.
        assert_eq!(a.data[0][0], b.data[0][0]);
        assert_eq!(a.data[0][1], b.data[0][1]);
    }
}
