use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::config::run_config::MlpSpec;
use crate::layers::param::Param;
use crate::math::matrix::Matrix;
use crate::model::auxiliary::{self, AuxParams};
use crate::model::encoder::{Encoder, Encoding};
use crate::model::gaussian::GaussianPosterior;

/// One invertible transform of the latent sample.
pub trait FlowStep {
    /// Returns the transformed batch and log|det J| per row.
    fn forward(&mut self, z: &Matrix) -> (Matrix, Vec<f64>);
    /// Given ∂L/∂output and ∂L/∂log|det J| per row, accumulates parameter
    /// gradients and returns ∂L/∂input.
    fn backward(&mut self, grad_out: &Matrix, grad_log_det: &[f64]) -> Matrix;
    fn params_mut(&mut self) -> Vec<&mut Param>;
}

/// Gaussian base posterior followed by a chain of flow steps.
///
/// Publishes `mu`, `log_var`, `z0`, `z` and the summed `log_det` so the loss
/// can form the flow-corrected KL estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEncoder<S> {
    posterior: GaussianPosterior,
    steps: Vec<S>,
}

impl<S: FlowStep> FlowEncoder<S> {
    pub fn new<R: Rng + ?Sized>(
        dim_x: usize,
        dim_z: usize,
        spec: &MlpSpec,
        steps: Vec<S>,
        rng: &mut R,
    ) -> Self {
        FlowEncoder { posterior: GaussianPosterior::new(dim_x, dim_z, spec, rng), steps }
    }
}

impl<S: FlowStep> Encoder for FlowEncoder<S> {
    fn encode(&mut self, input: &Matrix, noise: &Matrix) -> Encoding {
        let s = self.posterior.sample(input, noise);
        let mut z = s.z0.clone();
        let mut log_det = vec![0.0; z.rows];
        for step in &mut self.steps {
            let (next, ld) = step.forward(&z);
            for (acc, x) in log_det.iter_mut().zip(ld) {
                *acc += x;
            }
            z = next;
        }

        let mut aux = AuxParams::new();
        aux.insert(auxiliary::MU.to_owned(), s.mu);
        aux.insert(auxiliary::LOG_VAR.to_owned(), s.log_var);
        aux.insert(auxiliary::Z0.to_owned(), s.z0);
        aux.insert(auxiliary::Z.to_owned(), z.clone());
        aux.insert(auxiliary::LOG_DET.to_owned(), Matrix::column(&log_det));
        Encoding { aux, sample: z }
    }

    fn backward(&mut self, grad_sample: &Matrix, grad_aux: &AuxParams) {
        let (rows, cols) = grad_sample.shape();
        let mut grad_z = grad_sample.clone()
            + auxiliary::grad_or_zeros(grad_aux, auxiliary::Z, rows, cols);
        // Every step's log-det enters the sum with weight one.
        let grad_log_det: Vec<f64> = auxiliary::grad_or_zeros(grad_aux, auxiliary::LOG_DET, rows, 1)
            .row_sums();

        for step in self.steps.iter_mut().rev() {
            grad_z = step.backward(&grad_z, &grad_log_det);
        }

        let grad_z0 = grad_z + auxiliary::grad_or_zeros(grad_aux, auxiliary::Z0, rows, cols);
        let grad_mu = auxiliary::grad_or_zeros(grad_aux, auxiliary::MU, rows, cols);
        let grad_log_var = auxiliary::grad_or_zeros(grad_aux, auxiliary::LOG_VAR, rows, cols);
        self.posterior.backward(&grad_z0, &grad_mu, &grad_log_var);
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = self.posterior.params_mut();
        for step in &mut self.steps {
            params.extend(step.params_mut());
        }
        params
    }

    fn latent_dim(&self) -> usize {
        self.posterior.latent_dim()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Σ c ⊙ z' + Σ k_r · log_det_r for a fixed step, used by the gradient checks.
    pub fn objective<S: FlowStep>(step: &mut S, z: &Matrix, c: &Matrix, k: &[f64]) -> f64 {
        let (out, ld) = step.forward(z);
        out.hadamard(c).sum() + ld.iter().zip(k).map(|(a, b)| a * b).sum::<f64>()
    }

    /// Checks ∂/∂z and the gradient of every parameter entry against central
    /// differences.
    pub fn check_gradients<S: FlowStep>(step: &mut S, z: &Matrix, c: &Matrix, k: &[f64]) {
        let h = 1e-6;
        step.forward(z);
        for p in step.params_mut() {
            p.zero_grad();
        }
        let grad_z = step.backward(c, k);

        for i in 0..z.rows {
            for j in 0..z.cols {
                let mut plus = z.clone();
                plus.data[i][j] += h;
                let mut minus = z.clone();
                minus.data[i][j] -= h;
                let numeric = (objective(step, &plus, c, k) - objective(step, &minus, c, k)) / (2.0 * h);
                assert!((numeric - grad_z.data[i][j]).abs() < 1e-5, "dz[{i}][{j}]");
            }
        }

        let n_params = step.params_mut().len();
        for p_idx in 0..n_params {
            let (rows, cols) = step.params_mut()[p_idx].value.shape();
            for i in 0..rows {
                for j in 0..cols {
                    let analytic = step.params_mut()[p_idx].grad.data[i][j];
                    let original = step.params_mut()[p_idx].value.data[i][j];
                    step.params_mut()[p_idx].value.data[i][j] = original + h;
                    let up = objective(step, z, c, k);
                    step.params_mut()[p_idx].value.data[i][j] = original - h;
                    let down = objective(step, z, c, k);
                    step.params_mut()[p_idx].value.data[i][j] = original;
                    let numeric = (up - down) / (2.0 * h);
                    assert!((numeric - analytic).abs() < 1e-5, "param {p_idx} [{i}][{j}]");
                }
            }
        }
    }
}
