use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::config::run_config::MlpSpec;
use crate::layers::dense::Layer;
use crate::layers::param::Param;
use crate::math::matrix::Matrix;
use crate::model::mlp::Mlp;

/// Diagonal Gaussian posterior q0(z|x) = N(mu(x), exp(log_var(x))) with a
/// reparameterized sample `z0 = mu + exp(log_var / 2) ⊙ ε`.
///
/// Shared by every encoder family; flow encoders transform `z0` further.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianPosterior {
    net: Mlp,
    mean: Layer,
    log_var: Layer,
    #[serde(skip)]
    noise: Matrix,
    #[serde(skip)]
    std_dev: Matrix,
}

/// One forward pass of the posterior.
pub struct PosteriorSample {
    pub mu: Matrix,
    pub log_var: Matrix,
    pub z0: Matrix,
}

impl GaussianPosterior {
    pub fn new<R: Rng + ?Sized>(dim_x: usize, dim_z: usize, spec: &MlpSpec, rng: &mut R) -> Self {
        let net = Mlp::stack(dim_x, &spec.hidden, spec.activation, rng);
        let hidden = net.output_size();
        GaussianPosterior {
            net,
            mean: Layer::new(dim_z, hidden, ActivationFunction::Identity, rng),
            log_var: Layer::new(dim_z, hidden, ActivationFunction::Identity, rng),
            noise: Matrix::default(),
            std_dev: Matrix::default(),
        }
    }

    pub fn latent_dim(&self) -> usize {
        self.mean.size
    }

    pub fn sample(&mut self, input: &Matrix, noise: &Matrix) -> PosteriorSample {
        let h = self.net.forward(input);
        let mu = self.mean.feed_from(&h);
        let log_var = self.log_var.feed_from(&h);
        let std_dev = log_var.map(|lv| (0.5 * lv).exp());
        let z0 = mu.clone() + std_dev.hadamard(noise);
        self.noise = noise.clone();
        self.std_dev = std_dev;
        PosteriorSample { mu, log_var, z0 }
    }

    /// Backpropagates ∂L/∂z0 plus any direct gradients on mu and log_var.
    pub fn backward(&mut self, grad_z0: &Matrix, grad_mu: &Matrix, grad_log_var: &Matrix) {
        let total_mu = grad_mu.clone() + grad_z0.clone();
        // ∂z0/∂log_var = ε ⊙ σ / 2
        let through_sample = grad_z0
            .hadamard(&self.noise)
            .hadamard(&self.std_dev)
            .scale(0.5);
        let total_log_var = grad_log_var.clone() + through_sample;

        let grad_h = self.mean.backward(&total_mu) + self.log_var.backward(&total_log_var);
        self.net.backward(&grad_h);
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = self.net.params_mut();
        params.extend(self.mean.params_mut());
        params.extend(self.log_var.params_mut());
        params
    }
}
