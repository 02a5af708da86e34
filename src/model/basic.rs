use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::config::run_config::MlpSpec;
use crate::layers::param::Param;
use crate::math::matrix::Matrix;
use crate::model::auxiliary::{self, AuxParams};
use crate::model::encoder::{Encoder, Encoding};
use crate::model::gaussian::GaussianPosterior;

/// Plain diagonal-Gaussian posterior; the sample is `z0` itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicEncoder {
    posterior: GaussianPosterior,
}

impl BasicEncoder {
    pub fn new<R: Rng + ?Sized>(dim_x: usize, dim_z: usize, spec: &MlpSpec, rng: &mut R) -> Self {
        BasicEncoder { posterior: GaussianPosterior::new(dim_x, dim_z, spec, rng) }
    }
}

impl Encoder for BasicEncoder {
    fn encode(&mut self, input: &Matrix, noise: &Matrix) -> Encoding {
        let s = self.posterior.sample(input, noise);
        let mut aux = AuxParams::new();
        aux.insert(auxiliary::MU.to_owned(), s.mu);
        aux.insert(auxiliary::LOG_VAR.to_owned(), s.log_var);
        Encoding { aux, sample: s.z0 }
    }

    fn backward(&mut self, grad_sample: &Matrix, grad_aux: &AuxParams) {
        let (rows, cols) = grad_sample.shape();
        let grad_mu = auxiliary::grad_or_zeros(grad_aux, auxiliary::MU, rows, cols);
        let grad_log_var = auxiliary::grad_or_zeros(grad_aux, auxiliary::LOG_VAR, rows, cols);
        self.posterior.backward(grad_sample, &grad_mu, &grad_log_var);
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        self.posterior.params_mut()
    }

    fn latent_dim(&self) -> usize {
        self.posterior.latent_dim()
    }
}
