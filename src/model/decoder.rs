use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::config::run_config::MlpSpec;
use crate::layers::dense::Layer;
use crate::layers::param::Param;
use crate::math::matrix::Matrix;
use crate::model::mlp::Mlp;

/// Generative network p(x|z).
pub trait Decoder {
    /// Maps a batch of latent samples to per-pixel probabilities.
    fn decode(&mut self, sample: &Matrix) -> Matrix;
    /// Accumulates parameter gradients and returns ∂L/∂sample.
    fn backward(&mut self, grad_reconstruction: &Matrix) -> Matrix;
    fn params_mut(&mut self) -> Vec<&mut Param>;
}

/// Hidden stack followed by a sigmoid output layer, i.e. a Bernoulli mean
/// for every pixel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpDecoder {
    net: Mlp,
    output: Layer,
}

impl MlpDecoder {
    pub fn new<R: Rng + ?Sized>(dim_z: usize, dim_x: usize, spec: &MlpSpec, rng: &mut R) -> Self {
        let net = Mlp::stack(dim_z, &spec.hidden, spec.activation, rng);
        let output = Layer::new(dim_x, net.output_size(), ActivationFunction::Sigmoid, rng);
        MlpDecoder { net, output }
    }
}

impl Decoder for MlpDecoder {
    fn decode(&mut self, sample: &Matrix) -> Matrix {
        let h = self.net.forward(sample);
        self.output.feed_from(&h)
    }

    fn backward(&mut self, grad_reconstruction: &Matrix) -> Matrix {
        let grad_h = self.output.backward(grad_reconstruction);
        self.net.backward(&grad_h)
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = self.net.params_mut();
        params.extend(self.output.params_mut());
        params
    }
}
