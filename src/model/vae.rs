use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::config::run_config::RunConfig;
use crate::layers::param::Param;
use crate::math::matrix::Matrix;
use crate::model::auxiliary::AuxParams;
use crate::model::decoder::{Decoder, MlpDecoder};
use crate::model::encoder::{Encoder, EncoderVariant};

/// Everything one forward pass hands to the loss.
#[derive(Debug, Clone)]
pub struct Forward {
    pub aux: AuxParams,
    pub sample: Matrix,
    pub reconstruction: Matrix,
}

/// An encoder/decoder pair trained jointly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vae<E, D> {
    pub encoder: E,
    pub decoder: D,
}

/// The concrete model the command line builds.
pub type VaeModel = Vae<EncoderVariant, MlpDecoder>;

impl<E: Encoder, D: Decoder> Vae<E, D> {
    pub fn new(encoder: E, decoder: D) -> Self {
        Vae { encoder, decoder }
    }

    pub fn latent_dim(&self) -> usize {
        self.encoder.latent_dim()
    }

    pub fn forward(&mut self, input: &Matrix, noise: &Matrix) -> Forward {
        let encoding = self.encoder.encode(input, noise);
        let reconstruction = self.decoder.decode(&encoding.sample);
        Forward { aux: encoding.aux, sample: encoding.sample, reconstruction }
    }

    /// Backpropagates loss gradients through the decoder then the encoder.
    /// Must follow the `forward` call the gradients were computed from.
    pub fn backward(&mut self, grad_reconstruction: &Matrix, grad_aux: &AuxParams) {
        let grad_sample = self.decoder.backward(grad_reconstruction);
        self.encoder.backward(&grad_sample, grad_aux);
    }

    pub fn zero_grad(&mut self) {
        for p in self.params_mut() {
            p.zero_grad();
        }
    }

    /// Encoder parameters first, then decoder parameters. The order is
    /// stable across calls.
    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = self.encoder.params_mut();
        params.extend(self.decoder.params_mut());
        params
    }
}

impl VaeModel {
    pub fn from_config<R: Rng + ?Sized>(config: &RunConfig, rng: &mut R) -> VaeModel {
        let encoder = EncoderVariant::build(&config.encoder, config.dim_x, config.dim_z, rng);
        let decoder = MlpDecoder::new(config.dim_z, config.dim_x, &config.decoder.net, rng);
        Vae::new(encoder, decoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::config::run_config::{EncoderSpec, MlpSpec, ModelFamily};
    use crate::loss::elbo::ElboLoss;
    use crate::loss::strategy::LossStrategy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tiny(family: ModelFamily, rng: &mut StdRng) -> VaeModel {
        let net = MlpSpec { hidden: vec![3], activation: ActivationFunction::Tanh };
        let encoder = EncoderVariant::build(
            &EncoderSpec { family, net: net.clone(), flow_length: 2 },
            4,
            2,
            rng,
        );
        let decoder = MlpDecoder::new(2, 4, &net, rng);
        Vae::new(encoder, decoder)
    }

    fn objective(model: &mut VaeModel, x: &Matrix, noise: &Matrix) -> f64 {
        let f = model.forward(x, noise);
        ElboLoss.evaluate(&f.reconstruction, x, 1.0, &f.aux).training
    }

    #[test]
    fn end_to_end_gradients_match_finite_differences() {
        let x = Matrix::from_data(vec![vec![1.0, 0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0, 0.0]]);
        for family in [ModelFamily::Basic, ModelFamily::Nf, ModelFamily::Iaf] {
            let mut rng = StdRng::seed_from_u64(23);
            let mut model = tiny(family, &mut rng);
            let noise = Matrix::standard_normal(2, 2, &mut rng);

            model.zero_grad();
            let f = model.forward(&x, &noise);
            let grads = ElboLoss.gradients(&f.reconstruction, &x, 1.0, &f.aux);
            model.backward(&grads.reconstruction, &grads.aux);

            let h = 1e-6;
            let n_params = model.params_mut().len();
            for p_idx in 0..n_params {
                let (rows, cols) = model.params_mut()[p_idx].value.shape();
                // Spot-check the first and last entry of every parameter.
                for (i, j) in [(0, 0), (rows - 1, cols - 1)] {
                    let analytic = model.params_mut()[p_idx].grad.data[i][j];
                    let original = model.params_mut()[p_idx].value.data[i][j];
                    model.params_mut()[p_idx].value.data[i][j] = original + h;
                    let up = objective(&mut model, &x, &noise);
                    model.params_mut()[p_idx].value.data[i][j] = original - h;
                    let down = objective(&mut model, &x, &noise);
                    model.params_mut()[p_idx].value.data[i][j] = original;
                    let numeric = (up - down) / (2.0 * h);
                    assert!(
                        (numeric - analytic).abs() < 1e-4 * analytic.abs().max(1.0),
                        "{family} param {p_idx} [{i}][{j}]: {numeric} vs {analytic}",
                    );
                }
            }
        }
    }

    #[test]
    fn aux_keys_follow_the_family() {
        let mut rng = StdRng::seed_from_u64(1);
        let x = Matrix::zeros(1, 4);
        let noise = Matrix::zeros(1, 2);
        let basic = tiny(ModelFamily::Basic, &mut rng).forward(&x, &noise);
        let iaf = tiny(ModelFamily::Iaf, &mut rng).forward(&x, &noise);
        assert_eq!(basic.aux.keys().collect::<Vec<_>>(), vec!["log_var", "mu"]);
        assert_eq!(iaf.aux.keys().collect::<Vec<_>>(), vec!["log_det", "log_var", "mu", "z", "z0"]);
        assert_eq!(basic.reconstruction.shape(), (1, 4));
    }

    #[test]
    fn model_survives_a_json_round_trip() {
        let mut rng = StdRng::seed_from_u64(4);
        let model = tiny(ModelFamily::Nf, &mut rng);
        let json = serde_json::to_string(&model).expect("serialize");
        let back: VaeModel = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.encoder.family(), ModelFamily::Nf);
    }
}
