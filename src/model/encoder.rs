use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::config::run_config::{EncoderSpec, ModelFamily};
use crate::layers::param::Param;
use crate::math::matrix::Matrix;
use crate::model::auxiliary::AuxParams;
use crate::model::basic::BasicEncoder;
use crate::model::flow::FlowEncoder;
use crate::model::iaf::IafStep;
use crate::model::planar::PlanarFlow;

/// What an encoder produces for one mini-batch.
#[derive(Debug, Clone)]
pub struct Encoding {
    pub aux: AuxParams,
    pub sample: Matrix,
}

/// Approximate posterior q(z|x).
///
/// `encode` must be deterministic given `noise`: all randomness enters
/// through that argument. `backward` accumulates parameter gradients from
/// ∂L/∂sample and ∂L/∂aux for the most recent `encode` call.
pub trait Encoder {
    fn encode(&mut self, input: &Matrix, noise: &Matrix) -> Encoding;
    fn backward(&mut self, grad_sample: &Matrix, grad_aux: &AuxParams);
    fn params_mut(&mut self) -> Vec<&mut Param>;
    fn latent_dim(&self) -> usize;
}

/// The encoder families selectable from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum EncoderVariant {
    Basic(BasicEncoder),
    Nf(FlowEncoder<PlanarFlow>),
    Iaf(FlowEncoder<IafStep>),
}

impl EncoderVariant {
    pub fn build<R: Rng + ?Sized>(spec: &EncoderSpec, dim_x: usize, dim_z: usize, rng: &mut R) -> Self {
        match spec.family {
            ModelFamily::Basic => EncoderVariant::Basic(BasicEncoder::new(dim_x, dim_z, &spec.net, rng)),
            ModelFamily::Nf => {
                let steps = (0..spec.flow_length).map(|_| PlanarFlow::new(dim_z, rng)).collect();
                EncoderVariant::Nf(FlowEncoder::new(dim_x, dim_z, &spec.net, steps, rng))
            }
            ModelFamily::Iaf => {
                // Alternate the autoregressive ordering between steps.
                let steps = (0..spec.flow_length).map(|k| IafStep::new(dim_z, k % 2 == 1, rng)).collect();
                EncoderVariant::Iaf(FlowEncoder::new(dim_x, dim_z, &spec.net, steps, rng))
            }
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            EncoderVariant::Basic(_) => ModelFamily::Basic,
            EncoderVariant::Nf(_) => ModelFamily::Nf,
            EncoderVariant::Iaf(_) => ModelFamily::Iaf,
        }
    }
}

impl Encoder for EncoderVariant {
    fn encode(&mut self, input: &Matrix, noise: &Matrix) -> Encoding {
        match self {
            EncoderVariant::Basic(e) => e.encode(input, noise),
            EncoderVariant::Nf(e) => e.encode(input, noise),
            EncoderVariant::Iaf(e) => e.encode(input, noise),
        }
    }

    fn backward(&mut self, grad_sample: &Matrix, grad_aux: &AuxParams) {
        match self {
            EncoderVariant::Basic(e) => e.backward(grad_sample, grad_aux),
            EncoderVariant::Nf(e) => e.backward(grad_sample, grad_aux),
            EncoderVariant::Iaf(e) => e.backward(grad_sample, grad_aux),
        }
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        match self {
            EncoderVariant::Basic(e) => e.params_mut(),
            EncoderVariant::Nf(e) => e.params_mut(),
            EncoderVariant::Iaf(e) => e.params_mut(),
        }
    }

    fn latent_dim(&self) -> usize {
        match self {
            EncoderVariant::Basic(e) => e.latent_dim(),
            EncoderVariant::Nf(e) => e.latent_dim(),
            EncoderVariant::Iaf(e) => e.latent_dim(),
        }
    }
}
