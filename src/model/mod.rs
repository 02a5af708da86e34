pub mod auxiliary;
pub mod basic;
pub mod decoder;
pub mod encoder;
pub mod flow;
pub mod gaussian;
pub mod iaf;
pub mod mlp;
pub mod planar;
pub mod vae;

pub use auxiliary::AuxParams;
pub use decoder::{Decoder, MlpDecoder};
pub use encoder::{Encoder, EncoderVariant, Encoding};
pub use flow::FlowStep;
pub use vae::{Forward, Vae, VaeModel};
