pub mod extra;
pub mod kl;
pub mod run_config;

pub use extra::ExtraSettings;
pub use kl::KlWeighting;
pub use run_config::{DecoderSpec, EncoderSpec, MlpSpec, ModelFamily, RunConfig};
