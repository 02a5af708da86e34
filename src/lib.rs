pub mod math;
pub mod activation;
pub mod layers;
pub mod optim;
pub mod loss;
pub mod model;
pub mod config;
pub mod data;
pub mod imaging;
pub mod train;
pub mod cli;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use config::run_config::{ModelFamily, RunConfig};
pub use data::source::{BatchSource, DataSplits, Dataset};
pub use error::{Error, Result};
pub use loss::{ElboLoss, LossStrategy};
pub use model::vae::{Vae, VaeModel};
pub use train::session::run;
