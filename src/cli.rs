//! Command-line surface of the `vae-flow` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::config::kl::KlWeighting;
use crate::config::run_config::{ModelFamily, RunConfig};
use crate::error::Result;
use crate::optim::optimizer::OptimizerKind;

/// Train a variational autoencoder on binarized MNIST
#[derive(Parser, Debug, Clone)]
#[command(name = "vae-flow", version, about)]
pub struct Args {
    /// Diagonal Gaussian posterior
    #[arg(long)]
    pub basic: bool,

    /// Planar normalizing-flow posterior
    #[arg(long)]
    pub nf: bool,

    /// Inverse autoregressive flow posterior
    #[arg(long)]
    pub iaf: bool,

    /// Number of flow steps
    #[arg(long, default_value_t = 1)]
    pub flow: usize,

    /// Seed for data shuffling, initialization and noise
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Halve the learning rate after 5 epochs without validation improvement
    #[arg(long)]
    pub anneal_lr: bool,

    /// Directory holding binarized_mnist_{train,valid}.amat or train-images-idx3-ubyte
    #[arg(long, default_value = "data")]
    pub data: PathBuf,

    /// Root under which each run creates a timestamped directory
    #[arg(long, default_value = "results")]
    pub results: PathBuf,

    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,

    #[arg(long, value_enum, default_value_t = OptimizerKind::Adam)]
    pub optimizer: OptimizerKind,

    /// Fixed weight on the KL term
    #[arg(long, conflicts_with = "kl_anneal_rate")]
    pub kl_weight: Option<f64>,

    /// Anneal the KL weight as 1 - exp(-epoch / rate)
    #[arg(long)]
    pub kl_anneal_rate: Option<f64>,

    /// Load the whole run configuration from JSON; model and training flags are ignored
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn into_run_config(&self) -> Result<RunConfig> {
        let config = match &self.config {
            Some(path) => RunConfig::load_json(path)?,
            None => self.flags_config()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn flags_config(&self) -> Result<RunConfig> {
        let family = ModelFamily::from_flags(self.basic, self.nf, self.iaf)?;
        let mut config = RunConfig::mnist(family, self.flow);
        config.dataset = format!("binarized_mnist({})", self.data.display());
        config.results_dir = self.results.clone();
        config.max_epochs = self.epochs;
        config.batch_size = self.batch_size;
        config.learning_rate = self.learning_rate;
        config.optimizer = self.optimizer;
        config.seed = self.seed;
        config.set_anneal_lr(self.anneal_lr);
        config.kl_weighting = match (self.kl_weight, self.kl_anneal_rate) {
            (_, Some(rate)) => KlWeighting::Annealed { rate },
            (Some(weight), None) => KlWeighting::Fixed { weight },
            (None, None) => KlWeighting::default(),
        };
        Ok(config)
    }
}
