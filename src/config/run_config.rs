use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::config::extra::ExtraSettings;
use crate::config::kl::KlWeighting;
use crate::error::{Error, Result};
use crate::loss::loss_type::LossKind;
use crate::optim::optimizer::OptimizerKind;

/// Extension key for the learning-rate halving toggle.
pub const ANNEAL_LR: &str = "anneal_lr";

/// Hidden layer widths of a fully connected stack and their shared
/// activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpSpec {
    pub hidden: Vec<usize>,
    pub activation: ActivationFunction,
}

impl fmt::Display for MlpSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hidden={:?}, activation={}", self.hidden, self.activation)
    }
}

/// Which approximate posterior the encoder uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Diagonal Gaussian.
    Basic,
    /// Gaussian followed by planar normalizing flows.
    Nf,
    /// Gaussian followed by inverse autoregressive flows.
    Iaf,
}

impl ModelFamily {
    /// Resolves the mutually exclusive command-line flags.
    pub fn from_flags(basic: bool, nf: bool, iaf: bool) -> Result<ModelFamily> {
        match (basic, nf, iaf) {
            (true, false, false) => Ok(ModelFamily::Basic),
            (false, true, false) => Ok(ModelFamily::Nf),
            (false, false, true) => Ok(ModelFamily::Iaf),
            (false, false, false) => Err(Error::config("one of --basic, --nf or --iaf is required")),
            _ => Err(Error::config("--basic, --nf and --iaf are mutually exclusive")),
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Basic => f.write_str("basic"),
            ModelFamily::Nf => f.write_str("nf"),
            ModelFamily::Iaf => f.write_str("iaf"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSpec {
    pub family: ModelFamily,
    pub net: MlpSpec,
    /// Number of flow steps; ignored by the basic family.
    #[serde(default)]
    pub flow_length: usize,
}

impl fmt::Display for EncoderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            ModelFamily::Basic => write!(f, "basic({})", self.net),
            family => write!(f, "{family}(flow_length={}, {})", self.flow_length, self.net),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderSpec {
    pub net: MlpSpec,
}

impl fmt::Display for DecoderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bernoulli_mlp({})", self.net)
    }
}

/// Everything that fixes a training run. Built once, never mutated while
/// the run is in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub image_width: usize,
    pub dim_x: usize,
    pub dim_z: usize,
    pub encoder: EncoderSpec,
    pub decoder: DecoderSpec,
    /// Human-readable description of where the data came from.
    pub dataset: String,
    pub learning_rate: f64,
    pub optimizer: OptimizerKind,
    pub loss: LossKind,
    pub batch_size: usize,
    /// Root under which each run creates its own timestamped directory.
    pub results_dir: PathBuf,
    pub max_epochs: usize,
    /// Validation images reconstructed at the end of every epoch.
    pub n_view: usize,
    pub seed: u64,
    #[serde(default)]
    pub kl_weighting: KlWeighting,
    #[serde(default)]
    pub extra: ExtraSettings,
}

impl RunConfig {
    /// Binarized-MNIST defaults: 784 → [300, 300] tanh → 40 latent
    /// dimensions, Adam at 1e-3, batches of 100 for 100 epochs.
    pub fn mnist(family: ModelFamily, flow_length: usize) -> RunConfig {
        let enc_dims = vec![300, 300];
        let dec_dims = vec![300, 300];

        let mut extra = ExtraSettings::new();
        extra.insert("flow length", flow_length);
        extra.insert("encoder structure", enc_dims.clone());
        extra.insert("decoder structure", dec_dims.clone());
        extra.insert(ANNEAL_LR, false);

        RunConfig {
            image_width: 28,
            dim_x: 784,
            dim_z: 40,
            encoder: EncoderSpec {
                family,
                net: MlpSpec { hidden: enc_dims, activation: ActivationFunction::Tanh },
                flow_length,
            },
            decoder: DecoderSpec {
                net: MlpSpec { hidden: dec_dims, activation: ActivationFunction::Tanh },
            },
            dataset: "binarized_mnist".to_owned(),
            learning_rate: 0.001,
            optimizer: OptimizerKind::Adam,
            loss: LossKind::Elbo,
            batch_size: 100,
            results_dir: PathBuf::from("results"),
            max_epochs: 100,
            n_view: 10,
            seed: 0,
            kl_weighting: KlWeighting::default(),
            extra,
        }
    }

    /// Whether the scheduler may halve the learning rate on a plateau.
    pub fn anneal_lr(&self) -> bool {
        self.extra.flag(ANNEAL_LR)
    }

    pub fn set_anneal_lr(&mut self, enabled: bool) {
        self.extra.insert(ANNEAL_LR, enabled);
    }

    /// Checks that the configuration describes a run that can start.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        if self.max_epochs == 0 {
            return Err(Error::config("max_epochs must be at least 1"));
        }
        if self.n_view == 0 {
            return Err(Error::config("n_view must be at least 1"));
        }
        if self.dim_z == 0 {
            return Err(Error::config("dim_z must be at least 1"));
        }
        if self.dim_x != self.image_width * self.image_width {
            return Err(Error::config(format!(
                "dim_x ({}) must equal image_width² ({}×{})",
                self.dim_x, self.image_width, self.image_width
            )));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        self.kl_weighting.validate()
    }

    /// Checks the configuration against the data it is about to train on.
    pub fn validate_data(&self, train_size: usize, valid_size: usize, dim: usize) -> Result<()> {
        if dim != self.dim_x {
            return Err(Error::config(format!(
                "examples have {} values but dim_x is {}",
                dim, self.dim_x
            )));
        }
        if train_size < self.batch_size {
            return Err(Error::config(format!(
                "training set ({train_size} examples) is smaller than one batch ({})",
                self.batch_size
            )));
        }
        if valid_size < self.batch_size {
            return Err(Error::config(format!(
                "validation set ({valid_size} examples) is smaller than one batch ({})",
                self.batch_size
            )));
        }
        if self.n_view > valid_size {
            return Err(Error::config(format!(
                "n_view ({}) exceeds the validation set ({valid_size} examples)",
                self.n_view
            )));
        }
        Ok(())
    }

    /// `name: value` lines for the settings record: every field in
    /// declaration order, then the extra settings.
    pub fn settings_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("image_width: {}", self.image_width),
            format!("dim_x: {}", self.dim_x),
            format!("dim_z: {}", self.dim_z),
            format!("encoder: {}", self.encoder),
            format!("decoder: {}", self.decoder),
            format!("dataset: {}", self.dataset),
            format!("learning_rate: {}", self.learning_rate),
            format!("optimizer: {}", self.optimizer),
            format!("loss: {}", self.loss),
            format!("batch_size: {}", self.batch_size),
            format!("results_dir: {}", self.results_dir.display()),
            format!("max_epochs: {}", self.max_epochs),
            format!("n_view: {}", self.n_view),
            format!("seed: {}", self.seed),
            format!("kl_weighting: {}", self.kl_weighting),
        ];
        lines.extend(self.extra.lines());
        lines
    }

    /// Serializes the configuration to a pretty-printed JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::storage(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| Error::storage(path, e))
    }

    /// Reads a configuration previously written by `save_json` (or by hand).
    pub fn load_json(path: &Path) -> Result<RunConfig> {
        let file = File::open(path)
            .map_err(|e| Error::config(format!("cannot open {}: {e}", path.display())))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::config(format!("invalid run configuration {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exactly_one_family_flag() {
        assert_eq!(ModelFamily::from_flags(false, true, false).ok(), Some(ModelFamily::Nf));
        assert!(matches!(
            ModelFamily::from_flags(true, true, false),
            Err(Error::Configuration { .. })
        ));
        assert!(matches!(
            ModelFamily::from_flags(false, false, false),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn mnist_defaults_validate() {
        let config = RunConfig::mnist(ModelFamily::Iaf, 2);
        assert!(config.validate().is_ok());
        assert!(!config.anneal_lr());
        assert_eq!(config.encoder.to_string(), "iaf(flow_length=2, hidden=[300, 300], activation=tanh)");
    }

    #[test]
    fn rejects_degenerate_sizes() {
        let mut config = RunConfig::mnist(ModelFamily::Basic, 1);
        config.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::mnist(ModelFamily::Basic, 1);
        config.dim_x = 100;
        assert!(config.validate().is_err());

        let config = RunConfig::mnist(ModelFamily::Basic, 1);
        assert!(config.validate_data(99, 1000, 784).is_err());
        assert!(config.validate_data(1000, 5, 784).is_err());
        assert!(config.validate_data(1000, 1000, 783).is_err());
        assert!(config.validate_data(1000, 100, 784).is_ok());
    }

    #[test]
    fn settings_lines_cover_fields_then_extras() {
        let mut config = RunConfig::mnist(ModelFamily::Nf, 3);
        config.set_anneal_lr(true);
        let lines = config.settings_lines();
        assert_eq!(lines[0], "image_width: 28");
        assert_eq!(lines[14], "kl_weighting: fixed(0)");
        assert_eq!(
            &lines[15..],
            &[
                "anneal_lr: true".to_owned(),
                "decoder structure: [300,300]".to_owned(),
                "encoder structure: [300,300]".to_owned(),
                "flow length: 3".to_owned(),
            ]
        );
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.json");
        let config = RunConfig::mnist(ModelFamily::Basic, 1);
        config.save_json(&path).expect("save");
        assert_eq!(RunConfig::load_json(&path).expect("load"), config);
    }
}
