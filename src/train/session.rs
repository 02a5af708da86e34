//! One training run from configuration to finished model.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;
use rand::Rng;

use crate::config::run_config::RunConfig;
use crate::data::source::{BatchSource, DataSplits};
use crate::error::{Error, Result};
use crate::loss::elbo::ElboLoss;
use crate::loss::loss_type::LossKind;
use crate::model::vae::VaeModel;
use crate::train::epoch_stats::EpochResult;
use crate::train::samples::SampleHistory;
use crate::train::sink::FileSink;
use crate::train::state::TrainingState;
use crate::train::trainer::{check_run, train};

pub const SETTINGS_FILE: &str = "settings.txt";

/// Directory name format for a run started at a given second.
pub const RUN_DIR_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// A results directory created fresh for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    path: PathBuf,
}

impl RunDirectory {
    /// Creates `path`, which must not exist yet. Missing parents are created.
    pub fn create(path: impl Into<PathBuf>) -> Result<RunDirectory> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::storage(parent, e))?;
        }
        match fs::create_dir(&path) {
            Ok(()) => Ok(RunDirectory { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::ResultsPathConflict { path }),
            Err(e) => Err(Error::storage(&path, e)),
        }
    }

    /// `<root>/<YYYY-MM-DD_HH-MM-SS>` for the given start time.
    pub fn timestamped(root: &Path, started: DateTime<Local>) -> Result<RunDirectory> {
        RunDirectory::create(root.join(started.format(RUN_DIR_FORMAT).to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the settings record and logs each line.
    pub fn write_settings(&self, config: &RunConfig) -> Result<PathBuf> {
        let path = self.path.join(SETTINGS_FILE);
        let mut file = fs::File::create(&path).map_err(|e| Error::storage(&path, e))?;
        for line in config.settings_lines() {
            writeln!(file, "{line}").map_err(|e| Error::storage(&path, e))?;
            info!("{line}");
        }
        Ok(path)
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub model: VaeModel,
    pub state: TrainingState,
    pub epochs: Vec<EpochResult>,
    pub samples: SampleHistory,
}

/// Runs training in a new timestamped directory under `config.results_dir`.
pub fn run<B, R>(config: &RunConfig, data: &mut DataSplits<B>, rng: &mut R) -> Result<(RunDirectory, RunOutcome)>
where
    B: BatchSource,
    R: Rng + ?Sized,
{
    run_at(config, data, rng, Local::now())
}

/// Like [`run`], with the directory named after `started`. Fails with
/// `ResultsPathConflict` before writing anything if that directory exists.
pub fn run_at<B, R>(
    config: &RunConfig,
    data: &mut DataSplits<B>,
    rng: &mut R,
    started: DateTime<Local>,
) -> Result<(RunDirectory, RunOutcome)>
where
    B: BatchSource,
    R: Rng + ?Sized,
{
    check_run(config, data)?;
    let dir = RunDirectory::timestamped(&config.results_dir, started)?;
    let outcome = run_in(&dir, config, data, rng)?;
    Ok((dir, outcome))
}

/// Runs training inside an already created directory: settings record,
/// model construction, then the training loop with a file sink.
pub fn run_in<B, R>(
    dir: &RunDirectory,
    config: &RunConfig,
    data: &mut DataSplits<B>,
    rng: &mut R,
) -> Result<RunOutcome>
where
    B: BatchSource,
    R: Rng + ?Sized,
{
    check_run(config, data)?;
    dir.write_settings(config)?;
    info!("Results in {}", dir.path().display());

    let mut model = VaeModel::from_config(config, rng);
    let mut sink = FileSink::new(dir.path());
    let outcome = match config.loss {
        LossKind::Elbo => train(&mut model, &ElboLoss, data, &mut sink, config, rng)?,
    };

    Ok(RunOutcome {
        model,
        state: outcome.state,
        epochs: outcome.epochs,
        samples: outcome.samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn directory_is_named_by_start_time() {
        let root = tempfile::tempdir().expect("tempdir");
        let started = Local.with_ymd_and_hms(2016, 11, 3, 9, 5, 7).single().expect("valid time");
        let dir = RunDirectory::timestamped(&root.path().join("results"), started).expect("create");
        assert_eq!(dir.path(), root.path().join("results").join("2016-11-03_09-05-07"));
        assert!(dir.path().is_dir());
    }

    #[test]
    fn existing_directory_conflicts() {
        let root = tempfile::tempdir().expect("tempdir");
        let path = root.path().join("run");
        RunDirectory::create(&path).expect("first");
        assert!(matches!(
            RunDirectory::create(&path),
            Err(Error::ResultsPathConflict { .. })
        ));
    }
}
