//! Failure taxonomy for training runs.

use std::path::{Path, PathBuf};

/// Everything a run can fail with. None of these are recovered locally; the
/// results directory is left as it was when the error surfaced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("results directory already exists: {}", path.display())]
    ResultsPathConflict { path: PathBuf },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("numerical divergence at step {step}: {reason}")]
    NumericalDivergence { step: u64, reason: String },

    #[error("failed to write {}: {reason}", path.display())]
    StorageWrite { path: PathBuf, reason: String },

    #[error("dataset error: {message}")]
    Dataset { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Error {
        Error::Configuration { message: message.into() }
    }

    pub fn dataset(message: impl Into<String>) -> Error {
        Error::Dataset { message: message.into() }
    }

    pub fn divergence(step: u64, reason: impl Into<String>) -> Error {
        Error::NumericalDivergence { step, reason: reason.into() }
    }

    pub fn storage(path: &Path, reason: impl ToString) -> Error {
        Error::StorageWrite { path: path.to_path_buf(), reason: reason.to_string() }
    }
}
