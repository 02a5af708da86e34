use serde::{Serialize, Deserialize};
use std::fmt;

/// Summary of one completed epoch, logged and returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochResult {
    /// 0-based epoch index.
    pub epoch: usize,
    /// Weighted training loss of the epoch's last training batch.
    pub train_loss: f64,
    /// Mean validation objective over the validation batches.
    pub valid_loss: f64,
    /// Training plus validation examples processed per second.
    pub examples_per_sec: f64,
    pub duration_secs: f64,
    pub train_batches: usize,
    pub valid_batches: usize,
    /// Learning rate after the scheduler has seen this epoch.
    pub learning_rate: f64,
    pub annealed: bool,
    pub kl_weighting: f64,
}

impl fmt::Display for EpochResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch: {}\t Weighted training loss: {:.2}, Validation loss {:.2} ({:.1} examples/sec, {:.1} sec/epoch)",
            self.epoch, self.train_loss, self.valid_loss, self.examples_per_sec, self.duration_secs
        )
    }
}
