pub mod epoch_stats;
pub mod samples;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod state;
pub mod trainer;

pub use epoch_stats::EpochResult;
pub use samples::{SampleHistory, SampleSnapshot};
pub use scheduler::{observe, Observation, PATIENCE};
pub use session::{run, run_at, run_in, RunDirectory, RunOutcome};
pub use sink::{FileSink, Sink};
pub use state::TrainingState;
pub use trainer::{train, TrainOutcome};
