use crate::train::scheduler::Observation;

/// Counters and schedule owned by a running orchestrator.
///
/// The learning rate has exactly one writer, [`TrainingState::apply`], so
/// the value the optimizer reads is always the value the scheduler last
/// produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingState {
    step: u64,
    epoch: usize,
    learning_rate: f64,
    best_validation: f64,
    non_improvement: u32,
}

impl TrainingState {
    pub fn new(learning_rate: f64) -> TrainingState {
        TrainingState {
            step: 0,
            epoch: 0,
            learning_rate,
            best_validation: f64::INFINITY,
            non_improvement: 0,
        }
    }

    /// Number of optimizer steps taken so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn best_validation(&self) -> f64 {
        self.best_validation
    }

    pub fn non_improvement(&self) -> u32 {
        self.non_improvement
    }

    /// Counts one optimizer step and returns the new step number.
    pub fn advance_step(&mut self) -> u64 {
        self.step += 1;
        self.step
    }

    pub fn begin_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
    }

    /// Adopts the scheduler's verdict.
    pub fn apply(&mut self, observation: &Observation) {
        self.best_validation = observation.best;
        self.non_improvement = observation.non_improvement;
        self.learning_rate = observation.learning_rate;
    }
}
