use serde::{Serialize, Deserialize};
use std::fmt;

use crate::layers::param::Param;
use crate::optim::adam::Adam;
use crate::optim::sgd::Sgd;

/// Which optimizer a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerKind::Adam => f.write_str("adam"),
            OptimizerKind::Sgd => f.write_str("sgd"),
        }
    }
}

#[derive(Debug)]
pub enum Optimizer {
    Adam(Adam),
    Sgd(Sgd),
}

impl Optimizer {
    pub fn new(kind: OptimizerKind) -> Optimizer {
        match kind {
            OptimizerKind::Adam => Optimizer::Adam(Adam::new()),
            OptimizerKind::Sgd => Optimizer::Sgd(Sgd::new()),
        }
    }

    /// One update of every parameter at the given learning rate.
    pub fn step(&mut self, params: Vec<&mut Param>, learning_rate: f64) {
        match self {
            Optimizer::Adam(adam) => adam.step(params, learning_rate),
            Optimizer::Sgd(sgd) => sgd.step(params, learning_rate),
        }
    }
}
