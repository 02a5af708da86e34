use serde::{Serialize, Deserialize};
use std::fmt;

/// Selects which loss strategy a run trains against.
///
/// - `Elbo`: negative evidence lower bound with a Bernoulli likelihood and a
///   weighted KL term; see `ElboLoss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    Elbo,
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossKind::Elbo => f.write_str("elbo_loss"),
        }
    }
}
