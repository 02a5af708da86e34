use serde::{Serialize, Deserialize};
use std::fmt;

use crate::error::{Error, Result};

/// Weight on the KL term of the training objective, as a function of the
/// epoch index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KlWeighting {
    /// The same weight every epoch.
    Fixed { weight: f64 },
    /// `1 - exp(-epoch / rate)`: zero on the first epoch, approaching one.
    Annealed { rate: f64 },
}

impl Default for KlWeighting {
    fn default() -> Self {
        KlWeighting::Fixed { weight: 0.0 }
    }
}

impl KlWeighting {
    pub fn weight(&self, epoch: usize) -> f64 {
        match *self {
            KlWeighting::Fixed { weight } => weight,
            KlWeighting::Annealed { rate } => 1.0 - (-(epoch as f64) / rate).exp(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            KlWeighting::Fixed { weight } if !weight.is_finite() || weight < 0.0 => {
                Err(Error::config(format!("KL weight must be finite and non-negative, got {weight}")))
            }
            KlWeighting::Annealed { rate } if !rate.is_finite() || rate <= 0.0 => {
                Err(Error::config(format!("KL annealing rate must be positive, got {rate}")))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for KlWeighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KlWeighting::Fixed { weight } => write!(f, "fixed({weight})"),
            KlWeighting::Annealed { rate } => write!(f, "annealed(rate={rate})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annealed_weight_starts_at_zero_and_rises() {
        let kl = KlWeighting::Annealed { rate: 10.0 };
        assert_eq!(kl.weight(0), 0.0);
        assert!((kl.weight(10) - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
        assert!(kl.weight(100) > kl.weight(10));
    }

    #[test]
    fn default_is_fixed_zero() {
        assert_eq!(KlWeighting::default().weight(42), 0.0);
        assert_eq!(KlWeighting::default().to_string(), "fixed(0)");
    }

    #[test]
    fn rejects_non_positive_rate() {
        assert!(KlWeighting::Annealed { rate: 0.0 }.validate().is_err());
        assert!(KlWeighting::Fixed { weight: -1.0 }.validate().is_err());
    }
}
