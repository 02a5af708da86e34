//! Plateau detection on the validation loss.

/// Consecutive non-improving epochs that trigger a halving.
pub const PATIENCE: u32 = 5;

/// Result of feeding one validation loss to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub best: f64,
    pub non_improvement: u32,
    pub learning_rate: f64,
    pub annealed: bool,
}

/// Pure plateau policy.
///
/// A loss strictly above `best` counts as a failure; anything else becomes
/// the new best and clears the count. When the count reaches exactly
/// `PATIENCE` and annealing is enabled the learning rate is halved and the
/// count cleared. With annealing disabled the count keeps growing and
/// never fires later.
pub fn observe(
    validation_loss: f64,
    best: f64,
    non_improvement: u32,
    anneal_enabled: bool,
    learning_rate: f64,
) -> Observation {
    let (best, mut non_improvement) = if validation_loss > best {
        (best, non_improvement + 1)
    } else {
        (validation_loss, 0)
    };

    let mut learning_rate = learning_rate;
    let annealed = non_improvement == PATIENCE && anneal_enabled;
    if annealed {
        learning_rate /= 2.0;
        non_improvement = 0;
    }

    Observation { best, non_improvement, learning_rate, annealed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn improvement_resets_the_count() {
        let obs = observe(0.9, 1.0, 3, true, 0.01);
        assert_eq!(obs, Observation { best: 0.9, non_improvement: 0, learning_rate: 0.01, annealed: false });
    }

    #[test]
    fn equal_loss_counts_as_improvement() {
        assert_eq!(observe(1.0, 1.0, 4, true, 0.01).non_improvement, 0);
    }

    #[test]
    fn fifth_failure_halves_when_enabled() {
        let obs = observe(2.0, 1.0, 4, true, 0.01);
        assert!(obs.annealed);
        assert_eq!(obs.learning_rate, 0.005);
        assert_eq!(obs.non_improvement, 0);
        assert_eq!(obs.best, 1.0);
    }

    #[test]
    fn disabled_annealing_never_fires() {
        let obs = observe(2.0, 1.0, 4, false, 0.01);
        assert!(!obs.annealed);
        assert_eq!(obs.non_improvement, 5);
        // Past the threshold the exact-match trigger cannot fire.
        let later = observe(2.0, 1.0, 5, true, 0.01);
        assert!(!later.annealed);
        assert_eq!(later.non_improvement, 6);
    }

    #[test]
    fn first_observation_beats_infinity() {
        let obs = observe(1e9, f64::INFINITY, 0, true, 0.01);
        assert_eq!(obs.best, 1e9);
    }
}
