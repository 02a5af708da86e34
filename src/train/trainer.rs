use std::time::Instant;

use log::{debug, info};
use rand::Rng;
use serde::Serialize;

use crate::config::run_config::RunConfig;
use crate::data::source::{BatchSource, DataSplits};
use crate::error::{Error, Result};
use crate::imaging::grid::{tile_row, MAX_GRID_IMAGES};
use crate::loss::strategy::LossStrategy;
use crate::math::matrix::Matrix;
use crate::model::decoder::Decoder;
use crate::model::encoder::Encoder;
use crate::model::vae::Vae;
use crate::optim::optimizer::Optimizer;
use crate::train::epoch_stats::EpochResult;
use crate::train::samples::SampleHistory;
use crate::train::scheduler::observe;
use crate::train::sink::Sink;
use crate::train::state::TrainingState;

/// Steps between diagnostics emissions.
pub const DIAGNOSTICS_EVERY: u64 = 100;
/// Steps between checkpoints.
pub const CHECKPOINT_EVERY: u64 = 1000;

/// What a completed training loop hands back besides the model itself.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub state: TrainingState,
    pub epochs: Vec<EpochResult>,
    pub samples: SampleHistory,
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Rejects a configuration/data pairing that cannot run a single epoch.
pub fn check_run<B: BatchSource>(config: &RunConfig, data: &DataSplits<B>) -> Result<()> {
    config.validate()?;
    config.validate_data(data.train.num_examples(), data.valid.num_examples(), data.train.dim())?;
    if data.valid.dim() != data.train.dim() {
        return Err(Error::config(format!(
            "training examples have {} values but validation examples have {}",
            data.train.dim(),
            data.valid.dim()
        )));
    }
    Ok(())
}

/// Trains `model` for `config.max_epochs` epochs.
///
/// Each epoch runs `floor(train / batch_size)` optimizer steps, then
/// `floor(valid / batch_size)` validation batches, then lets the plateau
/// scheduler adjust the learning rate, then reconstructs the fixed
/// visualization subset with fresh noise.
///
/// Diagnostics go to `sink` every `DIAGNOSTICS_EVERY` steps; checkpoints
/// every `CHECKPOINT_EVERY` steps and once more after the last training
/// batch of the final epoch. A non-finite loss or a shape mismatch aborts
/// with `NumericalDivergence`; whatever the sink already holds stays there.
pub fn train<E, D, L, B, S, R>(
    model: &mut Vae<E, D>,
    loss: &L,
    data: &mut DataSplits<B>,
    sink: &mut S,
    config: &RunConfig,
    rng: &mut R,
) -> Result<TrainOutcome>
where
    E: Encoder + Serialize,
    D: Decoder + Serialize,
    L: LossStrategy,
    B: BatchSource,
    S: Sink,
    R: Rng + ?Sized,
{
    check_run(config, data)?;

    let batch_size = config.batch_size;
    let n_train_batches = data.train.num_examples() / batch_size;
    let n_valid_batches = data.valid.num_examples() / batch_size;
    let anneal_lr = config.anneal_lr();

    let mut optimizer = Optimizer::new(config.optimizer);
    let mut state = TrainingState::new(config.learning_rate);
    let mut epochs = Vec::with_capacity(config.max_epochs);
    let mut samples = SampleHistory::new(data.valid.head(config.n_view), config.image_width);

    info!(
        "Training {} epochs of {} batches ({} validation batches) with {}",
        config.max_epochs, n_train_batches, n_valid_batches, loss.name()
    );

    for epoch in 0..config.max_epochs {
        state.begin_epoch(epoch);
        let kl_weighting = config.kl_weighting.weight(epoch);
        let final_epoch = epoch + 1 == config.max_epochs;
        let start = Instant::now();

        // ── Training ────────────────────────────────────────────────────────
        let mut train_loss = f64::NAN;
        for batch in 0..n_train_batches {
            let step = state.step() + 1;
            let x = data.train.next_batch(batch_size, rng);
            let noise = Matrix::standard_normal(batch_size, config.dim_z, rng);
            check_shape(step, "training batch", &x, (batch_size, config.dim_x))?;

            model.zero_grad();
            let forward = model.forward(&x, &noise);
            check_shape(step, "reconstruction", &forward.reconstruction, x.shape())?;

            let out = loss.evaluate(&forward.reconstruction, &x, kl_weighting, &forward.aux);
            if !out.training.is_finite() {
                return Err(Error::divergence(step, format!("training loss is {}", out.training)));
            }
            let grads = loss.gradients(&forward.reconstruction, &x, kl_weighting, &forward.aux);
            check_shape(step, "reconstruction gradient", &grads.reconstruction, x.shape())?;
            if !grads.reconstruction.all_finite() {
                return Err(Error::divergence(step, "reconstruction gradient is not finite"));
            }
            model.backward(&grads.reconstruction, &grads.aux);
            optimizer.step(model.params_mut(), state.learning_rate());

            let step = state.advance_step();
            train_loss = out.training;

            if step % DIAGNOSTICS_EVERY == 0 {
                let mut scalars = out.diagnostics;
                scalars.insert("learning_rate".to_owned(), state.learning_rate());
                let grid = tile_row(&forward.reconstruction, config.image_width, MAX_GRID_IMAGES);
                sink.emit_diagnostics(step, &scalars, &grid)?;
            }

            let last_batch = final_epoch && batch + 1 == n_train_batches;
            if step % CHECKPOINT_EVERY == 0 || last_batch {
                sink.emit_checkpoint(step, &*model)?;
            }
        }

        // ── Validation ──────────────────────────────────────────────────────
        let mut valid_total = 0.0;
        for _ in 0..n_valid_batches {
            let x = data.valid.next_batch(batch_size, rng);
            let noise = Matrix::standard_normal(batch_size, config.dim_z, rng);
            check_shape(state.step(), "validation batch", &x, (batch_size, config.dim_x))?;
            let forward = model.forward(&x, &noise);
            check_shape(state.step(), "reconstruction", &forward.reconstruction, x.shape())?;
            valid_total += loss.evaluate(&forward.reconstruction, &x, kl_weighting, &forward.aux).validation;
        }
        let valid_loss = valid_total / n_valid_batches as f64;
        if !valid_loss.is_finite() {
            return Err(Error::divergence(state.step(), format!("validation loss is {valid_loss}")));
        }

        let duration = start.elapsed().as_secs_f64();
        let examples = ((n_train_batches + n_valid_batches) * batch_size) as f64;
        let examples_per_sec = if duration > 0.0 { examples / duration } else { f64::INFINITY };

        // ── Schedule ────────────────────────────────────────────────────────
        let observation = observe(
            valid_loss,
            state.best_validation(),
            state.non_improvement(),
            anneal_lr,
            state.learning_rate(),
        );
        state.apply(&observation);

        let result = EpochResult {
            epoch,
            train_loss,
            valid_loss,
            examples_per_sec,
            duration_secs: duration,
            train_batches: n_train_batches,
            valid_batches: n_valid_batches,
            learning_rate: state.learning_rate(),
            annealed: observation.annealed,
            kl_weighting,
        };
        info!("{result}");
        if observation.annealed {
            info!("Annealing learning rate to {}", state.learning_rate());
        }
        epochs.push(result);

        // ── Samples ─────────────────────────────────────────────────────────
        let noise = Matrix::standard_normal(samples.inputs().rows, config.dim_z, rng);
        let reconstructions = model.forward(samples.inputs(), &noise).reconstruction;
        samples.push(epoch, reconstructions);
        debug!("Recorded visualization sample for epoch {epoch}");
    }

    Ok(TrainOutcome { state, epochs, samples })
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn check_shape(step: u64, what: &str, m: &Matrix, expected: (usize, usize)) -> Result<()> {
    if m.shape() == expected {
        Ok(())
    } else {
        Err(Error::divergence(
            step,
            format!("{what} has shape {:?}, expected {:?}", m.shape(), expected),
        ))
    }
}
