//! Auxiliary parameters an encoder hands to the loss alongside its sample.

use std::collections::BTreeMap;

use crate::math::matrix::Matrix;

/// Named encoder outputs the loss needs but the decoder does not.
pub type AuxParams = BTreeMap<String, Matrix>;

/// Posterior mean, batch × latent.
pub const MU: &str = "mu";
/// Posterior log-variance, batch × latent.
pub const LOG_VAR: &str = "log_var";
/// Base sample before any flow step, batch × latent.
pub const Z0: &str = "z0";
/// Final latent sample after all flow steps, batch × latent.
pub const Z: &str = "z";
/// Summed log|det J| of the flow steps, batch × 1.
pub const LOG_DET: &str = "log_det";

/// Looks up `key`, falling back to zeros of the given shape.
pub fn grad_or_zeros(grads: &AuxParams, key: &str, rows: usize, cols: usize) -> Matrix {
    match grads.get(key) {
        Some(g) if g.shape() == (rows, cols) => g.clone(),
        _ => Matrix::zeros(rows, cols),
    }
}
