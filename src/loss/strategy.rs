use std::collections::BTreeMap;

use crate::math::matrix::Matrix;
use crate::model::auxiliary::AuxParams;

/// Scalars produced by one loss evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct LossOutput {
    /// Objective minimised by the optimizer.
    pub training: f64,
    /// Objective scored on validation batches, with the same KL weighting as
    /// `training`.
    pub validation: f64,
    /// Named scalars surfaced through the diagnostics stream.
    pub diagnostics: BTreeMap<String, f64>,
}

/// Gradients of the training objective with respect to everything the model
/// handed to the loss. Missing auxiliary keys are treated as zero.
#[derive(Debug, Clone)]
pub struct LossGradients {
    pub reconstruction: Matrix,
    pub aux: AuxParams,
}

/// A training objective over a reconstruction, its input and the encoder's
/// auxiliary parameters.
///
/// Implementations must be differentiable in `reconstruction` and every
/// auxiliary parameter they read; `gradients` returns those derivatives of
/// `evaluate(..).training`.
pub trait LossStrategy {
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        reconstruction: &Matrix,
        input: &Matrix,
        kl_weighting: f64,
        aux: &AuxParams,
    ) -> LossOutput;

    fn gradients(
        &self,
        reconstruction: &Matrix,
        input: &Matrix,
        kl_weighting: f64,
        aux: &AuxParams,
    ) -> LossGradients;
}
