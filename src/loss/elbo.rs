use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::loss::bce::BceLoss;
use crate::loss::strategy::{LossGradients, LossOutput, LossStrategy};
use crate::math::matrix::Matrix;
use crate::model::auxiliary::{self, AuxParams};

/// Negative evidence lower bound with a Bernoulli likelihood.
///
/// Per example: `-log p(x|z) + w · KL`, averaged over the batch, where `w`
/// is the KL weighting. Validation scores the same weighted objective, so
/// the plateau scheduler sees what the optimizer minimises. The unweighted
/// bound is reported as the `elbo` diagnostic.
///
/// The KL term depends on which auxiliary parameters the encoder published:
/// - `mu`, `log_var` only: closed-form KL(N(mu, σ²) || N(0, I)).
/// - with `z0`, `z`, `log_det`: single-sample estimate
///   `log q0(z0) - Σ log|det J| - log p(z)`, which accounts for flow steps.
/// - neither: the KL term is zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct ElboLoss;

struct KlTerms {
    per_row: Vec<f64>,
    log_det: Option<Vec<f64>>,
}

fn ln_2pi() -> f64 {
    (2.0 * PI).ln()
}

fn is_flow(aux: &AuxParams) -> bool {
    aux.contains_key(auxiliary::Z0)
        && aux.contains_key(auxiliary::Z)
        && aux.contains_key(auxiliary::LOG_DET)
}

impl ElboLoss {
    fn kl_terms(&self, aux: &AuxParams, batch: usize) -> KlTerms {
        let (mu, log_var) = match (aux.get(auxiliary::MU), aux.get(auxiliary::LOG_VAR)) {
            (Some(mu), Some(lv)) => (mu, lv),
            _ => return KlTerms { per_row: vec![0.0; batch], log_det: None },
        };

        if is_flow(aux) {
            let z0 = &aux[auxiliary::Z0];
            let z = &aux[auxiliary::Z];
            let log_det = aux[auxiliary::LOG_DET].row_sums();
            let per_row = (0..batch)
                .map(|r| {
                    let log_q0: f64 = (0..mu.cols)
                        .map(|j| {
                            let d = z0.data[r][j] - mu.data[r][j];
                            let lv = log_var.data[r][j];
                            -0.5 * (ln_2pi() + lv + d * d * (-lv).exp())
                        })
                        .sum();
                    let log_p: f64 = z.data[r].iter()
                        .map(|zj| -0.5 * (ln_2pi() + zj * zj))
                        .sum();
                    log_q0 - log_det[r] - log_p
                })
                .collect();
            KlTerms { per_row, log_det: Some(log_det) }
        } else {
            let per_row = (0..batch)
                .map(|r| {
                    mu.data[r].iter().zip(log_var.data[r].iter())
                        .map(|(m, lv)| -0.5 * (1.0 + lv - m * m - lv.exp()))
                        .sum()
                })
                .collect();
            KlTerms { per_row, log_det: None }
        }
    }

    /// ∂KL/∂aux for each example, unscaled.
    fn kl_gradients(&self, aux: &AuxParams) -> AuxParams {
        let mut grads = AuxParams::new();
        let (mu, log_var) = match (aux.get(auxiliary::MU), aux.get(auxiliary::LOG_VAR)) {
            (Some(mu), Some(lv)) => (mu, lv),
            _ => return grads,
        };

        if is_flow(aux) {
            let z0 = &aux[auxiliary::Z0];
            let z = &aux[auxiliary::Z];
            // d = (z0 - mu) / σ²
            let scaled = z0.zip_map(mu, |a, b| a - b)
                .zip_map(log_var, |d, lv| d * (-lv).exp());
            let grad_lv = z0.zip_map(mu, |a, b| a - b)
                .zip_map(log_var, |d, lv| -0.5 + 0.5 * d * d * (-lv).exp());
            grads.insert(auxiliary::MU.to_owned(), scaled.clone());
            grads.insert(auxiliary::LOG_VAR.to_owned(), grad_lv);
            grads.insert(auxiliary::Z0.to_owned(), scaled.scale(-1.0));
            grads.insert(auxiliary::Z.to_owned(), z.clone());
            grads.insert(auxiliary::LOG_DET.to_owned(), Matrix::filled(z.rows, 1, -1.0));
        } else {
            grads.insert(auxiliary::MU.to_owned(), mu.clone());
            grads.insert(auxiliary::LOG_VAR.to_owned(), log_var.map(|lv| 0.5 * (lv.exp() - 1.0)));
        }
        grads
    }
}

impl LossStrategy for ElboLoss {
    fn name(&self) -> &'static str {
        "elbo_loss"
    }

    fn evaluate(
        &self,
        reconstruction: &Matrix,
        input: &Matrix,
        kl_weighting: f64,
        aux: &AuxParams,
    ) -> LossOutput {
        let batch = input.rows.max(1) as f64;
        let rec: Vec<f64> = reconstruction.data.iter().zip(input.data.iter())
            .map(|(p, x)| BceLoss::loss(p, x))
            .collect();
        let kl = self.kl_terms(aux, input.rows);

        let rec_mean = rec.iter().sum::<f64>() / batch;
        let kl_mean = kl.per_row.iter().sum::<f64>() / batch;
        let training = rec_mean + kl_weighting * kl_mean;
        let validation = training;

        let mut diagnostics = BTreeMap::new();
        diagnostics.insert("reconstruction".to_owned(), rec_mean);
        diagnostics.insert("kl".to_owned(), kl_mean);
        diagnostics.insert("elbo".to_owned(), -(rec_mean + kl_mean));
        diagnostics.insert("kl_weighting".to_owned(), kl_weighting);
        if let Some(log_det) = kl.log_det {
            diagnostics.insert("log_det_jacobian".to_owned(), log_det.iter().sum::<f64>() / batch);
        }

        LossOutput { training, validation, diagnostics }
    }

    fn gradients(
        &self,
        reconstruction: &Matrix,
        input: &Matrix,
        kl_weighting: f64,
        aux: &AuxParams,
    ) -> LossGradients {
        let inv_batch = 1.0 / input.rows.max(1) as f64;
        let rec_grad = Matrix::from_data(
            reconstruction.data.iter().zip(input.data.iter())
                .map(|(p, x)| BceLoss::derivative(p, x).into_iter().map(|g| g * inv_batch).collect())
                .collect(),
        );
        let aux_grads = self.kl_gradients(aux)
            .into_iter()
            .map(|(k, g)| (k, g.scale(kl_weighting * inv_batch)))
            .collect();

        LossGradients { reconstruction: rec_grad, aux: aux_grads }
    }
}
