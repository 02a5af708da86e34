use crate::layers::param::Param;
use crate::math::matrix::Matrix;

pub const BETA1: f64 = 0.9;
pub const BETA2: f64 = 0.999;
pub const EPSILON: f64 = 1e-8;

/// Adam with bias-corrected first and second moments.
///
/// Moment buffers are matched to parameters by position, so the caller must
/// pass parameters in the same order on every step.
#[derive(Debug, Default)]
pub struct Adam {
    t: u64,
    moments: Vec<(Matrix, Matrix)>,
}

impl Adam {
    pub fn new() -> Adam {
        Adam::default()
    }

    pub fn step(&mut self, params: Vec<&mut Param>, learning_rate: f64) {
        self.t += 1;
        let t = self.t as f64;
        // Bias corrections are shared by every parameter in this step.
        let bc1 = 1.0 - BETA1.powf(t);
        let bc2 = 1.0 - BETA2.powf(t);

        if self.moments.len() != params.len() {
            self.moments = params.iter()
                .map(|p| (
                    Matrix::zeros(p.value.rows, p.value.cols),
                    Matrix::zeros(p.value.rows, p.value.cols),
                ))
                .collect();
        }

        for (param, (m, v)) in params.into_iter().zip(self.moments.iter_mut()) {
            debug_assert_eq!(param.grad.shape(), param.value.shape(), "gradient buffer out of shape");
            for i in 0..param.value.rows {
                for j in 0..param.value.cols {
                    let g = param.grad.data[i][j];
                    let m_ij = BETA1 * m.data[i][j] + (1.0 - BETA1) * g;
                    let v_ij = BETA2 * v.data[i][j] + (1.0 - BETA2) * g * g;
                    m.data[i][j] = m_ij;
                    v.data[i][j] = v_ij;
                    let m_hat = m_ij / bc1;
                    let v_hat = v_ij / bc2;
                    param.value.data[i][j] -= learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
                }
            }
        }
    }
}
