use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::layers::param::Param;
use crate::math::matrix::Matrix;
use crate::model::flow::FlowStep;

/// Below this magnitude the Jacobian determinant is treated as singular.
const TINY: f64 = 1e-12;

/// Planar flow `f(z) = z + u · tanh(w·z + b)` with
/// `log|det J| = log|1 + (1 - tanh²(w·z + b)) · u·w|`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanarFlow {
    u: Param,
    w: Param,
    b: Param,
    #[serde(skip)]
    z: Matrix,
    #[serde(skip)]
    h: Vec<f64>,
    #[serde(skip)]
    det: Vec<f64>,
}

impl PlanarFlow {
    pub fn new<R: Rng + ?Sized>(dim_z: usize, rng: &mut R) -> Self {
        PlanarFlow {
            u: Param::new(Matrix::uniform(1, dim_z, rng).scale(0.1)),
            w: Param::new(Matrix::uniform(1, dim_z, rng).scale(0.1)),
            b: Param::new(Matrix::zeros(1, 1)),
            z: Matrix::default(),
            h: Vec::new(),
            det: Vec::new(),
        }
    }

    fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }
}

impl FlowStep for PlanarFlow {
    fn forward(&mut self, z: &Matrix) -> (Matrix, Vec<f64>) {
        let u = self.u.value.row(0);
        let w = self.w.value.row(0);
        let b = self.b.value.data[0][0];
        let uw = Self::dot(u, w);

        let mut out = z.clone();
        let mut h = Vec::with_capacity(z.rows);
        let mut det = Vec::with_capacity(z.rows);
        let mut log_det = Vec::with_capacity(z.rows);
        for (r, row) in out.data.iter_mut().enumerate() {
            let hr = (Self::dot(w, z.row(r)) + b).tanh();
            for (x, uj) in row.iter_mut().zip(u.iter()) {
                *x += uj * hr;
            }
            let d = 1.0 + (1.0 - hr * hr) * uw;
            log_det.push(d.abs().max(TINY).ln());
            h.push(hr);
            det.push(d);
        }

        self.z = z.clone();
        self.h = h;
        self.det = det;
        (out, log_det)
    }

    fn backward(&mut self, grad_out: &Matrix, grad_log_det: &[f64]) -> Matrix {
        let u = self.u.value.row(0).to_vec();
        let w = self.w.value.row(0).to_vec();
        let uw = Self::dot(&u, &w);
        let dim = u.len();

        let mut grad_u = vec![0.0; dim];
        let mut grad_w = vec![0.0; dim];
        let mut grad_b = 0.0;
        let mut grad_z = grad_out.clone();

        for r in 0..grad_out.rows {
            let g = grad_out.row(r);
            let hr = self.h[r];
            let slope = 1.0 - hr * hr;
            let inv_det = if self.det[r].abs() < TINY { 0.0 } else { 1.0 / self.det[r] };
            let gl = grad_log_det[r] * inv_det;

            // ∂L/∂a where a = w·z + b
            let grad_a = Self::dot(g, &u) * slope + gl * (-2.0 * hr * slope * uw);

            for j in 0..dim {
                grad_u[j] += g[j] * hr + gl * slope * w[j];
                grad_w[j] += gl * slope * u[j] + grad_a * self.z.data[r][j];
                grad_z.data[r][j] += grad_a * w[j];
            }
            grad_b += grad_a;
        }

        self.u.accumulate(&Matrix::from_data(vec![grad_u]));
        self.w.accumulate(&Matrix::from_data(vec![grad_w]));
        self.b.accumulate(&Matrix::from_data(vec![vec![grad_b]]));
        grad_z
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.u, &mut self.w, &mut self.b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::flow::testing::check_gradients;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut flow = PlanarFlow::new(3, &mut rng);
        // Push the parameters away from the near-identity init.
        flow.u.value = Matrix::from_data(vec![vec![0.8, -0.5, 0.3]]);
        flow.w.value = Matrix::from_data(vec![vec![0.4, 0.9, -0.7]]);
        flow.b.value = Matrix::from_data(vec![vec![0.2]]);
        let z = Matrix::standard_normal(2, 3, &mut rng);
        let c = Matrix::standard_normal(2, 3, &mut rng);
        check_gradients(&mut flow, &z, &c, &[0.7, -1.3]);
    }

    #[test]
    fn log_det_matches_closed_form() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut flow = PlanarFlow::new(2, &mut rng);
        flow.u.value = Matrix::from_data(vec![vec![1.0, 0.0]]);
        flow.w.value = Matrix::from_data(vec![vec![1.0, 0.0]]);
        let (out, ld) = flow.forward(&Matrix::zeros(1, 2));
        // a = 0 → h = 0, det = 1 + u·w = 2
        assert_eq!(out.data, vec![vec![0.0, 0.0]]);
        assert!((ld[0] - 2.0_f64.ln()).abs() < 1e-12);
    }
}
