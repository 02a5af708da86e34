use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// A trainable tensor together with its accumulated gradient.
///
/// Only the value is persisted; gradients are rebuilt on the next backward
/// pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub value: Matrix,
    #[serde(skip)]
    pub grad: Matrix,
}

impl Param {
    pub fn new(value: Matrix) -> Param {
        let grad = Matrix::zeros(value.rows, value.cols);
        Param { value, grad }
    }

    pub fn zero_grad(&mut self) {
        self.grad = Matrix::zeros(self.value.rows, self.value.cols);
    }

    /// Adds `g` into the gradient buffer.
    pub fn accumulate(&mut self, g: &Matrix) {
        if self.grad.shape() != self.value.shape() {
            self.zero_grad();
        }
        self.grad.add_assign(g);
    }
}
