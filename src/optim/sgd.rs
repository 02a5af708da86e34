use crate::layers::param::Param;

/// Plain stochastic gradient descent. The learning rate is supplied per step
/// so the training state stays its only owner.
#[derive(Debug, Default)]
pub struct Sgd;

impl Sgd {
    pub fn new() -> Sgd {
        Sgd
    }

    /// Applies one SGD update to every parameter from its accumulated gradient.
    pub fn step(&self, params: Vec<&mut Param>, learning_rate: f64) {
        for param in params {
            let update = param.grad.scale(learning_rate);
            param.value = param.value.clone() - update;
        }
    }
}
