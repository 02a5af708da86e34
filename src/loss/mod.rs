pub mod bce;
pub mod elbo;
pub mod loss_type;
pub mod strategy;

pub use bce::BceLoss;
pub use elbo::ElboLoss;
pub use loss_type::LossKind;
pub use strategy::{LossGradients, LossOutput, LossStrategy};
