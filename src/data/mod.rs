pub mod amat;
pub mod idx;
pub mod mnist;
pub mod source;

pub use mnist::binarized_mnist;
pub use source::{BatchSource, DataSplits, Dataset};
