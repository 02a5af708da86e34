use std::fs;
use std::path::Path;

use log::info;
use rand::Rng;

use crate::data::amat::parse_amat;
use crate::data::idx::parse_idx_images;
use crate::data::source::{DataSplits, Dataset};
use crate::error::{Error, Result};

pub const AMAT_TRAIN: &str = "binarized_mnist_train.amat";
pub const AMAT_VALID: &str = "binarized_mnist_valid.amat";
pub const IDX_TRAIN: &str = "train-images-idx3-ubyte";

/// Upper bound on training examples taken from an IDX file; the next
/// `MAX_VALID` examples form the validation set.
const MAX_TRAIN: usize = 50_000;
const MAX_VALID: usize = 10_000;

/// Loads binarized MNIST from `dir`.
///
/// Prefers the fixed binarization (`binarized_mnist_{train,valid}.amat`).
/// Otherwise reads the raw IDX training images and binarizes each pixel by
/// sampling a Bernoulli with the pixel intensity as its mean.
pub fn binarized_mnist<R: Rng + ?Sized>(dir: &Path, rng: &mut R) -> Result<DataSplits> {
    let train_amat = dir.join(AMAT_TRAIN);
    let valid_amat = dir.join(AMAT_VALID);
    if train_amat.is_file() && valid_amat.is_file() {
        let train = parse_amat(&read_text(&train_amat)?)?;
        let valid = parse_amat(&read_text(&valid_amat)?)?;
        info!("Loaded {} training and {} validation images from {}", train.len(), valid.len(), dir.display());
        return Ok(DataSplits { train: Dataset::new(train), valid: Dataset::new(valid) });
    }

    let idx = dir.join(IDX_TRAIN);
    if idx.is_file() {
        let bytes = fs::read(&idx)
            .map_err(|e| Error::dataset(format!("cannot read {}: {e}", idx.display())))?;
        let parsed = parse_idx_images(&bytes)?;
        let images: Vec<Vec<f64>> = parsed.images.into_iter()
            .map(|img| binarize(&img, rng))
            .collect();
        let (train, valid) = split(images);
        info!("Loaded {} training and {} validation images from {}", train.len(), valid.len(), idx.display());
        return Ok(DataSplits { train: Dataset::new(train), valid: Dataset::new(valid) });
    }

    Err(Error::dataset(format!(
        "no dataset in {}: expected {AMAT_TRAIN} and {AMAT_VALID}, or {IDX_TRAIN}",
        dir.display()
    )))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::dataset(format!("cannot read {}: {e}", path.display())))
}

/// Stochastic binarization: each pixel becomes 1 with probability equal to
/// its intensity.
pub fn binarize<R: Rng + ?Sized>(image: &[f64], rng: &mut R) -> Vec<f64> {
    image.iter()
        .map(|&p| if rng.gen::<f64>() < p { 1.0 } else { 0.0 })
        .collect()
}

/// First five sixths (at most `MAX_TRAIN`) for training, then up to
/// `MAX_VALID` for validation.
fn split(mut images: Vec<Vec<f64>>) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let n_train = (images.len() * 5 / 6).min(MAX_TRAIN);
    let mut valid = images.split_off(n_train);
    valid.truncate(MAX_VALID);
    (images, valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::idx::encode_idx_images;
    use crate::data::source::BatchSource;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn prefers_amat_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(AMAT_TRAIN), "0 1 0 1\n1 1 0 0\n1 0 0 0\n").expect("write");
        fs::write(dir.path().join(AMAT_VALID), "1 1 1 1\n").expect("write");
        let mut rng = StdRng::seed_from_u64(0);
        let splits = binarized_mnist(dir.path(), &mut rng).expect("load");
        assert_eq!(splits.train.num_examples(), 3);
        assert_eq!(splits.valid.head(1).data, vec![vec![1.0; 4]]);
    }

    #[test]
    fn falls_back_to_binarized_idx() {
        let dir = tempfile::tempdir().expect("tempdir");
        let images: Vec<Vec<u8>> = (0..12).map(|i| vec![0, 255, (i * 20) as u8, 0]).collect();
        fs::write(dir.path().join(IDX_TRAIN), encode_idx_images(2, 2, &images)).expect("write");
        let mut rng = StdRng::seed_from_u64(0);
        let splits = binarized_mnist(dir.path(), &mut rng).expect("load");
        assert_eq!(splits.train.num_examples(), 10);
        assert_eq!(splits.valid.num_examples(), 2);
        for img in splits.train.images() {
            assert_eq!(img[0], 0.0);
            assert_eq!(img[1], 1.0);
            assert!(img[2] == 0.0 || img[2] == 1.0);
        }
    }

    #[test]
    fn missing_files_are_a_dataset_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(binarized_mnist(dir.path(), &mut rng), Err(Error::Dataset { .. })));
    }
}
