use std::path::{Path, PathBuf};

use image::GrayImage;

use crate::error::Result;
use crate::imaging::grid::{comparison, save_png};
use crate::math::matrix::Matrix;

/// Reconstructions of the fixed visualization inputs after one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSnapshot {
    pub epoch: usize,
    pub reconstructions: Matrix,
}

/// The visualization inputs, chosen once, and one snapshot per epoch.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    inputs: Matrix,
    image_width: usize,
    snapshots: Vec<SampleSnapshot>,
}

impl SampleHistory {
    pub fn new(inputs: Matrix, image_width: usize) -> SampleHistory {
        SampleHistory { inputs, image_width, snapshots: Vec::new() }
    }

    pub fn inputs(&self) -> &Matrix {
        &self.inputs
    }

    pub fn snapshots(&self) -> &[SampleSnapshot] {
        &self.snapshots
    }

    pub fn push(&mut self, epoch: usize, reconstructions: Matrix) {
        self.snapshots.push(SampleSnapshot { epoch, reconstructions });
    }

    /// One image per snapshot: inputs on top, thresholded reconstructions
    /// below.
    pub fn comparisons(&self) -> Vec<GrayImage> {
        self.snapshots.iter()
            .map(|s| comparison(&self.inputs, &s.reconstructions, self.image_width))
            .collect()
    }

    /// Writes `samples-epoch-<k>.png` per snapshot into `dir`.
    pub fn save_comparisons(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.snapshots.len());
        for (snapshot, image) in self.snapshots.iter().zip(self.comparisons()) {
            let path = dir.join(format!("samples-epoch-{}.png", snapshot.epoch));
            save_png(&image, &path)?;
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_comparison_per_epoch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut history = SampleHistory::new(Matrix::filled(3, 4, 1.0), 2);
        history.push(0, Matrix::filled(3, 4, 0.2));
        history.push(1, Matrix::filled(3, 4, 0.9));

        let images = history.comparisons();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].dimensions(), (6, 4));

        let paths = history.save_comparisons(dir.path()).expect("save");
        assert_eq!(paths[1], dir.path().join("samples-epoch-1.png"));
        assert!(paths.iter().all(|p| p.is_file()));
    }
}
