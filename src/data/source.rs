use rand::seq::SliceRandom;
use rand::Rng;

use crate::math::matrix::Matrix;

/// Something the orchestrator can draw mini-batches from.
pub trait BatchSource {
    fn num_examples(&self) -> usize;

    /// Values per example.
    fn dim(&self) -> usize;

    /// The next `batch_size` examples, one per row. Wraps around (and
    /// reshuffles) when the pass over the data is exhausted.
    fn next_batch<R: Rng + ?Sized>(&mut self, batch_size: usize, rng: &mut R) -> Matrix;

    /// The first `n` examples in storage order, unaffected by shuffling.
    fn head(&self, n: usize) -> Matrix;
}

/// In-memory examples with a shuffled cursor.
#[derive(Debug, Clone)]
pub struct Dataset {
    images: Vec<Vec<f64>>,
    dim: usize,
    order: Vec<usize>,
    cursor: usize,
}

impl Dataset {
    /// All rows must have the same length.
    pub fn new(images: Vec<Vec<f64>>) -> Dataset {
        let dim = images.first().map_or(0, Vec::len);
        let order = (0..images.len()).collect();
        // Start exhausted so the first draw shuffles.
        let cursor = images.len();
        Dataset { images, dim, order, cursor }
    }

    pub fn images(&self) -> &[Vec<f64>] {
        &self.images
    }
}

impl BatchSource for Dataset {
    fn num_examples(&self) -> usize {
        self.images.len()
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn next_batch<R: Rng + ?Sized>(&mut self, batch_size: usize, rng: &mut R) -> Matrix {
        if self.images.is_empty() {
            return Matrix::zeros(0, self.dim);
        }
        let mut rows = Vec::with_capacity(batch_size);
        while rows.len() < batch_size {
            if self.cursor == self.order.len() {
                self.order.shuffle(rng);
                self.cursor = 0;
            }
            rows.push(self.images[self.order[self.cursor]].clone());
            self.cursor += 1;
        }
        Matrix { rows: batch_size, cols: self.dim, data: rows }
    }

    fn head(&self, n: usize) -> Matrix {
        let rows: Vec<Vec<f64>> = self.images.iter().take(n).cloned().collect();
        Matrix { rows: rows.len(), cols: self.dim, data: rows }
    }
}

/// Training and validation sources for one run.
#[derive(Debug, Clone)]
pub struct DataSplits<B = Dataset> {
    pub train: B,
    pub valid: B,
}
