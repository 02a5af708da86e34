//! Rendering flattened grayscale images to PNG.

use std::path::Path;

use image::{GrayImage, Luma};

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Most images placed side by side in one diagnostics grid.
pub const MAX_GRID_IMAGES: usize = 10;

fn to_pixel(value: f64) -> Luma<u8> {
    Luma([(value.clamp(0.0, 1.0) * 255.0).round() as u8])
}

/// One row-major `width × width` image from values in `[0, 1]`.
pub fn vec_to_image(values: &[f64], width: usize) -> GrayImage {
    GrayImage::from_fn(width as u32, width as u32, |x, y| {
        to_pixel(values.get(y as usize * width + x as usize).copied().unwrap_or(0.0))
    })
}

/// The first `max_images` rows of `batch` laid out left to right.
pub fn tile_row(batch: &Matrix, width: usize, max_images: usize) -> GrayImage {
    let n = batch.rows.min(max_images);
    GrayImage::from_fn((n * width) as u32, width as u32, |x, y| {
        let (img, col) = (x as usize / width, x as usize % width);
        to_pixel(batch.data[img].get(y as usize * width + col).copied().unwrap_or(0.0))
    })
}

/// Inputs along the top row and reconstructions thresholded at 0.5 along
/// the bottom row, one column per example.
pub fn comparison(inputs: &Matrix, reconstructions: &Matrix, width: usize) -> GrayImage {
    let n = inputs.rows.min(reconstructions.rows);
    let binary = reconstructions.map(|p| if p > 0.5 { 1.0 } else { 0.0 });
    GrayImage::from_fn((n * width) as u32, (2 * width) as u32, |x, y| {
        let (img, col) = (x as usize / width, x as usize % width);
        let (source, row) = if (y as usize) < width {
            (inputs, y as usize)
        } else {
            (&binary, y as usize - width)
        };
        to_pixel(source.data[img].get(row * width + col).copied().unwrap_or(0.0))
    })
}

pub fn save_png(image: &GrayImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|e| Error::storage(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_caps_the_image_count() {
        let batch = Matrix::filled(12, 4, 1.0);
        let grid = tile_row(&batch, 2, MAX_GRID_IMAGES);
        assert_eq!(grid.dimensions(), (20, 2));
        assert_eq!(grid.get_pixel(19, 1).0, [255]);
    }

    #[test]
    fn comparison_thresholds_reconstructions() {
        let inputs = Matrix::from_data(vec![vec![0.0, 1.0, 1.0, 0.0]]);
        let recon = Matrix::from_data(vec![vec![0.2, 0.7, 0.5, 0.51]]);
        let img = comparison(&inputs, &recon, 2);
        assert_eq!(img.dimensions(), (2, 4));
        assert_eq!(img.get_pixel(1, 0).0, [255]);
        // Bottom half: 0.2 → 0, 0.7 → 1, 0.5 → 0, 0.51 → 1.
        let bottom: Vec<u8> = [(0, 2), (1, 2), (0, 3), (1, 3)]
            .iter()
            .map(|&(x, y)| img.get_pixel(x, y).0[0])
            .collect();
        assert_eq!(bottom, vec![0, 255, 0, 255]);
    }

    #[test]
    fn saves_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("x.png");
        save_png(&vec_to_image(&[0.0, 0.5, 1.0, 0.25], 2), &path).expect("save");
        assert!(path.is_file());
    }
}
