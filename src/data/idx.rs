//! IDX3 image files as used by MNIST and its derivatives.
//!
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x03        (number of dimensions = 3)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```

use crate::error::{Error, Result};

/// Decoded images with pixel intensities scaled to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdxImages {
    pub rows: usize,
    pub cols: usize,
    pub images: Vec<Vec<f64>>,
}

fn be_u32(bytes: &[u8], at: usize) -> usize {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize
}

pub fn parse_idx_images(bytes: &[u8]) -> Result<IdxImages> {
    if bytes.len() < 16 {
        return Err(Error::dataset(format!(
            "IDX image file too short: expected at least 16 header bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(Error::dataset(format!(
            "IDX image file: bytes 0-1 must be 0x00 0x00, got 0x{:02X} 0x{:02X}",
            bytes[0], bytes[1]
        )));
    }
    if bytes[2] != 0x08 {
        return Err(Error::dataset(format!(
            "IDX image file: dtype must be 0x08 (uint8), got 0x{:02X}",
            bytes[2]
        )));
    }
    if bytes[3] != 0x03 {
        return Err(Error::dataset(format!(
            "IDX image file: expected 3 dimensions, got {}",
            bytes[3]
        )));
    }

    let n_items = be_u32(bytes, 4);
    let rows = be_u32(bytes, 8);
    let cols = be_u32(bytes, 12);

    let n_pixels = rows.checked_mul(cols)
        .ok_or_else(|| Error::dataset(format!("IDX image file: {rows}×{cols} overflows")))?;
    let required = n_items.checked_mul(n_pixels)
        .and_then(|n| n.checked_add(16))
        .ok_or_else(|| Error::dataset("IDX image file: data length overflows"))?;
    if bytes.len() < required {
        return Err(Error::dataset(format!(
            "IDX image file too short: header declares {n_items} images of {rows}×{cols} \
             pixels ({required} bytes), file is {} bytes",
            bytes.len()
        )));
    }
    if n_pixels == 0 {
        return Err(Error::dataset("IDX image file: images have no pixels"));
    }

    let images = bytes[16..required]
        .chunks_exact(n_pixels)
        .map(|chunk| chunk.iter().map(|&px| px as f64 / 255.0).collect())
        .collect();
    Ok(IdxImages { rows, cols, images })
}

#[cfg(test)]
pub(crate) fn encode_idx_images(rows: usize, cols: usize, images: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = vec![0x00, 0x00, 0x08, 0x03];
    for n in [images.len(), rows, cols] {
        bytes.extend_from_slice(&(n as u32).to_be_bytes());
    }
    for image in images {
        bytes.extend_from_slice(image);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_scales_pixels() {
        let bytes = encode_idx_images(2, 2, &[vec![0, 255, 51, 0], vec![255, 255, 0, 0]]);
        let parsed = parse_idx_images(&bytes).expect("valid file");
        assert_eq!((parsed.rows, parsed.cols), (2, 2));
        assert_eq!(parsed.images[0], vec![0.0, 1.0, 0.2, 0.0]);
        assert_eq!(parsed.images.len(), 2);
    }

    #[test]
    fn rejects_label_files() {
        let mut bytes = encode_idx_images(1, 1, &[vec![0]]);
        bytes[3] = 0x01;
        assert!(matches!(parse_idx_images(&bytes), Err(Error::Dataset { .. })));
    }

    #[test]
    fn rejects_truncated_data() {
        let mut bytes = encode_idx_images(2, 2, &[vec![0, 0, 0, 0]]);
        bytes.pop();
        assert!(parse_idx_images(&bytes).is_err());
        assert!(parse_idx_images(&bytes[..10]).is_err());
    }
}
