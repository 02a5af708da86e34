pub mod grid;

pub use grid::{comparison, save_png, tile_row, vec_to_image, MAX_GRID_IMAGES};
