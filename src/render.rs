//! PNG output for a finished grid.
//!
//! Each iteration count `v` is drawn with `palette[v % 256]`, where entry `i`
//! is the fully saturated, full-brightness hue `i / 255`.

use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use tracing::info;

use crate::job::Grid;

/// Number of palette entries.
pub const PALETTE_SIZE: usize = 256;

/// Error type for image output.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Refusing to overwrite existing file: {0}")]
    AlreadyExists(std::path::PathBuf),

    #[error("Grid is empty ({rows}x{columns})")]
    EmptyGrid { rows: usize, columns: usize },

    #[error("Grid of {rows}x{columns} does not fit in an image")]
    TooLarge { rows: usize, columns: usize },

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// The hue ramp used to colour iteration counts.
pub fn palette() -> [Rgb<u8>; PALETTE_SIZE] {
    let mut palette = [Rgb([0, 0, 0]); PALETTE_SIZE];
    for (i, entry) in palette.iter_mut().enumerate() {
        *entry = hue_to_rgb(i as f32 / 255.0);
    }
    palette
}

/// Saturation and brightness are both 1, so one of the channels is always
/// 255 and one is always 0.
fn hue_to_rgb(hue: f32) -> Rgb<u8> {
    let h = (hue - hue.floor()) * 6.0;
    let f = h - h.floor();
    let rising = channel(f);
    let falling = channel(1.0 - f);

    let [r, g, b] = match h as u32 {
        0 => [255, rising, 0],
        1 => [falling, 255, 0],
        2 => [0, 255, rising],
        3 => [0, falling, 255],
        4 => [rising, 0, 255],
        _ => [255, 0, falling],
    };
    Rgb([r, g, b])
}

fn channel(value: f32) -> u8 {
    (value * 255.0 + 0.5) as u8
}

/// Colour the grid into an RGB image, one pixel per cell.
pub fn to_image(grid: &Grid) -> Result<RgbImage, RenderError> {
    let (rows, columns) = (grid.rows(), grid.columns());
    if rows == 0 || columns == 0 {
        return Err(RenderError::EmptyGrid { rows, columns });
    }
    let (Ok(width), Ok(height)) = (u32::try_from(columns), u32::try_from(rows)) else {
        return Err(RenderError::TooLarge { rows, columns });
    };

    let palette = palette();
    let mut image = RgbImage::new(width, height);
    for (y, row) in grid.iter_rows().enumerate() {
        for (x, &value) in row.iter().enumerate() {
            image.put_pixel(x as u32, y as u32, palette[value as usize % PALETTE_SIZE]);
        }
    }
    Ok(image)
}

/// Write the grid as a PNG at `path`.
///
/// # Errors
///
/// Returns [`RenderError::AlreadyExists`] if `path` exists and `overwrite` is
/// false.
pub fn write_png(grid: &Grid, path: &Path, overwrite: bool) -> Result<(), RenderError> {
    if path.exists() && !overwrite {
        return Err(RenderError::AlreadyExists(path.to_path_buf()));
    }

    let image = to_image(grid)?;
    image.save_with_format(path, ImageFormat::Png)?;

    info!(path = %path.display(), width = image.width(), height = image.height(), "image saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_endpoints_are_red() {
        let palette = palette();
        assert_eq!(palette[0], Rgb([255, 0, 0]));
        assert_eq!(palette[255], Rgb([255, 0, 0]));
    }

    #[test]
    fn test_palette_primaries() {
        assert_eq!(hue_to_rgb(1.0 / 3.0), Rgb([0, 255, 0]));
        assert_eq!(hue_to_rgb(2.0 / 3.0), Rgb([0, 0, 255]));
        assert_eq!(hue_to_rgb(0.5), Rgb([0, 255, 255]));
    }

    #[test]
    fn test_palette_is_fully_saturated() {
        for colour in palette() {
            let Rgb(channels) = colour;
            assert_eq!(channels.iter().max(), Some(&255));
            assert_eq!(channels.iter().min(), Some(&0));
        }
    }

    #[test]
    fn test_values_wrap_modulo_palette() {
        let mut grid = Grid::new(1, 3);
        grid.row_mut(0).copy_from_slice(&[0, 256, 300]);

        let image = to_image(&grid).unwrap();
        let palette = palette();
        assert_eq!(image.dimensions(), (3, 1));
        assert_eq!(*image.get_pixel(0, 0), palette[0]);
        assert_eq!(*image.get_pixel(1, 0), palette[0]);
        assert_eq!(*image.get_pixel(2, 0), palette[44]);
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        let grid = Grid::new(0, 4);
        assert!(matches!(
            to_image(&grid),
            Err(RenderError::EmptyGrid { rows: 0, columns: 4 })
        ));
    }

    #[test]
    fn test_write_png_respects_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("JuliaSet.png");
        let grid = Grid::new(2, 4);

        write_png(&grid, &path, false).unwrap();
        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 2));

        assert!(matches!(
            write_png(&grid, &path, false),
            Err(RenderError::AlreadyExists(_))
        ));
        write_png(&grid, &path, true).unwrap();
    }
}
