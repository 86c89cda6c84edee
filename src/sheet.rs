use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::normalize::WHITE;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// A 4x6 inch print at 300 dpi holding six 2x2 inch tiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub width_px: u32,
    pub height_px: u32,
    pub tile_px: u32,
    pub columns: u32,
    pub rows: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            width_px: 1200,
            height_px: 1800,
            tile_px: 600,
            columns: 2,
            rows: 3,
        }
    }
}

impl SheetLayout {
    /// Paste offsets, row by row: `(0,0), (600,0), (0,600), ...` for the default.
    pub fn positions(&self) -> Vec<(u32, u32)> {
        (0..self.rows)
            .flat_map(|row| (0..self.columns).map(move |col| (col * self.tile_px, row * self.tile_px)))
            .collect()
    }
}

/// Frame `tile` in a black border `thickness` pixels wide on every side.
pub fn add_border(tile: &RgbImage, thickness: u32) -> RgbImage {
    let mut framed = RgbImage::from_pixel(
        tile.width() + 2 * thickness,
        tile.height() + 2 * thickness,
        BLACK,
    );
    imageops::replace(&mut framed, tile, thickness as i64, thickness as i64);
    framed
}

/// Tile a calibrated photo across a print sheet.
///
/// A border grows each tile by `2 * thickness` while the paste offsets stay on
/// the unbordered grid, so neighbouring tiles overlap by the border width and
/// later tiles cover the right/bottom frame of earlier ones.
pub fn compose(photo: &RgbImage, layout: &SheetLayout, border: Option<u32>) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(layout.width_px, layout.height_px, WHITE);

    let mut tile = if photo.dimensions() == (layout.tile_px, layout.tile_px) {
        photo.clone()
    } else {
        log::debug!(
            "resizing {}x{} photo to {} px tile",
            photo.width(),
            photo.height(),
            layout.tile_px
        );
        imageops::resize(photo, layout.tile_px, layout.tile_px, FilterType::Triangle)
    };

    if let Some(thickness) = border.filter(|t| *t > 0) {
        tile = add_border(&tile, thickness);
    }

    for (x, y) in layout.positions() {
        imageops::replace(&mut canvas, &tile, x as i64, y as i64);
    }
    canvas
}
