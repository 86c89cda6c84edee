//! Measurement guides drawn on a preview copy of the calibrated photo.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use passrs_vision::LandmarkSet;

use crate::{
    calibration::CalibrationTarget,
    geometry::{HeadGeometry, Measurements},
};

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// DejaVu Sans, so labels render on hosts without system fonts.
pub static BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Half length of the head-top and chin markers.
const MARKER_HALF: i32 = 60;
const LINE_WIDTH: u32 = 2;

pub fn load_font(path: &Path) -> Result<FontArc> {
    let data = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    FontArc::try_from_vec(data).with_context(|| format!("parsing font {}", path.display()))
}

pub fn bundled_font() -> Result<FontArc> {
    FontArc::try_from_slice(BUNDLED_FONT).context("parsing bundled font")
}

pub struct OverlayRenderer {
    font: Option<FontArc>,
    scale: PxScale,
}

impl OverlayRenderer {
    /// Without a font only the guide lines are drawn.
    pub fn new(font: Option<FontArc>) -> Self {
        Self {
            font,
            scale: PxScale::from(16.0),
        }
    }

    /// Labels in the bundled font.
    pub fn bundled() -> Self {
        match bundled_font() {
            Ok(font) => Self::new(Some(font)),
            Err(e) => {
                log::warn!("{:#}, measurement labels will be omitted", e);
                Self::new(None)
            }
        }
    }

    /// Use the first font in `candidates` that loads, else the bundled one.
    pub fn with_font_candidates<P: AsRef<Path>>(candidates: &[P]) -> Self {
        for path in candidates {
            match load_font(path.as_ref()) {
                Ok(font) => {
                    log::debug!("overlay font: {}", path.as_ref().display());
                    return Self::new(Some(font));
                }
                Err(e) => log::warn!("{:#}, trying next font", e),
            }
        }
        Self::bundled()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw guides on a copy of `image`. `landmarks` must be normalized to `image`.
    pub fn render(
        &self,
        image: &RgbImage,
        landmarks: &LandmarkSet,
        target: &CalibrationTarget,
    ) -> RgbImage {
        let mut preview = image.clone();
        let (width, height) = image.dimensions();
        let geometry = HeadGeometry::from_landmarks(landmarks, width, height);
        let measurements = Measurements::new(&geometry, height, target);

        let mid = width as i32 / 2;
        hline(&mut preview, mid - MARKER_HALF, mid + MARKER_HALF, geometry.top, RED);
        hline(&mut preview, mid - MARKER_HALF, mid + MARKER_HALF, geometry.chin, RED);
        hline(&mut preview, 0, width as i32 - 1, geometry.eye_y, BLUE);

        if let Some(font) = &self.font {
            let head = format!("Head: {:.1}mm", measurements.head_height_mm);
            draw_text_mut(
                &mut preview,
                RED,
                mid + MARKER_HALF + 5,
                geometry.center_y as i32,
                self.scale,
                font,
                &head,
            );

            let eye = format!("Eye from bottom: {:.1}mm", measurements.eye_to_bottom_mm);
            let (text_width, _) = text_size(self.scale, font, &eye);
            draw_text_mut(
                &mut preview,
                BLUE,
                width as i32 - text_width as i32 - 5,
                geometry.eye_y as i32 + 5,
                self.scale,
                font,
                &eye,
            );
        }

        preview
    }
}

fn hline(img: &mut RgbImage, x0: i32, x1: i32, y: i64, color: Rgb<u8>) {
    if x1 < x0 {
        return;
    }
    let rect = Rect::at(x0, y as i32).of_size((x1 - x0 + 1) as u32, LINE_WIDTH);
    draw_filled_rect_mut(img, rect, color);
}
