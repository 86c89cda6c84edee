//! Soft checks on the calibrated photo. Warnings never block output.

use image::{imageops, GrayImage, Luma, RgbImage};
use serde::Serialize;

/// Rows at the bottom of the photo where clothing usually is.
const ATTIRE_ROWS: u32 = 80;
const ATTIRE_MAX_MEAN: f64 = 220.0;
const CONTRAST_MAX_STD: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    BrightAttire,
    HighContrast,
}

impl Warning {
    pub fn message(&self) -> &'static str {
        match self {
            Warning::BrightAttire => "Attire may be too white (bottom of image is very light).",
            Warning::HighContrast => {
                "High contrast: There may be distracting shadows or lighting."
            }
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Grayscale with the BT.601 weights (0.299, 0.587, 0.114).
pub fn luma_bt601(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
        Luma([luma.round().min(255.0) as u8])
    })
}

pub fn check(image: &RgbImage) -> Vec<Warning> {
    let gray = luma_bt601(image);
    let (width, height) = gray.dimensions();
    let mut warnings = Vec::new();
    if width == 0 || height == 0 {
        return warnings;
    }

    let rows = ATTIRE_ROWS.min(height);
    let bottom = imageops::crop_imm(&gray, 0, height - rows, width, rows).to_image();
    let (bottom_mean, _) = mean_std(bottom.as_raw());
    if bottom_mean > ATTIRE_MAX_MEAN {
        warnings.push(Warning::BrightAttire);
    }

    let (_, std) = mean_std(gray.as_raw());
    if std > CONTRAST_MAX_STD {
        warnings.push(Warning::HighContrast);
    }

    log::debug!(
        "quality: bottom mean {:.1}, std {:.1}, {} warning(s)",
        bottom_mean,
        std,
        warnings.len()
    );
    warnings
}

fn mean_std(values: &[u8]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}
