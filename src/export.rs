use std::path::{Path, PathBuf};

use image::{
    codecs::jpeg::{JpegEncoder, PixelDensity},
    RgbImage,
};
use serde::{Deserialize, Serialize};

use crate::error::{PhotoError, Result};

pub const JPEG_QUALITY: u8 = 95;

const DEFAULT_STEM: &str = "passport_photo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    /// Guess from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

/// Encode with the print resolution recorded in the file metadata.
pub fn encode(image: &RgbImage, format: OutputFormat, dpi: u16) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(image, dpi),
        OutputFormat::Png => encode_png(image, dpi),
    }
}

fn encode_jpeg(image: &RgbImage, dpi: u16) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder.set_pixel_density(PixelDensity::dpi(dpi));
    encoder.encode_image(image).map_err(|e| PhotoError::Encode {
        format: "jpeg",
        source: Box::new(e),
    })?;
    Ok(buf)
}

/// PNG stores density in pixels per meter (`pHYs`).
pub fn dpi_to_ppm(dpi: u16) -> u32 {
    (dpi as f64 / 0.0254).round() as u32
}

fn encode_png(image: &RgbImage, dpi: u16) -> Result<Vec<u8>> {
    let err = |e: png::EncodingError| PhotoError::Encode {
        format: "png",
        source: Box::new(e),
    };

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let ppm = dpi_to_ppm(dpi);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header().map_err(err)?;
        writer.write_image_data(image.as_raw()).map_err(err)?;
        writer.finish().map_err(err)?;
    }
    Ok(buf)
}

pub fn save(image: &RgbImage, path: &Path, format: OutputFormat, dpi: u16) -> Result<()> {
    let bytes = encode(image, format, dpi)?;
    std::fs::write(path, bytes)?;
    log::info!("wrote {} ({})", path.display(), format.mime());
    Ok(())
}

/// Strip path traversal from a user-chosen file name.
pub fn sanitize_file_stem(name: &str) -> String {
    name.replace("..", "").replace(['/', '\\'], "")
}

/// Where to write `format` for a user-supplied `path`: the file stem is
/// sanitized and the extension is made to match the format.
pub fn output_path(path: &Path, format: OutputFormat) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_file_stem)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STEM.to_string());
    let extension = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if OutputFormat::from_path(path) == Some(format) => ext,
        _ => format.extension(),
    };
    path.with_file_name(format!("{}.{}", stem, extension))
}
