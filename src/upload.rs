use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::error::{PhotoError, Result};

pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Decode uploaded bytes, accepting only JPEG and PNG.
///
/// The format is sniffed from the content, not taken from a file name.
pub fn decode_upload(bytes: &[u8], max_bytes: u64) -> Result<DynamicImage> {
    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(PhotoError::UploadTooLarge {
            size,
            limit: max_bytes,
        });
    }

    let format = image::guess_format(bytes)
        .map_err(|_| PhotoError::InvalidImage("unrecognized image data".into()))?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
        return Err(PhotoError::InvalidImage(format!(
            "{:?} is not supported, use JPG or PNG",
            format
        )));
    }

    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| PhotoError::InvalidImage(e.to_string()))
}

pub fn load_upload(path: &Path, max_bytes: u64) -> Result<DynamicImage> {
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(PhotoError::UploadTooLarge {
            size,
            limit: max_bytes,
        });
    }
    let bytes = std::fs::read(path)?;
    let img = decode_upload(&bytes, max_bytes)?;
    log::info!(
        "loaded {} ({}x{}, {} bytes)",
        path.display(),
        img.width(),
        img.height(),
        size
    );
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_accepts_png_and_jpeg() {
        let png = decode_upload(&encoded(ImageFormat::Png), DEFAULT_MAX_BYTES).unwrap();
        assert_eq!(png.width(), 8);
        let jpeg = decode_upload(&encoded(ImageFormat::Jpeg), DEFAULT_MAX_BYTES).unwrap();
        assert_eq!(jpeg.height(), 8);
    }

    #[test]
    fn test_rejects_other_formats() {
        let err = decode_upload(&encoded(ImageFormat::Bmp), DEFAULT_MAX_BYTES).unwrap_err();
        assert!(matches!(err, PhotoError::InvalidImage(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = decode_upload(b"definitely not an image", DEFAULT_MAX_BYTES).unwrap_err();
        assert!(matches!(err, PhotoError::InvalidImage(_)));
    }

    #[test]
    fn test_rejects_truncated_png() {
        let mut bytes = encoded(ImageFormat::Png);
        bytes.truncate(40);
        let err = decode_upload(&bytes, DEFAULT_MAX_BYTES).unwrap_err();
        assert!(matches!(err, PhotoError::InvalidImage(_)));
    }

    #[test]
    fn test_size_cap() {
        let bytes = encoded(ImageFormat::Png);
        let limit = bytes.len() as u64 - 1;
        let err = decode_upload(&bytes, limit).unwrap_err();
        assert!(matches!(err, PhotoError::UploadTooLarge { .. }));
    }
}
