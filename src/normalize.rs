//! Scale and crop a portrait so the head height and eye line land on the
//! calibrated targets.

use image::{imageops, imageops::FilterType, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use passrs_vision::{Landmark, LandmarkOracle, LandmarkSet};
use serde::Serialize;

use crate::{
    calibration::CalibrationTarget,
    error::{PhotoError, Result},
    geometry::HeadGeometry,
};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Largest intermediate image a plan may ask for (about 192 MB of RGB).
pub const MAX_RESIZED_PIXELS: u64 = 64_000_000;

/// Crop window in the resized image. `left`/`top` are already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub size: u32,
}

impl CropRect {
    /// Width and height of the window intersected with a `width x height` image.
    pub fn extent(&self, width: u32, height: u32) -> (u32, u32) {
        (
            self.size.min(width.saturating_sub(self.left)),
            self.size.min(height.saturating_sub(self.top)),
        )
    }
}

/// Everything needed to turn a source image into the calibrated output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropPlan {
    pub head_px: i64,
    /// Source head height read as if it were output pixels. Informational.
    pub head_mm: f64,
    pub scale: f64,
    pub resized_width: u32,
    pub resized_height: u32,
    pub crop: CropRect,
}

impl CropPlan {
    pub fn compute(
        geometry: &HeadGeometry,
        width: u32,
        height: u32,
        target: &CalibrationTarget,
    ) -> Result<Self> {
        let head_px = geometry.head_px();
        if head_px <= 0 {
            return Err(PhotoError::DegenerateGeometry { head_px });
        }
        let head_mm = target.px_to_mm(head_px as f64);
        let scale = target.target_head_px() as f64 / head_px as f64;

        let resized_width = (width as f64 * scale).round().max(1.0);
        let resized_height = (height as f64 * scale).round().max(1.0);
        if resized_width * resized_height > MAX_RESIZED_PIXELS as f64 {
            return Err(PhotoError::OversizedPlan {
                width: resized_width as u64,
                height: resized_height as u64,
            });
        }
        let resized_width = resized_width as u32;
        let resized_height = resized_height as u32;

        let eye_y = geometry.eye_y as f64 * scale;
        let center_x = geometry.center_x as f64 * scale;
        let out = target.output_size_px as i64;

        let top = (eye_y - target.desired_eye_y() as f64).round() as i64;
        let left = (center_x - out as f64 / 2.0).round() as i64;

        // upper bound first: a resized image smaller than the output clamps to 0
        let top = top.min(resized_height as i64 - out).max(0);
        let left = left.min(resized_width as i64 - out).max(0);

        Ok(Self {
            head_px,
            head_mm,
            scale,
            resized_width,
            resized_height,
            crop: CropRect {
                left: left as u32,
                top: top as u32,
                size: target.output_size_px,
            },
        })
    }

    /// Source pixel -> output pixel.
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.scale - self.crop.left as f64,
            y * self.scale - self.crop.top as f64,
        )
    }

    /// Carry landmarks detected on the source through the scale and crop,
    /// normalized to the output image.
    pub fn reproject(&self, landmarks: &LandmarkSet, width: u32, height: u32) -> LandmarkSet {
        let size = self.crop.size as f64;
        landmarks.map(|p| {
            let (x, y) = self.project(p.x as f64 * width as f64, p.y as f64 * height as f64);
            Landmark::new((x / size) as f32, (y / size) as f32)
        })
    }
}

/// Calibrated output plus how it was derived.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub image: RgbImage,
    pub source_width: u32,
    pub source_height: u32,
    /// Geometry of the source image.
    pub geometry: HeadGeometry,
    pub plan: CropPlan,
    /// Landmarks of the source image, as the oracle returned them.
    pub landmarks: LandmarkSet,
}

impl Normalized {
    /// Source landmarks carried into output coordinates.
    pub fn output_landmarks(&self) -> LandmarkSet {
        self.plan
            .reproject(&self.landmarks, self.source_width, self.source_height)
    }
}

/// Composite any transparency onto opaque white and drop the alpha channel.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let (width, height) = (img.width(), img.height());
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Resize, crop and white-pad `img` according to `plan`.
pub fn apply_plan(img: &RgbImage, plan: &CropPlan) -> RgbImage {
    let resized = imageops::resize(
        img,
        plan.resized_width,
        plan.resized_height,
        FilterType::CatmullRom,
    );

    let crop = plan.crop;
    let (width, height) = crop.extent(resized.width(), resized.height());
    let window = imageops::crop_imm(&resized, crop.left, crop.top, width, height).to_image();

    if width == crop.size && height == crop.size {
        return window;
    }

    log::debug!(
        "crop {}x{} short of {}, padding with white",
        width,
        height,
        crop.size
    );
    let mut canvas = RgbImage::from_pixel(crop.size, crop.size, WHITE);
    imageops::replace(&mut canvas, &window, 0, 0);
    canvas
}

/// Produce the calibrated passport photo for `img`.
pub fn normalize<O: LandmarkOracle + ?Sized>(
    img: &DynamicImage,
    oracle: &mut O,
    target: &CalibrationTarget,
) -> Result<Normalized> {
    target.validate()?;
    let rgb = flatten_onto_white(img);
    let (width, height) = rgb.dimensions();

    let landmarks = oracle
        .detect(&rgb)
        .map_err(PhotoError::Oracle)?
        .ok_or(PhotoError::NoFaceDetected)?;

    let geometry = HeadGeometry::from_landmarks(&landmarks, width, height);
    log::debug!("source {}x{}: {:?}", width, height, geometry);

    let plan = CropPlan::compute(&geometry, width, height, target)?;
    log::info!(
        "head {} px ({:.1} mm at output scale), scaling by {:.4} to {}x{}",
        plan.head_px,
        plan.head_mm,
        plan.scale,
        plan.resized_width,
        plan.resized_height
    );
    log::debug!("crop at ({}, {})", plan.crop.left, plan.crop.top);

    let image = apply_plan(&rgb, &plan);
    Ok(Normalized {
        image,
        source_width: width,
        source_height: height,
        geometry,
        plan,
        landmarks,
    })
}
