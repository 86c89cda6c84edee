//! One request, end to end: calibrate, measure, check, preview.

use image::{DynamicImage, RgbImage};
use passrs_vision::LandmarkOracle;
use serde::Serialize;

use crate::{
    calibration::CalibrationTarget,
    config::LandmarkSource,
    error::{PhotoError, Result},
    geometry::{HeadGeometry, Measurements},
    normalize::{self, CropPlan, Normalized},
    overlay::OverlayRenderer,
    quality::{self, Warning},
};

pub struct ProcessedPhoto {
    pub normalized: Normalized,
    /// Measured on the output, from reprojected landmarks.
    pub measurements: Measurements,
    pub warnings: Vec<Warning>,
}

impl ProcessedPhoto {
    pub fn image(&self) -> &RgbImage {
        &self.normalized.image
    }

    pub fn report(&self) -> Report {
        Report {
            source_width: self.normalized.source_width,
            source_height: self.normalized.source_height,
            geometry: self.normalized.geometry,
            plan: self.normalized.plan,
            measurements: self.measurements,
            warnings: self.warnings.iter().map(|w| w.message().to_string()).collect(),
        }
    }
}

/// Serializable summary of a processed photo.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub source_width: u32,
    pub source_height: u32,
    pub geometry: HeadGeometry,
    pub plan: CropPlan,
    pub measurements: Measurements,
    pub warnings: Vec<String>,
}

pub fn process<O: LandmarkOracle + ?Sized>(
    img: &DynamicImage,
    oracle: &mut O,
    target: &CalibrationTarget,
) -> Result<ProcessedPhoto> {
    let normalized = normalize::normalize(img, oracle, target)?;

    let size = normalized.image.height();
    let output_geometry =
        HeadGeometry::from_landmarks(&normalized.output_landmarks(), normalized.image.width(), size);
    let measurements = Measurements::new(&output_geometry, size, target);
    log::info!(
        "output: head {:.1} mm{}, eyes {:.1} mm from bottom{}",
        measurements.head_height_mm,
        if measurements.head_in_range { "" } else { " (out of range)" },
        measurements.eye_to_bottom_mm,
        if measurements.eye_in_range { "" } else { " (out of range)" },
    );

    let warnings = quality::check(&normalized.image);
    for warning in &warnings {
        log::warn!("{}", warning);
    }

    Ok(ProcessedPhoto {
        normalized,
        measurements,
        warnings,
    })
}

/// Annotated preview of the calibrated photo.
///
/// With [`LandmarkSource::Redetect`] the oracle runs again on the output and
/// may find nothing; the caller then shows the plain image.
pub fn preview<O: LandmarkOracle + ?Sized>(
    photo: &ProcessedPhoto,
    oracle: &mut O,
    renderer: &OverlayRenderer,
    source: LandmarkSource,
    target: &CalibrationTarget,
) -> Result<Option<RgbImage>> {
    let landmarks = match source {
        LandmarkSource::Reproject => photo.normalized.output_landmarks(),
        LandmarkSource::Redetect => match oracle.detect(photo.image()).map_err(PhotoError::Oracle)? {
            Some(landmarks) => landmarks,
            None => {
                log::warn!("no face found on the calibrated photo, skipping overlay");
                return Ok(None);
            }
        },
    };
    Ok(Some(renderer.render(photo.image(), &landmarks, target)))
}
