use passrs_vision::LandmarkSet;
use serde::Serialize;

use crate::calibration::CalibrationTarget;

/// Head measurements in pixels of the image the landmarks came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeadGeometry {
    pub top: i64,
    pub chin: i64,
    pub eye_y: i64,
    pub center_x: i64,
    pub center_y: i64,
}

impl HeadGeometry {
    pub fn from_landmarks(landmarks: &LandmarkSet, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        let left = landmarks.left_eye();
        let right = landmarks.right_eye();

        let top = (landmarks.forehead().y as f64 * h).round() as i64;
        let chin = (landmarks.chin().y as f64 * h).round() as i64;
        let eye_y = (((left.y as f64 + right.y as f64) / 2.0) * h).round() as i64;
        let center_x = (((left.x as f64 + right.x as f64) / 2.0) * w).round() as i64;
        let center_y = ((top + chin) as f64 / 2.0).round() as i64;

        Self {
            top,
            chin,
            eye_y,
            center_x,
            center_y,
        }
    }

    /// Hairline to chin. Not positive for implausible detections.
    pub fn head_px(&self) -> i64 {
        self.chin - self.top
    }
}

/// Head height and eye position of a calibrated image, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurements {
    pub head_height_mm: f64,
    pub eye_to_bottom_mm: f64,
    pub head_in_range: bool,
    pub eye_in_range: bool,
}

impl Measurements {
    /// `height` is the height of the calibrated image `geometry` was taken from.
    pub fn new(geometry: &HeadGeometry, height: u32, target: &CalibrationTarget) -> Self {
        let head_height_mm = target.px_to_mm(geometry.head_px() as f64);
        let eye_to_bottom_mm = target.px_to_mm((height as i64 - geometry.eye_y) as f64);
        Self {
            head_height_mm,
            eye_to_bottom_mm,
            head_in_range: target.head_in_range(head_height_mm),
            eye_in_range: target.eye_in_range(eye_to_bottom_mm),
        }
    }
}
