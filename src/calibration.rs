use serde::{Deserialize, Serialize};

use crate::error::{PhotoError, Result};

/// Regulatory target for the printed photo.
///
/// All pixel/millimeter conversions go through the calibration anchor:
/// `output_size_px` pixels span `physical_size_mm` millimeters. The defaults
/// describe a 2x2 inch photo at 300 dpi (Indian passport rules).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationTarget {
    pub output_size_px: u32,
    pub physical_size_mm: f64,
    pub target_head_mm: f64,
    pub head_min_mm: f64,
    pub head_max_mm: f64,
    pub eye_min_mm: f64,
    pub eye_max_mm: f64,
    pub dpi: u16,
}

impl Default for CalibrationTarget {
    fn default() -> Self {
        Self {
            output_size_px: 600,
            physical_size_mm: 51.0,
            // near the 25-35 mm midpoint, biased low
            target_head_mm: 26.0,
            head_min_mm: 25.0,
            head_max_mm: 35.0,
            eye_min_mm: 28.0,
            eye_max_mm: 34.0,
            dpi: 300,
        }
    }
}

impl CalibrationTarget {
    /// Reject targets that make the pixel/millimeter conversion meaningless.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(PhotoError::InvalidCalibration(format!(
                    "{} must be positive, got {}",
                    name, value
                )))
            }
        };

        if self.output_size_px == 0 {
            return Err(PhotoError::InvalidCalibration(
                "output_size_px must be positive".to_string(),
            ));
        }
        if self.dpi == 0 {
            return Err(PhotoError::InvalidCalibration("dpi must be positive".to_string()));
        }
        positive("physical_size_mm", self.physical_size_mm)?;
        positive("target_head_mm", self.target_head_mm)?;
        if self.target_head_px() <= 0 {
            return Err(PhotoError::InvalidCalibration(format!(
                "target head of {} mm is under one output pixel",
                self.target_head_mm
            )));
        }
        if self.head_min_mm > self.head_max_mm || self.eye_min_mm > self.eye_max_mm {
            return Err(PhotoError::InvalidCalibration(
                "range minimum above maximum".to_string(),
            ));
        }
        Ok(())
    }

    /// Only meaningful for pixels of the calibrated output space.
    pub fn px_to_mm(&self, px: f64) -> f64 {
        (px / self.output_size_px as f64) * self.physical_size_mm
    }

    /// Rounds half away from zero (`f64::round`), so 0.5 px goes up for
    /// every non-negative length.
    pub fn mm_to_px(&self, mm: f64) -> i64 {
        ((mm / self.physical_size_mm) * self.output_size_px as f64).round() as i64
    }

    pub fn target_head_px(&self) -> i64 {
        self.mm_to_px(self.target_head_mm)
    }

    /// Eye-to-bottom target: the eye range midpoint, truncated to whole mm.
    pub fn eye_target_mm(&self) -> f64 {
        ((self.eye_min_mm + self.eye_max_mm) / 2.0).trunc()
    }

    /// Row of the output where the eye line should land.
    pub fn desired_eye_y(&self) -> i64 {
        self.output_size_px as i64 - self.mm_to_px(self.eye_target_mm())
    }

    pub fn head_in_range(&self, mm: f64) -> bool {
        (self.head_min_mm..=self.head_max_mm).contains(&mm)
    }

    pub fn eye_in_range(&self, mm: f64) -> bool {
        (self.eye_min_mm..=self.eye_max_mm).contains(&mm)
    }
}
