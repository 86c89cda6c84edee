//! MediaPipe Face Mesh landmark network.
//!
//! The network sees a square, upright crop around a detected face and
//! predicts 468 `(x, y, z)` points in crop pixels, plus a face-presence logit.
//! Input is NCHW RGB scaled to `[-1, 1]`.

use anyhow::Result;
use image::RgbImage;
use ndarray::Array4;
use ort::{session::Session, value::Value};

use crate::{
    face::{sample_bilinear, Detection},
    landmarks::{Landmark, LandmarkSet, NUM_LANDMARKS},
    yunet::sigmoid,
};

pub const MESH_INPUT: u32 = 192;

/// Face Mesh wants generous context around the detector's tight box.
pub const ROI_SCALE: f32 = 1.5;

/// Square crop window in source pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub x: f32,
    pub y: f32,
    pub side: f32,
}

impl Roi {
    pub fn around(detection: &Detection) -> Self {
        let (cx, cy) = detection.center();
        let side = detection.bbox[2].max(detection.bbox[3]) * ROI_SCALE;
        Self {
            x: cx - side / 2.0,
            y: cy - side / 2.0,
            side,
        }
    }

    /// Map a point in network-input pixels to normalized source coordinates.
    pub fn to_normalized(&self, x: f32, y: f32, width: u32, height: u32) -> Landmark {
        let px = self.x + x / MESH_INPUT as f32 * self.side;
        let py = self.y + y / MESH_INPUT as f32 * self.side;
        Landmark::new(px / width as f32, py / height as f32)
    }
}

/// Mesh prediction for one face.
#[derive(Debug, Clone)]
pub struct MeshResult {
    pub landmarks: LandmarkSet,
    pub face_confidence: f32,
}

/// Sample the ROI into a `[1, 3, 192, 192]` tensor. Pixels outside the source stay black.
pub fn roi_tensor(img: &RgbImage, roi: &Roi) -> Array4<f32> {
    let size = MESH_INPUT as usize;
    let step = roi.side / MESH_INPUT as f32;
    let mut input = Array4::<f32>::from_elem((1, 3, size, size), -1.0);

    for v in 0..size {
        for u in 0..size {
            let sx = roi.x + (u as f32 + 0.5) * step - 0.5;
            let sy = roi.y + (v as f32 + 0.5) * step - 0.5;
            if let Some(rgb) = sample_bilinear(img, sx, sy) {
                for c in 0..3 {
                    input[[0, c, v, u]] = rgb[c] / 127.5 - 1.0;
                }
            }
        }
    }
    input
}

/// Turn the flat `468 * 3` output into a [`LandmarkSet`] in source space.
pub fn decode(coords: &[f32], roi: &Roi, width: u32, height: u32) -> Result<LandmarkSet> {
    if coords.len() < NUM_LANDMARKS * 3 {
        anyhow::bail!(
            "landmark output has {} values, expected {}",
            coords.len(),
            NUM_LANDMARKS * 3
        );
    }
    let points = coords
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|xyz| roi.to_normalized(xyz[0], xyz[1], width, height))
        .collect();
    LandmarkSet::new(points)
}

/// Run Face Mesh on the region around `detection`.
pub fn estimate(session: &mut Session, img: &RgbImage, detection: &Detection) -> Result<MeshResult> {
    let roi = Roi::around(detection);
    let input = roi_tensor(img, &roi);

    let input_tensor = Value::from_array(input)?;
    let outputs = session.run(ort::inputs![input_tensor])?;
    if outputs.len() < 2 {
        anyhow::bail!("landmark model produced {} outputs, expected 2", outputs.len());
    }

    let (_shape, coords) = outputs[0].try_extract_tensor::<f32>()?;
    let (_shape, flag) = outputs[1].try_extract_tensor::<f32>()?;
    let face_confidence = flag.first().copied().map(sigmoid).unwrap_or(0.0);

    let (width, height) = img.dimensions();
    let landmarks = decode(coords, &roi, width, height)?;

    log::debug!(
        "face mesh: roi ({:.0}, {:.0}) side {:.0}, confidence {:.3}",
        roi.x,
        roi.y,
        roi.side,
        face_confidence
    );

    Ok(MeshResult {
        landmarks,
        face_confidence,
    })
}
