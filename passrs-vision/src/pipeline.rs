use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use ort::session::Session;

use crate::{
    face,
    landmarks::{LandmarkOracle, LandmarkSet},
    mesh,
};

/// Thresholds for the two-stage oracle.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub score: f32,
    pub nms: f32,
    /// Minimum Face Mesh presence confidence.
    pub face: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            score: 0.6,
            nms: 0.3,
            face: 0.5,
        }
    }
}

/// Full pipeline: detect faces → crop best face → Face Mesh
pub struct FaceMeshPipeline {
    pub detector: Session,
    pub mesh: Session,
    pub thresholds: Thresholds,
}

impl FaceMeshPipeline {
    pub fn new(detector: &Path, landmarks: &Path, thresholds: Thresholds) -> Result<Self> {
        Ok(Self {
            detector: crate::model::detector_session(detector)?,
            mesh: crate::model::landmark_session(landmarks)?,
            thresholds,
        })
    }

    /// Detect the best face and return its mesh together with the detector score.
    pub fn process_image(&mut self, img: &RgbImage) -> Result<Option<(face::Detection, mesh::MeshResult)>> {
        let detections = face::detect_faces(
            &mut self.detector,
            img,
            self.thresholds.score,
            self.thresholds.nms,
        )
        .context("detecting faces")?;

        // sorted by score
        let Some(best) = detections.into_iter().next() else {
            log::debug!("no face above score threshold {:.2}", self.thresholds.score);
            return Ok(None);
        };

        let result = mesh::estimate(&mut self.mesh, img, &best).context("estimating landmarks")?;
        if result.face_confidence < self.thresholds.face {
            log::debug!(
                "face mesh confidence {:.3} below {:.2}",
                result.face_confidence,
                self.thresholds.face
            );
            return Ok(None);
        }

        Ok(Some((best, result)))
    }
}

impl LandmarkOracle for FaceMeshPipeline {
    fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>> {
        Ok(self.process_image(image)?.map(|(_, mesh)| mesh.landmarks))
    }
}
