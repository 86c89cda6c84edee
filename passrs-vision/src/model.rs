use std::path::Path;

use anyhow::{Context, Result};
use ort::{
    ep::{self, ExecutionProvider},
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
};

pub fn session_builder() -> Result<SessionBuilder> {
    let mut builder =
        Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "openvino")]
    {
        let ep = ep::OpenVINO::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino")
        }
    }

    #[cfg(feature = "cuda")]
    {
        let ep = ep::CUDA::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda")
        }
    }

    Ok(builder)
}

/// YuNet face detector (`face_detection_yunet_2023mar.onnx`).
pub fn detector_session(path: &Path) -> Result<Session> {
    session_builder()?
        .commit_from_file(path)
        .with_context(|| format!("load detector model {}", path.display()))
}

/// MediaPipe Face Mesh landmark network, NCHW 1x3x192x192 input.
pub fn landmark_session(path: &Path) -> Result<Session> {
    session_builder()?
        .commit_from_file(path)
        .with_context(|| format!("load landmark model {}", path.display()))
}
