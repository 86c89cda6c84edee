use thiserror::Error;

/// Terminal failures of a single photo request. No partial output is produced.
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("No face detected. Please use a clear, front-facing passport-style photo")]
    NoFaceDetected,

    #[error("implausible face geometry: head height of {head_px} px")]
    DegenerateGeometry { head_px: i64 },

    #[error("scaling to {width}x{height} px exceeds the resize limit")]
    OversizedPlan { width: u64, height: u64 },

    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge { size: u64, limit: u64 },

    #[error("landmark detection failed")]
    Oracle(#[source] anyhow::Error),

    #[error("encoding {format} failed")]
    Encode {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PhotoError>;
