pub mod calibration;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod normalize;
pub mod overlay;
pub mod photo;
pub mod quality;
pub mod sheet;
pub mod upload;

// Re-export vision types for convenience
pub use passrs_vision::{landmarks, FaceMeshPipeline, Landmark, LandmarkOracle, LandmarkSet};

pub use calibration::CalibrationTarget;
pub use error::PhotoError;
