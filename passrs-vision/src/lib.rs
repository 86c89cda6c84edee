pub mod face;
pub mod landmarks;
pub mod mesh;
pub mod model;
pub mod pipeline;
pub mod yunet;

// Re-export commonly used types
pub use face::Detection;
pub use landmarks::{Landmark, LandmarkOracle, LandmarkSet};
pub use pipeline::{FaceMeshPipeline, Thresholds};
