use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{calibration::CalibrationTarget, sheet::SheetLayout, upload::DEFAULT_MAX_BYTES};

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(path) = option_env!("PASSRS_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    ProjectDirs::from("", "", "passrs")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("passrs.toml"))
});

pub static MODEL_PREFIX: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("PASSRS_MODEL_PREFIX").unwrap_or("/usr/local/share/passrs"))
});

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub calibration: CalibrationTarget,
    pub models: ModelConfig,
    pub overlay: OverlayConfig,
    pub upload: UploadConfig,
    pub sheet: SheetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub detector: PathBuf,
    pub landmarks: PathBuf,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub face_threshold: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            detector: MODEL_PREFIX.join("face_detection_yunet_2023mar.onnx"),
            landmarks: MODEL_PREFIX.join("face_landmark.onnx"),
            score_threshold: 0.6,
            nms_threshold: 0.3,
            face_threshold: 0.5,
        }
    }
}

/// Where the preview overlay gets its landmarks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandmarkSource {
    /// Run the oracle again on the calibrated output.
    #[default]
    Redetect,
    /// Carry the source landmarks through the scale and crop.
    Reproject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// TrueType fonts tried in order for the measurement labels. The bundled
    /// DejaVu Sans is used when none of them loads.
    pub fonts: Vec<PathBuf>,
    pub landmarks: LandmarkSource,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fonts: Vec::new(),
            landmarks: LandmarkSource::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Border thickness used when none is given on the command line.
    pub border_px: u32,
    pub layout: SheetLayout,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            border_px: 5,
            layout: SheetLayout::default(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(CONFIG_PATH.as_path());
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.calibration
        .validate()
        .with_context(|| format!("checking config {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(CONFIG_PATH.as_path());
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let cfg = load_config(Some(Path::new("/nonexistent/passrs/config.toml"))).unwrap();
        assert_eq!(cfg.calibration, CalibrationTarget::default());
        assert_eq!(cfg.upload.max_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.overlay.landmarks, LandmarkSource::Redetect);
    }

    #[test]
    fn test_partial_file() {
        let raw = r#"
            [calibration]
            output_size_px = 413
            physical_size_mm = 35.0

            [overlay]
            landmarks = "reproject"
        "#;
        let cfg: Config = toml::from_str(raw).unwrap();
        assert_eq!(cfg.calibration.output_size_px, 413);
        assert_eq!(cfg.calibration.target_head_mm, 26.0);
        assert_eq!(cfg.overlay.landmarks, LandmarkSource::Reproject);
        assert_eq!(cfg.sheet.border_px, 5);
    }

    #[test]
    fn test_invalid_calibration_is_rejected() {
        let dir = std::env::temp_dir().join(format!("passrs-bad-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[calibration]\nphysical_size_mm = 0.0\n").unwrap();

        let err = load_config(Some(path.as_path())).unwrap_err();
        assert!(format!("{:#}", err).contains("physical_size_mm"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("passrs-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut cfg = Config::default();
        cfg.models.score_threshold = 0.75;
        cfg.sheet.border_px = 3;
        save_config(&cfg, Some(path.as_path())).unwrap();

        let loaded = load_config(Some(path.as_path())).unwrap();
        assert_eq!(loaded.models.score_threshold, 0.75);
        assert_eq!(loaded.sheet.border_px, 3);
        assert_eq!(loaded.calibration, cfg.calibration);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
