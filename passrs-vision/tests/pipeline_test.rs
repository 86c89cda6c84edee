use anyhow::Result;
use passrs_vision::{landmarks::NUM_LANDMARKS, FaceMeshPipeline, LandmarkOracle, Thresholds};
use std::path::PathBuf;

/// Model files are not shipped with the crate; point these at local copies.
fn model_paths() -> Option<(PathBuf, PathBuf)> {
    let detector = std::env::var_os("PASSRS_DETECTOR_MODEL")?;
    let landmarks = std::env::var_os("PASSRS_LANDMARK_MODEL")?;
    Some((detector.into(), landmarks.into()))
}

#[test]
fn test_pipeline_initialization() -> Result<()> {
    let Some((detector, landmarks)) = model_paths() else {
        println!("PASSRS_DETECTOR_MODEL / PASSRS_LANDMARK_MODEL not set, skipping");
        return Ok(());
    };
    let _pipeline = FaceMeshPipeline::new(&detector, &landmarks, Thresholds::default())?;
    println!("✓ Pipeline initialized successfully");
    Ok(())
}

#[test]
fn test_blank_image_has_no_face() -> Result<()> {
    let Some((detector, landmarks)) = model_paths() else {
        return Ok(());
    };
    let mut pipeline = FaceMeshPipeline::new(&detector, &landmarks, Thresholds::default())?;
    let blank = image::RgbImage::from_pixel(640, 480, image::Rgb([255, 255, 255]));
    assert!(pipeline.detect(&blank)?.is_none());
    Ok(())
}

#[test]
fn test_portrait_mesh() -> Result<()> {
    let (Some((detector, landmarks)), Some(photo)) =
        (model_paths(), std::env::var_os("PASSRS_TEST_PORTRAIT"))
    else {
        return Ok(());
    };
    let _ = env_logger::builder().is_test(true).try_init();

    let mut pipeline = FaceMeshPipeline::new(&detector, &landmarks, Thresholds::default())?;
    let img = image::open(&photo)?.to_rgb8();
    let set = pipeline.detect(&img)?.expect("face in portrait");

    assert_eq!(set.points().len(), NUM_LANDMARKS);
    // hairline above eyes above chin
    assert!(set.forehead().y < set.left_eye().y);
    assert!(set.left_eye().y < set.chin().y);
    // index 33 sits on the image left
    assert!(set.left_eye().x < set.right_eye().x);
    Ok(())
}
