use anyhow::Result;
use image::{imageops, imageops::FilterType, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use passrs::{
    config::LandmarkSource,
    geometry::HeadGeometry,
    landmarks::{CHIN, FOREHEAD, LEFT_EYE, NUM_LANDMARKS, RIGHT_EYE},
    normalize,
    overlay::OverlayRenderer,
    photo, CalibrationTarget, Landmark, LandmarkOracle, LandmarkSet, PhotoError,
};

/// Oracle that returns the same answer for every image.
struct FixedOracle {
    landmarks: Option<LandmarkSet>,
    calls: usize,
}

impl FixedOracle {
    fn new(landmarks: Option<LandmarkSet>) -> Self {
        Self {
            landmarks,
            calls: 0,
        }
    }
}

impl LandmarkOracle for FixedOracle {
    fn detect(&mut self, _image: &RgbImage) -> Result<Option<LandmarkSet>> {
        self.calls += 1;
        Ok(self.landmarks.clone())
    }
}

struct BrokenOracle;

impl LandmarkOracle for BrokenOracle {
    fn detect(&mut self, _image: &RgbImage) -> Result<Option<LandmarkSet>> {
        anyhow::bail!("model exploded")
    }
}

fn face(top: f32, chin: f32, left: (f32, f32), right: (f32, f32)) -> LandmarkSet {
    let mut points = vec![Landmark::new(0.5, 0.5); NUM_LANDMARKS];
    points[FOREHEAD] = Landmark::new(0.5, top);
    points[CHIN] = Landmark::new(0.5, chin);
    points[LEFT_EYE] = Landmark::new(left.0, left.1);
    points[RIGHT_EYE] = Landmark::new(right.0, right.1);
    LandmarkSet::new(points).unwrap()
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 256) as u8])
    })
}

#[test]
fn test_small_result_is_white_padded() -> Result<()> {
    let target = CalibrationTarget::default();
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1000, 1000, Rgb([0, 0, 0])));
    let mut oracle = FixedOracle::new(Some(face(0.1, 0.9, (0.4, 0.3), (0.6, 0.3))));

    let normalized = normalize::normalize(&img, &mut oracle, &target)?;

    assert_eq!(normalized.geometry.head_px(), 800);
    assert_eq!(normalized.plan.resized_width, 383);
    assert_eq!(normalized.plan.crop.top, 0);
    assert_eq!(normalized.plan.crop.left, 0);

    let out = &normalized.image;
    assert_eq!(out.dimensions(), (600, 600));
    assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
    assert_eq!(out.get_pixel(382, 382), &Rgb([0, 0, 0]));
    assert_eq!(out.get_pixel(383, 0), &Rgb([255, 255, 255]));
    assert_eq!(out.get_pixel(0, 383), &Rgb([255, 255, 255]));
    assert_eq!(out.get_pixel(599, 599), &Rgb([255, 255, 255]));
    Ok(())
}

#[test]
fn test_crop_matches_manual_resize() -> Result<()> {
    let target = CalibrationTarget::default();
    let src = gradient(1200, 1200);
    let mut oracle = FixedOracle::new(Some(face(0.1, 0.5, (0.6, 0.4), (0.6, 0.4))));

    let normalized = normalize::normalize(&DynamicImage::ImageRgb8(src.clone()), &mut oracle, &target)?;
    assert_eq!(normalized.plan.crop.top, 71);
    assert_eq!(normalized.plan.crop.left, 159);

    let resized = imageops::resize(&src, 765, 765, FilterType::CatmullRom);
    let expected = imageops::crop_imm(&resized, 159, 71, 600, 600).to_image();
    assert_eq!(normalized.image, expected);
    Ok(())
}

#[test]
fn test_no_face_produces_nothing() {
    let target = CalibrationTarget::default();
    for (w, h) in [(1, 1), (640, 480), (600, 600), (300, 1200)] {
        let img = DynamicImage::ImageRgb8(gradient(w, h));
        let mut oracle = FixedOracle::new(None);
        let err = normalize::normalize(&img, &mut oracle, &target).unwrap_err();
        assert!(matches!(err, PhotoError::NoFaceDetected), "{}x{}", w, h);
        assert_eq!(oracle.calls, 1);
    }
}

#[test]
fn test_oracle_failure_is_propagated() {
    let target = CalibrationTarget::default();
    let img = DynamicImage::ImageRgb8(gradient(100, 100));
    let err = normalize::normalize(&img, &mut BrokenOracle, &target).unwrap_err();
    assert!(matches!(err, PhotoError::Oracle(_)));
}

#[test]
fn test_degenerate_geometry() {
    let target = CalibrationTarget::default();
    let img = DynamicImage::ImageRgb8(gradient(100, 100));
    let mut oracle = FixedOracle::new(Some(face(0.6, 0.4, (0.4, 0.5), (0.6, 0.5))));
    let err = normalize::normalize(&img, &mut oracle, &target).unwrap_err();
    assert!(matches!(err, PhotoError::DegenerateGeometry { head_px: -20 }));
}

#[test]
fn test_tiny_head_fails_without_resizing() {
    let target = CalibrationTarget::default();
    let img = DynamicImage::ImageRgb8(gradient(4000, 4000));
    // hairline and chin one pixel apart
    let mut oracle = FixedOracle::new(Some(face(0.5, 0.50025, (0.45, 0.5), (0.55, 0.5))));
    let err = normalize::normalize(&img, &mut oracle, &target).unwrap_err();
    assert!(
        matches!(err, PhotoError::OversizedPlan { width: 1_224_000, height: 1_224_000 }),
        "{}",
        err
    );
}

#[test]
fn test_transparency_becomes_white() -> Result<()> {
    let target = CalibrationTarget::default();
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1200, 1200, Rgba([0, 0, 0, 0])));
    let mut oracle = FixedOracle::new(Some(face(0.1, 0.5, (0.6, 0.4), (0.6, 0.4))));

    let normalized = normalize::normalize(&img, &mut oracle, &target)?;
    assert!(normalized.image.pixels().all(|p| *p == Rgb([255, 255, 255])));
    Ok(())
}

#[test]
fn test_renormalizing_is_near_fixed_point() -> Result<()> {
    let target = CalibrationTarget::default();
    let img = DynamicImage::ImageRgb8(gradient(1200, 1200));
    let mut oracle = FixedOracle::new(Some(face(0.1, 0.5, (0.55, 0.4), (0.65, 0.4))));

    let first = normalize::normalize(&img, &mut oracle, &target)?;
    let projected = first.output_landmarks();
    let size = target.output_size_px;
    let geometry = HeadGeometry::from_landmarks(&projected, size, size);
    let head_mm = target.px_to_mm(geometry.head_px() as f64);
    assert!((head_mm - 26.0).abs() < 0.2, "head {} mm", head_mm);

    // the oracle still finds the face, now where the crop moved it
    let mut oracle = FixedOracle::new(Some(projected));
    let second = normalize::normalize(&DynamicImage::ImageRgb8(first.image.clone()), &mut oracle, &target)?;
    assert!((second.plan.scale - 1.0).abs() < 0.01, "scale {}", second.plan.scale);

    let again = HeadGeometry::from_landmarks(&second.output_landmarks(), size, size);
    let head_mm = target.px_to_mm(again.head_px() as f64);
    assert!((head_mm - 26.0).abs() < 0.2, "head {} mm", head_mm);
    Ok(())
}

#[test]
fn test_process_measures_output() -> Result<()> {
    let target = CalibrationTarget::default();
    let img = DynamicImage::ImageRgb8(gradient(1200, 1200));
    let mut oracle = FixedOracle::new(Some(face(0.1, 0.5, (0.55, 0.4), (0.65, 0.4))));

    let processed = photo::process(&img, &mut oracle, &target)?;
    let m = processed.measurements;
    assert!((m.head_height_mm - 26.0).abs() < 0.2);
    assert!((m.eye_to_bottom_mm - 31.0).abs() < 0.2);
    assert!(m.head_in_range);
    assert!(m.eye_in_range);

    let json = serde_json::to_value(processed.report())?;
    assert_eq!(json["plan"]["crop"]["top"], 71);
    assert_eq!(json["source_width"], 1200);
    assert!(json["warnings"].is_array());
    Ok(())
}

#[test]
fn test_preview_redetect_without_face_is_skipped() -> Result<()> {
    let target = CalibrationTarget::default();
    let img = DynamicImage::ImageRgb8(gradient(1200, 1200));
    let mut oracle = FixedOracle::new(Some(face(0.1, 0.5, (0.55, 0.4), (0.65, 0.4))));
    let processed = photo::process(&img, &mut oracle, &target)?;

    let renderer = OverlayRenderer::new(None);
    let mut blind = FixedOracle::new(None);
    let preview = photo::preview(&processed, &mut blind, &renderer, LandmarkSource::Redetect, &target)?;
    assert!(preview.is_none());
    assert_eq!(blind.calls, 1);
    Ok(())
}

#[test]
fn test_preview_reproject_skips_oracle() -> Result<()> {
    let target = CalibrationTarget::default();
    let img = DynamicImage::ImageRgb8(gradient(1200, 1200));
    let mut oracle = FixedOracle::new(Some(face(0.1, 0.5, (0.55, 0.4), (0.65, 0.4))));
    let processed = photo::process(&img, &mut oracle, &target)?;

    let renderer = OverlayRenderer::new(None);
    let mut unused = FixedOracle::new(None);
    let preview = photo::preview(&processed, &mut unused, &renderer, LandmarkSource::Reproject, &target)?
        .expect("reprojection always yields landmarks");
    assert_eq!(unused.calls, 0);

    // eye line lands on row 235, drawn across the full width
    assert_eq!(preview.get_pixel(0, 235), &Rgb([0, 0, 255]));
    assert_eq!(preview.get_pixel(599, 235), &Rgb([0, 0, 255]));
    // the saved photo is untouched
    assert_ne!(processed.image().get_pixel(0, 235), &Rgb([0, 0, 255]));
    Ok(())
}
