use crate::yunet;
use anyhow::Result;
use image::{imageops::FilterType, GenericImageView, RgbImage};
use ndarray::Array4;
use ort::{session::Session, value::Value};

/// YuNet is exported with a fixed `[1, 3, 640, 640]` input.
pub const DETECTOR_INPUT: u32 = 640;

/// Face found by YuNet, in source image pixels.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
    pub landmarks: [f32; 10], // 5 points: eyes, nose, mouth corners
}

impl Detection {
    pub fn center(&self) -> (f32, f32) {
        (
            self.bbox[0] + self.bbox[2] / 2.0,
            self.bbox[1] + self.bbox[3] / 2.0,
        )
    }
}

/// Where the source image sits inside the square detector input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, target: u32) -> Self {
        let scale = target as f32 / width.max(height) as f32;
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;
        Self {
            scale,
            offset_x: (target - new_width.min(target)) / 2,
            offset_y: (target - new_height.min(target)) / 2,
        }
    }

    /// Map a point normalized to the square input back to source pixels.
    pub fn to_source(&self, x: f32, y: f32, target: u32) -> (f32, f32) {
        (
            (x * target as f32 - self.offset_x as f32) / self.scale,
            (y * target as f32 - self.offset_y as f32) / self.scale,
        )
    }
}

/// Detect faces with YuNet. Results are sorted by descending score.
pub fn detect_faces(
    session: &mut Session,
    img: &RgbImage,
    score_threshold: f32,
    nms_threshold: f32,
) -> Result<Vec<Detection>> {
    let target = DETECTOR_INPUT;
    let (width, height) = img.dimensions();
    let letterbox = Letterbox::fit(width, height, target);

    let resized = image::imageops::resize(
        img,
        ((width as f32 * letterbox.scale) as u32).max(1),
        ((height as f32 * letterbox.scale) as u32).max(1),
        FilterType::Triangle,
    );
    let mut canvas = RgbImage::new(target, target);
    image::imageops::replace(
        &mut canvas,
        &resized,
        letterbox.offset_x as i64,
        letterbox.offset_y as i64,
    );

    // BGR planes in [0, 255]
    let side = target as usize;
    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        input[[0, 0, y, x]] = pixel[2] as f32;
        input[[0, 1, y, x]] = pixel[1] as f32;
        input[[0, 2, y, x]] = pixel[0] as f32;
    }

    let input_tensor = Value::from_array(input)?;
    let outputs = session.run(ort::inputs![input_tensor])?;

    let mut output_data: Vec<(Vec<i64>, Vec<f32>)> = Vec::new();
    for (_name, output) in outputs.iter() {
        let (shape, data) = output.try_extract_tensor::<f32>()?;
        output_data.push((shape.iter().copied().collect(), data.to_vec()));
    }
    let output_refs: Vec<(&[i64], &[f32])> = output_data
        .iter()
        .map(|(s, d)| (s.as_slice(), d.as_slice()))
        .collect();

    let scales = yunet::parse_outputs(&output_refs, side)?;
    let raw = yunet::decode(&scales, score_threshold, side)?;

    let detections: Vec<Detection> = raw
        .into_iter()
        .map(|d| {
            let (x, y) = letterbox.to_source(d.bbox[0], d.bbox[1], target);
            let w = d.bbox[2] * target as f32 / letterbox.scale;
            let h = d.bbox[3] * target as f32 / letterbox.scale;

            let mut landmarks = [0.0f32; 10];
            for i in 0..5 {
                let (lx, ly) =
                    letterbox.to_source(d.landmarks[i * 2], d.landmarks[i * 2 + 1], target);
                landmarks[i * 2] = lx;
                landmarks[i * 2 + 1] = ly;
            }

            Detection {
                bbox: [x, y, w, h],
                score: d.score,
                landmarks,
            }
        })
        .collect();

    log::debug!(
        "yunet: {} candidate(s) above {:.2} on {}x{}",
        detections.len(),
        score_threshold,
        width,
        height
    );

    Ok(nms(&detections, nms_threshold))
}

/// Greedy non-maximum suppression, highest score first.
pub fn nms(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in sorted {
        if keep
            .iter()
            .all(|kept| compute_iou(&kept.bbox, &candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    inter / (a[2] * a[3] + b[2] * b[3] - inter)
}

/// Bilinear sample of `img` at a sub-pixel position, `None` outside the image.
pub fn sample_bilinear<I: GenericImageView<Pixel = image::Rgb<u8>>>(
    img: &I,
    x: f32,
    y: f32,
) -> Option<[f32; 3]> {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 || x >= w as f32 || y >= h as f32 {
        return None;
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut out = [0.0f32; 3];
    for (c, value) in out.iter_mut().enumerate() {
        *value = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f32 * fx * (1.0 - fy)
            + p01[c] as f32 * (1.0 - fx) * fy
            + p11[c] as f32 * fx * fy;
    }
    Some(out)
}
