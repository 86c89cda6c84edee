//! YuNet output decoding.
//!
//! YuNet is anchor-free: for each stride (8, 16, 32) the network predicts, per
//! grid cell, a class score, an objectness score, a box `(dx, dy, dw, dh)` and
//! five keypoints. Cell `(i, j)` decodes as
//!
//! ```text
//! cx = (j + dx) * stride / input_size
//! cy = (i + dy) * stride / input_size
//! w  = dw * stride / input_size
//! h  = dh * stride / input_size
//! ```
//!
//! The twelve output tensors come in the order
//! `cls_8, cls_16, cls_32, obj_8, obj_16, obj_32, bbox_8, bbox_16, bbox_32,
//! kps_8, kps_16, kps_32`.

use anyhow::Result;
use ndarray::Array2;

pub const STRIDES: [usize; 3] = [8, 16, 32];

/// Detection with coordinates normalized to the square network input.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
    pub landmarks: [f32; 10],
}

/// Predictions of one stride.
#[derive(Debug, Clone)]
pub struct ScaleOutput {
    pub stride: usize,
    /// `[cells, 1]`, `sqrt(cls * obj)` with both clamped to `[0, 1]`.
    pub scores: Array2<f32>,
    /// `[cells, 4]`
    pub boxes: Array2<f32>,
    /// `[cells, 10]`
    pub keypoints: Array2<f32>,
}

/// Split raw `(shape, data)` tensors into one [`ScaleOutput`] per stride.
pub fn parse_outputs(outputs: &[(&[i64], &[f32])], input_size: usize) -> Result<Vec<ScaleOutput>> {
    if outputs.len() < 12 {
        anyhow::bail!("YuNet produced {} outputs, expected 12", outputs.len());
    }

    let mut scales = Vec::with_capacity(STRIDES.len());
    for (k, &stride) in STRIDES.iter().enumerate() {
        let side = input_size / stride;
        let cells = side * side;

        let cls = tensor(outputs[k], cells, 1, "cls")?;
        let obj = tensor(outputs[k + 3], cells, 1, "obj")?;
        let boxes = tensor(outputs[k + 6], cells, 4, "bbox")?;
        let keypoints = tensor(outputs[k + 9], cells, 10, "kps")?;

        let unit = |v: f32| v.clamp(0.0, 1.0);
        let mut scores = cls.mapv(unit) * obj.mapv(unit);
        scores.mapv_inplace(f32::sqrt);

        scales.push(ScaleOutput {
            stride,
            scores,
            boxes,
            keypoints,
        });
    }
    Ok(scales)
}

fn tensor(output: (&[i64], &[f32]), cells: usize, width: usize, name: &str) -> Result<Array2<f32>> {
    let (shape, data) = output;
    if shape.len() != 3 || shape[0] != 1 || shape[1] as usize != cells || shape[2] as usize != width
    {
        anyhow::bail!(
            "unexpected {} shape {:?}, expected [1, {}, {}]",
            name,
            shape,
            cells,
            width
        );
    }
    Ok(Array2::from_shape_vec((cells, width), data.to_vec())?)
}

/// Decode every cell scoring at least `score_threshold`.
pub fn decode(scales: &[ScaleOutput], score_threshold: f32, input_size: usize) -> Result<Vec<RawDetection>> {
    let mut detections = Vec::new();
    let size = input_size as f32;

    for scale in scales {
        let side = input_size / scale.stride;
        let stride = scale.stride as f32;

        if scale.scores.shape()[0] != side * side {
            anyhow::bail!(
                "stride {} has {} cells, expected {}x{}",
                scale.stride,
                scale.scores.shape()[0],
                side,
                side
            );
        }

        for i in 0..side {
            for j in 0..side {
                let idx = i * side + j;
                let score = scale.scores[[idx, 0]];
                if score < score_threshold {
                    continue;
                }

                let cx = (j as f32 + scale.boxes[[idx, 0]]) * stride / size;
                let cy = (i as f32 + scale.boxes[[idx, 1]]) * stride / size;
                let w = scale.boxes[[idx, 2]] * stride / size;
                let h = scale.boxes[[idx, 3]] * stride / size;

                let mut landmarks = [0.0f32; 10];
                for k in 0..5 {
                    landmarks[k * 2] = (j as f32 + scale.keypoints[[idx, k * 2]]) * stride / size;
                    landmarks[k * 2 + 1] =
                        (i as f32 + scale.keypoints[[idx, k * 2 + 1]]) * stride / size;
                }

                detections.push(RawDetection {
                    bbox: [cx - w / 2.0, cy - h / 2.0, w, h],
                    score,
                    landmarks,
                });
            }
        }
    }

    Ok(detections)
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
