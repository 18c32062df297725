/// YOLO object detector (COCO-style class head) using ONNX Runtime via `ort`.
///
/// Letterboxes the frame, runs inference, picks the best class per anchor,
/// applies class-aware NMS and maps boxes back to frame pixels. Tracking is
/// left to the caller.
use std::cmp::Ordering;
use std::path::Path;

use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::detections::Detections;
use crate::shared::frame::Frame;

use super::execution_provider::preferred_execution_providers;
use super::math::bbox_iou;

/// Fallback input resolution when the model has a dynamic input shape.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default minimum class score for a detection to be kept.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.7;

const MAX_DETECTIONS: usize = 300;

/// Letterbox padding value, YOLO convention.
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX export.
    ///
    /// The input resolution comes from the model's NCHW input shape, or
    /// 640 when that dimension is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("YOLO input size: {input_size}");

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Detections, Box<dyn std::error::Error>> {
        let (input_tensor, transform) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let layout = OutputLayout::from_shape(tensor.shape())?;
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates = decode_candidates(data, &layout, self.confidence);
        for c in &mut candidates {
            c.bbox = transform.unmap(&c.bbox, frame.width(), frame.height());
        }
        let kept = nms(candidates, NMS_IOU_THRESH, MAX_DETECTIONS);

        Ok(to_detections(&kept))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Parameters needed to undo a letterbox resize.
struct LetterboxTransform {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl LetterboxTransform {
    /// Maps a box from model input space back to clipped frame pixels.
    fn unmap(&self, b: &[f64; 4], frame_w: u32, frame_h: u32) -> [f64; 4] {
        let px = self.pad_x as f64;
        let py = self.pad_y as f64;
        let fw = frame_w as f64;
        let fh = frame_h as f64;
        [
            ((b[0] - px) / self.scale).clamp(0.0, fw),
            ((b[1] - py) / self.scale).clamp(0.0, fh),
            ((b[2] - px) / self.scale).clamp(0.0, fw),
            ((b[3] - py) / self.scale).clamp(0.0, fh),
        ]
    }
}

/// Aspect-preserving nearest-neighbour resize into a square NCHW tensor.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, LetterboxTransform) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let scale = (target_size as f64 / fw).min(target_size as f64 / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let side = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, side, side), PAD_VALUE);
    let src = frame.as_ndarray();
    let max_y = frame.height() as usize - 1;
    let max_x = frame.width() as usize - 1;

    for y in 0..new_h as usize {
        let sy = ((y as f64 / scale) as usize).min(max_y);
        let ty = pad_y as usize + y;
        for x in 0..new_w as usize {
            let sx = ((x as f64 / scale) as usize).min(max_x);
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[sy, sx, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        LetterboxTransform {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Shape of the raw head output: `[1, 4 + classes, anchors]` as exported by
/// Ultralytics, or the transposed `[1, anchors, 4 + classes]`.
#[derive(Debug, PartialEq)]
struct OutputLayout {
    num_anchors: usize,
    num_features: usize,
    feature_major: bool,
}

impl OutputLayout {
    fn from_shape(shape: &[usize]) -> Result<Self, Box<dyn std::error::Error>> {
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let feature_major = shape[1] < shape[2];
        let (num_anchors, num_features) = if feature_major {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_features < 5 {
            return Err(format!("YOLO output has no class scores: {shape:?}").into());
        }
        Ok(Self {
            num_anchors,
            num_features,
            feature_major,
        })
    }

    fn value(&self, data: &[f32], anchor: usize, feature: usize) -> f32 {
        if self.feature_major {
            data[feature * self.num_anchors + anchor]
        } else {
            data[anchor * self.num_features + feature]
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Candidate {
    bbox: [f64; 4],
    confidence: f64,
    class_id: u32,
}

/// Best-class decoding of every anchor whose top score reaches `min_conf`.
/// Boxes come back as `xyxy` in model input space.
fn decode_candidates(data: &[f32], layout: &OutputLayout, min_conf: f64) -> Vec<Candidate> {
    let mut out = Vec::new();
    for anchor in 0..layout.num_anchors {
        let (class_id, score) = (4..layout.num_features)
            .map(|f| (f - 4, layout.value(data, anchor, f)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, 0.0));
        let confidence = score as f64;
        if confidence < min_conf {
            continue;
        }

        let cx = layout.value(data, anchor, 0) as f64;
        let cy = layout.value(data, anchor, 1) as f64;
        let w = layout.value(data, anchor, 2) as f64;
        let h = layout.value(data, anchor, 3) as f64;
        out.push(Candidate {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            confidence,
            class_id: class_id as u32,
        });
    }
    out
}

/// Greedy class-aware NMS: boxes only suppress boxes of the same class.
fn nms(mut candidates: Vec<Candidate>, iou_thresh: f64, max_det: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for c in candidates {
        if keep.len() >= max_det {
            break;
        }
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == c.class_id && bbox_iou(&k.bbox, &c.bbox) > iou_thresh);
        if !suppressed {
            keep.push(c);
        }
    }
    keep
}

fn to_detections(kept: &[Candidate]) -> Detections {
    let boxes: Vec<[f64; 4]> = kept.iter().map(|c| c.bbox).collect();
    Detections::from_boxes(&boxes)
        .with_confidence(kept.iter().map(|c| c.confidence).collect())
        .with_class_id(kept.iter().map(|c| c.class_id).collect())
}
