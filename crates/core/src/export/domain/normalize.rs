use ndarray::s;

use crate::shared::detections::Detections;

use super::detection_document::DetectionSet;

/// Rescales pixel boxes into `[0, 1]` relative to the frame size.
///
/// Missing arrays are synthesised: confidence 1.0, class 0, and positional
/// tracker ids `0..N`. Lengths of present arrays are trusted as-is.
pub fn normalize_detections(
    detections: &Detections,
    frame_width: u32,
    frame_height: u32,
) -> DetectionSet {
    let n = detections.len();
    if n == 0 {
        return DetectionSet::default();
    }

    let mut xyxy = detections.xyxy.to_owned();
    let w = frame_width as f64;
    let h = frame_height as f64;
    xyxy.slice_mut(s![.., 0..;2]).mapv_inplace(|x| x / w);
    xyxy.slice_mut(s![.., 1..;2]).mapv_inplace(|y| y / h);

    DetectionSet {
        xyxy: xyxy
            .rows()
            .into_iter()
            .map(|r| [r[0], r[1], r[2], r[3]])
            .collect(),
        confidence: detections
            .confidence
            .clone()
            .unwrap_or_else(|| vec![1.0; n]),
        class_id: detections.class_id.clone().unwrap_or_else(|| vec![0; n]),
        tracker_id: detections
            .tracker_id
            .clone()
            .unwrap_or_else(|| (0..n as u32).collect()),
    }
}
