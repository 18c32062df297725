use serde::{Deserialize, Serialize};

use crate::shared::constants::{PERSON_CLASS_NAME, YOLO_MODEL_ID};
use crate::shared::video_info::VideoInfo;

/// Normalized detections of one frame as four parallel sequences.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    pub xyxy: Vec<[f64; 4]>,
    pub confidence: Vec<f64>,
    pub class_id: Vec<u32>,
    pub tracker_id: Vec<u32>,
}

impl DetectionSet {
    pub fn len(&self) -> usize {
        self.xyxy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xyxy.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub timestamp: f64,
    pub detections: DetectionSet,
}

/// `video_info` block of the output, with header gaps filled in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoInfoRecord {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub duration_seconds: f64,
}

impl VideoInfoRecord {
    /// Falls back to the default fps, and to the number of emitted frames
    /// when the header had no frame count.
    pub fn from_info(info: &VideoInfo, emitted_frames: usize) -> Self {
        let fps = info.fps_or_default();
        Self {
            width: info.width,
            height: info.height,
            fps,
            total_frames: info
                .total_frames
                .filter(|&n| n > 0)
                .unwrap_or(emitted_frames),
            duration_seconds: emitted_frames as f64 / fps,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub classes_detected: Vec<String>,
    pub tracking_enabled: bool,
}

impl ModelInfo {
    /// Descriptor for the bundled person detector.
    pub fn person_detector(tracking_enabled: bool) -> Self {
        Self {
            model_name: YOLO_MODEL_ID.to_string(),
            classes_detected: vec![PERSON_CLASS_NAME.to_string()],
            tracking_enabled,
        }
    }
}

/// Top-level export. Field order here is the key order on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub video_info: VideoInfoRecord,
    pub model_info: ModelInfo,
    pub frames: Vec<FrameRecord>,
}

impl OutputDocument {
    pub fn new(info: &VideoInfo, model_info: ModelInfo, frames: Vec<FrameRecord>) -> Self {
        Self {
            video_info: VideoInfoRecord::from_info(info, frames.len()),
            model_info,
            frames,
        }
    }
}
