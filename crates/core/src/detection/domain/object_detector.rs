use crate::shared::detections::Detections;
use crate::shared::frame::Frame;

/// Domain interface for per-frame object detection.
///
/// Returned boxes are in frame pixel coordinates and carry confidence and
/// class id arrays; `tracker_id` is left unset.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Detections, Box<dyn std::error::Error>>;
}
