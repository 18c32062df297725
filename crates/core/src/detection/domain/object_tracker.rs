use crate::shared::detections::Detections;

/// Assigns persistent identities to detections across frames.
///
/// Stateful: call `update` once per frame, in decode order. The result may
/// drop detections that are not bound to an active track.
pub trait ObjectTracker: Send {
    fn update(&mut self, detections: &Detections) -> Detections;
}
