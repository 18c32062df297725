use crate::detection::domain::object_tracker::ObjectTracker;
use crate::shared::detections::Detections;

/// Stand-in used when tracking is disabled.
///
/// Returns detections untouched, so no `tracker_id` array is attached and
/// downstream normalization falls back to positional ids.
#[derive(Debug, Default)]
pub struct PassthroughTracker;

impl ObjectTracker for PassthroughTracker {
    fn update(&mut self, detections: &Detections) -> Detections {
        detections.clone()
    }
}
