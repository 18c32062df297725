pub mod object_detector;
pub mod object_tracker;
