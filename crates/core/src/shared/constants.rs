pub const YOLO_MODEL_ID: &str = "yolo11n";
pub const YOLO_MODEL_NAME: &str = "yolo11n.onnx";

/// Directory checked for a pre-packaged model before downloading.
pub const BUNDLED_MODEL_DIR: &str = "models";

/// COCO label index of "person". Tied to the detector's training set.
pub const PERSON_CLASS_ID: u32 = 0;
pub const PERSON_CLASS_NAME: &str = "person";

pub const TRACK_ACTIVATION_THRESHOLD: f64 = 0.25;
/// Frames a track may go undetected before removal (~1 second at 30 fps).
pub const LOST_TRACK_BUFFER: usize = 30;
pub const MINIMUM_MATCHING_THRESHOLD: f64 = 0.8;
pub const TRACKER_FRAME_RATE: u32 = 30;

/// Used for timestamps when the container does not report a frame rate.
pub const DEFAULT_FPS: f64 = 30.0;

pub const PROGRESS_INTERVAL_FRAMES: usize = 30;

pub const DEFAULT_VIDEO_PATH: &str = "assets/people-walking.mp4";
pub const DEFAULT_OUTPUT_PATH: &str = "assets/people-walking-detections.json";
