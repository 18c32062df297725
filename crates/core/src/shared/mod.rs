pub mod constants;
pub mod detections;
pub mod frame;
pub mod video_info;
