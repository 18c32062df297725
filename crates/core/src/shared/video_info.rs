use std::path::PathBuf;

use super::constants::DEFAULT_FPS;

/// Stream properties read once from the container header.
///
/// `fps` and `total_frames` are `None` when the header reports nothing
/// usable (zero or a degenerate rational).
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
    pub total_frames: Option<usize>,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoInfo {
    pub fn fps_or_default(&self) -> f64 {
        self.fps.filter(|f| *f > 0.0).unwrap_or(DEFAULT_FPS)
    }

    /// Seconds from the start of the stream for a zero-based frame index.
    pub fn timestamp(&self, frame_index: usize) -> f64 {
        frame_index as f64 / self.fps_or_default()
    }
}
