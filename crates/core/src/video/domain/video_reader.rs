use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_info::VideoInfo;

pub type FrameResult = Result<Frame, Box<dyn std::error::Error>>;

/// Forward-only source of decoded frames.
///
/// Rewinding means opening the file again; there is no seek.
pub trait VideoReader: Send {
    /// Opens a video file and reads its header.
    fn open(&mut self, path: &Path) -> Result<VideoInfo, Box<dyn std::error::Error>>;

    /// Lazily decodes frames in order, indices starting at 0.
    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
