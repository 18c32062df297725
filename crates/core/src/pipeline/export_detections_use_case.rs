use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::object_tracker::ObjectTracker;
use crate::export::domain::detection_document::{FrameRecord, ModelInfo, OutputDocument};
use crate::export::domain::document_writer::{DocumentWriteError, DocumentWriter};
use crate::export::domain::normalize::normalize_detections;
use crate::shared::video_info::VideoInfo;
use crate::video::domain::video_reader::VideoReader;

use super::export_logger::ExportLogger;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Video file not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("failed to open video: {0}")]
    Open(String),
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("detection failed on frame {frame_index}: {message}")]
    Detect { frame_index: usize, message: String },
    #[error(transparent)]
    Write(#[from] DocumentWriteError),
    #[error("export already executed")]
    AlreadyExecuted,
}

/// Video → per-frame person detections → one JSON document.
///
/// Single-use: `execute` consumes the owned components, so a second call
/// returns `ExportError::AlreadyExecuted`.
pub struct ExportDetectionsUseCase {
    reader: Option<Box<dyn VideoReader>>,
    detector: Option<Box<dyn ObjectDetector>>,
    tracker: Option<Box<dyn ObjectTracker>>,
    writer: Option<Box<dyn DocumentWriter>>,
    model_info: ModelInfo,
    target_class: u32,
    logger: Box<dyn ExportLogger>,
}

impl ExportDetectionsUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        detector: Box<dyn ObjectDetector>,
        tracker: Box<dyn ObjectTracker>,
        writer: Box<dyn DocumentWriter>,
        model_info: ModelInfo,
        target_class: u32,
        logger: Box<dyn ExportLogger>,
    ) -> Self {
        Self {
            reader: Some(reader),
            detector: Some(detector),
            tracker: Some(tracker),
            writer: Some(writer),
            model_info,
            target_class,
            logger,
        }
    }

    /// Runs the whole export and returns the document that was written.
    ///
    /// A missing input is reported before any component is touched, so the
    /// output path is left alone.
    pub fn execute(
        &mut self,
        video_path: &Path,
        output_path: &Path,
    ) -> Result<OutputDocument, ExportError> {
        if !video_path.is_file() {
            return Err(ExportError::InputNotFound(video_path.to_path_buf()));
        }

        let mut reader = self.reader.take().ok_or(ExportError::AlreadyExecuted)?;
        let mut detector = self.detector.take().ok_or(ExportError::AlreadyExecuted)?;
        let mut tracker = self.tracker.take().ok_or(ExportError::AlreadyExecuted)?;
        let mut writer = self.writer.take().ok_or(ExportError::AlreadyExecuted)?;

        let info = reader
            .open(video_path)
            .map_err(|e| ExportError::Open(e.to_string()))?;
        self.logger.info(&format!(
            "Video: {}x{}, {} fps, {} total frames",
            info.width,
            info.height,
            info.fps
                .map_or_else(|| "unknown".to_string(), |f| format!("{f:.2}")),
            info.total_frames
                .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
        ));

        let frames = Self::process_frames(
            reader.as_mut(),
            detector.as_mut(),
            tracker.as_mut(),
            self.target_class,
            self.logger.as_mut(),
            &info,
        );
        reader.close();
        let frames = frames?;

        let document = OutputDocument::new(&info, self.model_info.clone(), frames);
        let t0 = Instant::now();
        writer.write(&document, output_path)?;
        self.logger
            .timing("write", t0.elapsed().as_secs_f64() * 1000.0);
        self.logger.info(&format!(
            "Wrote {} frames to {}",
            document.frames.len(),
            output_path.display()
        ));
        self.logger.summary();

        Ok(document)
    }

    fn process_frames(
        reader: &mut dyn VideoReader,
        detector: &mut dyn ObjectDetector,
        tracker: &mut dyn ObjectTracker,
        target_class: u32,
        logger: &mut dyn ExportLogger,
        info: &VideoInfo,
    ) -> Result<Vec<FrameRecord>, ExportError> {
        let mut records = Vec::with_capacity(info.total_frames.unwrap_or(0));

        for (frame_index, frame) in reader.frames().enumerate() {
            let frame = frame.map_err(|e| ExportError::Decode(e.to_string()))?;

            let t0 = Instant::now();
            let raw = detector
                .detect(&frame)
                .map_err(|e| ExportError::Detect {
                    frame_index,
                    message: e.to_string(),
                })?;
            let t1 = Instant::now();
            let tracked = tracker.update(&raw.filter_class(target_class));
            let t2 = Instant::now();

            let detections = normalize_detections(&tracked, info.width, info.height);
            logger.timing("detect", (t1 - t0).as_secs_f64() * 1000.0);
            logger.timing("track", (t2 - t1).as_secs_f64() * 1000.0);
            logger.progress(frame_index, info.total_frames, detections.len());

            records.push(FrameRecord {
                frame_index,
                timestamp: info.timestamp(frame_index),
                detections,
            });
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::bytetrack_tracker::ByteTracker;
    use crate::detection::infrastructure::passthrough_tracker::PassthroughTracker;
    use crate::export::infrastructure::json_document_writer::JsonDocumentWriter;
    use crate::pipeline::export_logger::NullExportLogger;
    use crate::shared::constants::PERSON_CLASS_ID;
    use crate::shared::detections::Detections;
    use crate::shared::frame::Frame;
    use crate::video::domain::video_reader::FrameResult;
    use approx::assert_relative_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubReader {
        info: VideoInfo,
        frames: usize,
        opened: Arc<AtomicBool>,
        closed: Arc<AtomicBool>,
    }

    impl StubReader {
        fn new(
            width: u32,
            height: u32,
            fps: Option<f64>,
            total: Option<usize>,
            frames: usize,
        ) -> Self {
            Self {
                info: VideoInfo {
                    width,
                    height,
                    fps,
                    total_frames: total,
                    codec: "stub".to_string(),
                    source_path: None,
                },
                frames,
                opened: Arc::new(AtomicBool::new(false)),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoInfo, Box<dyn std::error::Error>> {
            self.opened.store(true, Ordering::SeqCst);
            Ok(self.info.clone())
        }

        fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
            let (w, h) = (self.info.width, self.info.height);
            Box::new((0..self.frames).map(move |i| {
                Ok(Frame::new(vec![0; (w * h * 3) as usize], w, h, 3, i))
            }))
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Hands out pre-scripted results, one per frame; empty once exhausted.
    struct ScriptedDetector {
        script: VecDeque<Result<Detections, String>>,
    }

    impl ScriptedDetector {
        fn new(script: Vec<Result<Detections, String>>) -> Self {
            Self {
                script: script.into(),
            }
        }
    }

    impl ObjectDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Detections, Box<dyn std::error::Error>> {
            match self.script.pop_front() {
                Some(Ok(d)) => Ok(d),
                Some(Err(msg)) => Err(msg.into()),
                None => Ok(Detections::empty()),
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingWriter {
        written: Arc<Mutex<Vec<(PathBuf, OutputDocument)>>>,
    }

    impl DocumentWriter for RecordingWriter {
        fn write(&mut self, document: &OutputDocument, path: &Path) -> Result<(), DocumentWriteError> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), document.clone()));
            Ok(())
        }
    }

    // --- Helpers ---

    fn person(b: [f64; 4], conf: f64) -> Detections {
        Detections::from_boxes(&[b])
            .with_confidence(vec![conf])
            .with_class_id(vec![PERSON_CLASS_ID])
    }

    fn use_case(
        reader: StubReader,
        detector: ScriptedDetector,
        tracker: Box<dyn ObjectTracker>,
        writer: Box<dyn DocumentWriter>,
    ) -> ExportDetectionsUseCase {
        let tracking = true;
        ExportDetectionsUseCase::new(
            Box::new(reader),
            Box::new(detector),
            tracker,
            writer,
            ModelInfo::person_detector(tracking),
            PERSON_CLASS_ID,
            Box::new(NullExportLogger),
        )
    }

    fn existing_input() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    // --- Tests ---

    #[test]
    fn test_two_frame_export_normalizes_and_filters() {
        let input = existing_input();
        let writer = RecordingWriter::default();
        let written = writer.written.clone();
        let car = Detections::from_boxes(&[[1.0, 1.0, 5.0, 5.0]])
            .with_confidence(vec![0.9])
            .with_class_id(vec![2]);

        let mut uc = use_case(
            StubReader::new(10, 20, Some(30.0), Some(2), 2),
            ScriptedDetector::new(vec![Ok(person([1.0, 2.0, 9.0, 18.0], 0.9)), Ok(car)]),
            Box::new(PassthroughTracker),
            Box::new(writer),
        );
        let doc = uc.execute(input.path(), Path::new("out.json")).unwrap();

        assert_eq!(doc.video_info.width, 10);
        assert_eq!(doc.video_info.height, 20);
        assert_eq!(doc.video_info.total_frames, 2);
        assert_eq!(doc.frames.len(), 2);

        let first = &doc.frames[0].detections;
        assert_eq!(first.len(), 1);
        for (got, want) in first.xyxy[0].iter().zip([0.1, 0.1, 0.9, 0.9]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
        assert_eq!(first.confidence, vec![0.9]);
        assert_eq!(first.class_id, vec![0]);
        assert_eq!(first.tracker_id, vec![0]);

        assert!(doc.frames[1].detections.is_empty());
        assert!(doc.frames[1].detections.tracker_id.is_empty());

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("out.json"));
        assert_eq!(written[0].1, doc);
    }

    #[test]
    fn test_missing_input_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let reader = StubReader::new(10, 10, Some(30.0), Some(1), 1);
        let opened = reader.opened.clone();

        let mut uc = use_case(
            reader,
            ScriptedDetector::new(vec![]),
            Box::new(PassthroughTracker),
            Box::new(JsonDocumentWriter::new()),
        );
        let err = uc
            .execute(&dir.path().join("missing.mp4"), &output)
            .unwrap_err();

        assert!(matches!(err, ExportError::InputNotFound(_)));
        assert!(err.to_string().starts_with("Video file not found"));
        assert!(!opened.load(Ordering::SeqCst));
        assert!(!output.exists());
    }

    #[test]
    fn test_frames_are_indexed_and_timestamped_in_order() {
        let input = existing_input();
        let mut uc = use_case(
            StubReader::new(64, 48, Some(25.0), Some(5), 5),
            ScriptedDetector::new(vec![]),
            Box::new(PassthroughTracker),
            Box::new(RecordingWriter::default()),
        );
        let doc = uc.execute(input.path(), Path::new("out.json")).unwrap();

        for (i, record) in doc.frames.iter().enumerate() {
            assert_eq!(record.frame_index, i);
            assert_relative_eq!(record.timestamp, i as f64 / 25.0);
        }
        assert!(doc
            .frames
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_missing_header_values_are_defaulted() {
        let input = existing_input();
        let mut uc = use_case(
            StubReader::new(64, 48, None, None, 3),
            ScriptedDetector::new(vec![]),
            Box::new(PassthroughTracker),
            Box::new(RecordingWriter::default()),
        );
        let doc = uc.execute(input.path(), Path::new("out.json")).unwrap();

        assert_relative_eq!(doc.video_info.fps, 30.0);
        assert_eq!(doc.video_info.total_frames, 3);
        assert_relative_eq!(doc.frames[2].timestamp, 2.0 / 30.0);
        assert_relative_eq!(doc.video_info.duration_seconds, 0.1);
    }

    #[test]
    fn test_detector_error_aborts_without_writing() {
        let input = existing_input();
        let writer = RecordingWriter::default();
        let written = writer.written.clone();
        let reader = StubReader::new(10, 10, Some(30.0), Some(3), 3);
        let closed = reader.closed.clone();

        let mut uc = use_case(
            reader,
            ScriptedDetector::new(vec![Ok(Detections::empty()), Err("boom".to_string())]),
            Box::new(PassthroughTracker),
            Box::new(writer),
        );
        let err = uc.execute(input.path(), Path::new("out.json")).unwrap_err();

        match err {
            ExportError::Detect {
                frame_index,
                message,
            } => {
                assert_eq!(frame_index, 1);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(written.lock().unwrap().is_empty());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_tracker_assigns_stable_ids() {
        let input = existing_input();
        let script = (0..3)
            .map(|i| Ok(person([10.0 + i as f64, 10.0, 50.0 + i as f64, 90.0], 0.9)))
            .collect();
        let mut uc = use_case(
            StubReader::new(100, 100, Some(30.0), Some(3), 3),
            ScriptedDetector::new(script),
            Box::new(ByteTracker::default()),
            Box::new(RecordingWriter::default()),
        );
        let doc = uc.execute(input.path(), Path::new("out.json")).unwrap();

        for record in &doc.frames {
            assert_eq!(record.detections.tracker_id, vec![1]);
        }
    }

    #[test]
    fn test_second_execute_fails() {
        let input = existing_input();
        let mut uc = use_case(
            StubReader::new(10, 10, Some(30.0), Some(1), 1),
            ScriptedDetector::new(vec![]),
            Box::new(PassthroughTracker),
            Box::new(RecordingWriter::default()),
        );
        uc.execute(input.path(), Path::new("out.json")).unwrap();
        let err = uc.execute(input.path(), Path::new("out.json")).unwrap_err();
        assert!(matches!(err, ExportError::AlreadyExecuted));
    }

    #[test]
    fn test_writes_json_file() {
        let input = existing_input();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("detections.json");

        let mut uc = use_case(
            StubReader::new(10, 20, Some(30.0), Some(1), 1),
            ScriptedDetector::new(vec![Ok(person([1.0, 2.0, 9.0, 18.0], 0.5))]),
            Box::new(PassthroughTracker),
            Box::new(JsonDocumentWriter::new()),
        );
        let doc = uc.execute(input.path(), &output).unwrap();

        let parsed: OutputDocument =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(parsed, doc);
        assert!(parsed.model_info.tracking_enabled);
    }
}
