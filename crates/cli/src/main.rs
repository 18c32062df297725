use std::path::PathBuf;
use std::process;

use clap::Parser;

use persontrack_core::detection::domain::object_detector::ObjectDetector;
use persontrack_core::detection::domain::object_tracker::ObjectTracker;
use persontrack_core::detection::infrastructure::bytetrack_tracker::ByteTracker;
use persontrack_core::detection::infrastructure::model_resolver::{self, ModelRequest};
use persontrack_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_CONFIDENCE,
};
use persontrack_core::detection::infrastructure::passthrough_tracker::PassthroughTracker;
use persontrack_core::export::domain::detection_document::ModelInfo;
use persontrack_core::export::infrastructure::json_document_writer::JsonDocumentWriter;
use persontrack_core::pipeline::export_detections_use_case::{ExportDetectionsUseCase, ExportError};
use persontrack_core::pipeline::export_logger::LogExportLogger;
use persontrack_core::shared::constants::{
    BUNDLED_MODEL_DIR, DEFAULT_OUTPUT_PATH, DEFAULT_VIDEO_PATH, PERSON_CLASS_ID, YOLO_MODEL_NAME,
};
use persontrack_core::video::infrastructure::ffmpeg_reader::FfmpegReader;

/// Export per-frame person detections with track ids from a video to JSON.
#[derive(Parser, Debug)]
#[command(name = "persontrack")]
struct Cli {
    /// Input video file.
    #[arg(default_value = DEFAULT_VIDEO_PATH)]
    input: PathBuf,

    /// Output JSON file (overwritten if present).
    #[arg(default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Use this ONNX model instead of searching the cache and bundled dirs.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Download the model from this URL if it is not found locally.
    #[arg(long)]
    model_url: Option<String>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Skip tracking; tracker ids become per-frame positions.
    #[arg(long)]
    no_tracking: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let detector = build_detector(&cli)?;
    let tracker: Box<dyn ObjectTracker> = if cli.no_tracking {
        Box::new(PassthroughTracker)
    } else {
        Box::new(ByteTracker::default())
    };

    let mut use_case = ExportDetectionsUseCase::new(
        Box::new(FfmpegReader::new()),
        detector,
        tracker,
        Box::new(JsonDocumentWriter::new()),
        ModelInfo::person_detector(!cli.no_tracking),
        PERSON_CLASS_ID,
        Box::new(LogExportLogger::default()),
    );
    let document = use_case.execute(&cli.input, &cli.output)?;

    let detections: usize = document.frames.iter().map(|f| f.detections.len()).sum();
    log::info!(
        "Exported {} frames ({detections} detections) to {}",
        document.frames.len(),
        cli.output.display()
    );
    Ok(())
}

fn build_detector(cli: &Cli) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let bundled = PathBuf::from(BUNDLED_MODEL_DIR);
    let request = ModelRequest {
        name: YOLO_MODEL_NAME,
        explicit_path: cli.model.as_deref(),
        bundled_dir: Some(&bundled),
        url: cli.model_url.as_deref(),
    };
    let model_path = model_resolver::resolve(&request, Some(Box::new(download_progress)))?;
    log::info!("Loading model from {}", model_path.display());

    Ok(Box::new(OnnxYoloDetector::new(&model_path, cli.confidence)?))
}

/// Checked before the model is loaded so a bad path fails fast.
fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.is_file() {
        return Err(ExportError::InputNotFound(cli.input.clone()).into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading person detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading person detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_use_default_paths() {
        let cli = Cli::try_parse_from(["persontrack"]).unwrap();
        assert_eq!(cli.input, PathBuf::from(DEFAULT_VIDEO_PATH));
        assert_eq!(cli.output, PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert!((cli.confidence - 0.25).abs() < f64::EPSILON);
        assert!(!cli.no_tracking);
        assert!(cli.model.is_none());
    }

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from([
            "persontrack",
            "in.mp4",
            "out.json",
            "--confidence",
            "0.5",
            "--no-tracking",
            "--model",
            "m.onnx",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("in.mp4"));
        assert_eq!(cli.output, PathBuf::from("out.json"));
        assert!((cli.confidence - 0.5).abs() < f64::EPSILON);
        assert!(cli.no_tracking);
        assert_eq!(cli.model, Some(PathBuf::from("m.onnx")));
    }

    #[test]
    fn test_validate_rejects_missing_input() {
        let cli = Cli::try_parse_from(["persontrack", "/nonexistent/video.mp4"]).unwrap();
        let err = validate(&cli).unwrap_err();
        assert!(err.to_string().contains("Video file not found"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let input = std::env::current_exe().unwrap();
        let cli = Cli {
            input,
            output: PathBuf::from("out.json"),
            model: None,
            model_url: None,
            confidence: 1.5,
            no_tracking: false,
        };
        assert!(validate(&cli).unwrap_err().to_string().contains("Confidence"));
    }
}
