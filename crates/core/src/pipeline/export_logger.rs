use std::collections::HashMap;
use std::time::Instant;

use crate::shared::constants::PROGRESS_INTERVAL_FRAMES;

/// Observer for export run events.
///
/// Keeps the use case free of any particular output mechanism.
pub trait ExportLogger: Send {
    /// Called once per processed frame with the number of detections kept.
    fn progress(&mut self, frame_index: usize, total: Option<usize>, detections: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullExportLogger;

impl ExportLogger for NullExportLogger {
    fn progress(&mut self, _frame_index: usize, _total: Option<usize>, _detections: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Routes events to the `log` facade.
///
/// Progress lines are emitted only for frame indices divisible by
/// `interval`; per-stage timings are aggregated for the summary.
pub struct LogExportLogger {
    interval: usize,
    timings: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames_seen: usize,
    detections_seen: usize,
    reported: Vec<String>,
}

impl LogExportLogger {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            timings: HashMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
            detections_seen: 0,
            reported: Vec::new(),
        }
    }

    /// Progress lines that passed the throttle, in emission order.
    pub fn reported(&self) -> &[String] {
        &self.reported
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    /// Formatted summary, or `None` before any frame was processed.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames_seen == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Export summary ({} frames, {} detections, {:.1}s total):",
            self.frames_seen,
            self.detections_seen,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        if elapsed_ms > 0.0 {
            let fps = self.frames_seen as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }
}

impl Default for LogExportLogger {
    fn default() -> Self {
        Self::new(PROGRESS_INTERVAL_FRAMES)
    }
}

impl ExportLogger for LogExportLogger {
    fn progress(&mut self, frame_index: usize, total: Option<usize>, detections: usize) {
        self.frames_seen += 1;
        self.detections_seen += detections;
        if frame_index % self.interval != 0 {
            return;
        }
        let total = total.map_or_else(|| "unknown".to_string(), |t| t.to_string());
        let line = format!("Processed frame {frame_index}/{total} - {detections} detections");
        log::info!("{line}");
        self.reported.push(line);
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
