//! Pipeline progress reporting.
//!
//! The orchestrator publishes a [`PipelineProgress`] value on every stage
//! transition; reporters render it for a caller-side display. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.
//!
//! At-least-once delivery per transition is sufficient; there is no
//! acknowledgment. [`ProgressTracker`] wraps a reporter and clamps percents
//! so observed progress never moves backwards within a run.

use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::models::{PipelineProgress, Stage};

/// Consumes progress updates. Implementations write to stderr (human or
/// JSON) or drop them.
pub trait ProgressReporter: Send + Sync {
    /// Emit one progress update. Called from the pipeline between stages.
    fn report(&self, progress: &PipelineProgress);
}

/// Human-friendly progress on stderr: `analyze  extracting   34%  Reading page 3 of 7`.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, progress: &PipelineProgress) {
        let line = format!(
            "analyze  {:<11} {:>3}%  {}\n",
            progress.stage.to_string(),
            progress.percent,
            progress.message
        );
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, progress: &PipelineProgress) {
        let obj = serde_json::json!({
            "event": "progress",
            "stage": progress.stage,
            "percent": progress.percent,
            "message": progress.message,
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _progress: &PipelineProgress) {}
}

/// Wraps a reporter and enforces the monotonic-percent guarantee: a report
/// with a lower percent than a previous one is raised to the high-water mark
/// before delivery.
pub struct ProgressTracker<'a> {
    inner: &'a dyn ProgressReporter,
    high_water: AtomicU8,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(inner: &'a dyn ProgressReporter) -> Self {
        Self {
            inner,
            high_water: AtomicU8::new(0),
        }
    }

    pub fn report(&self, stage: Stage, percent: u8, message: impl Into<String>) {
        let percent = percent.min(100);
        let clamped = self.high_water.fetch_max(percent, Ordering::Relaxed).max(percent);
        self.inner.report(&PipelineProgress {
            stage,
            percent: clamped,
            message: message.into(),
        });
    }

    /// Highest percent reported so far.
    pub fn percent(&self) -> u8 {
        self.high_water.load(Ordering::Relaxed)
    }
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it to the pipeline.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Capture(Mutex<Vec<PipelineProgress>>);

    impl ProgressReporter for Capture {
        fn report(&self, progress: &PipelineProgress) {
            self.0.lock().unwrap().push(progress.clone());
        }
    }

    #[test]
    fn tracker_never_goes_backwards() {
        let capture = Capture(Mutex::new(Vec::new()));
        let tracker = ProgressTracker::new(&capture);
        tracker.report(Stage::Classifying, 10, "a");
        tracker.report(Stage::Extracting, 60, "b");
        tracker.report(Stage::Extracting, 40, "c");
        tracker.report(Stage::Analyzing, 70, "d");

        let seen = capture.0.lock().unwrap();
        let percents: Vec<u8> = seen.iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![10, 60, 60, 70]);
    }

    #[test]
    fn tracker_caps_at_100() {
        let capture = Capture(Mutex::new(Vec::new()));
        let tracker = ProgressTracker::new(&capture);
        tracker.report(Stage::Complete, 250, "done");
        assert_eq!(tracker.percent(), 100);
    }
}
