//! Pipeline orchestration.
//!
//! Drives the run as a strict sequence of awaited stages:
//! classify → extract → analyze → score → (optionally) enrich, publishing a
//! progress update on every transition and assembling the final
//! [`AnalysisOutcome`]. Each stage's output is fully materialized before the
//! next begins; there is no overlap, which keeps progress monotonic and lets
//! each suspension point be bounded on its own.
//!
//! Failure policy: only an unsupported media type (while classifying) and an
//! OCR engine failure (while extracting an image) cross this boundary as
//! errors. The document path cannot fail — its metadata fallback always
//! produces text — and enrichment fails closed to a canned narrative.
//!
//! A `Pipeline` holds no per-run state: every call to [`Pipeline::run`]
//! starts fresh, so re-running after a new upload never merges with a prior
//! run's results.

use chrono::Utc;
use uuid::Uuid;

use crate::analyze;
use crate::artifact::{classify, ArtifactKind, SourceArtifact};
use crate::config::Config;
use crate::enrich::{self, InsightBackend};
use crate::error::PipelineError;
use crate::extract_ocr::{self, OcrEngine, TesseractEngine};
use crate::extract_pdf;
use crate::models::{AnalysisOutcome, Stage};
use crate::progress::{ProgressReporter, ProgressTracker};
use crate::score;

/// Percent milestones for each stage transition. Extraction owns the widest
/// share because it dominates wall-clock time.
const PCT_CLASSIFYING: u8 = 5;
const PCT_EXTRACT_START: u8 = 10;
const PCT_EXTRACT_END: u8 = 60;
const PCT_ANALYZING: u8 = 70;
const PCT_SCORING: u8 = 80;
const PCT_ENRICHING: u8 = 90;
const PCT_COMPLETE: u8 = 100;

/// A configured analysis pipeline with swappable extraction and enrichment
/// backends. Construct once, run many times; runs share nothing.
pub struct Pipeline {
    config: Config,
    ocr: Box<dyn OcrEngine>,
    insight: Box<dyn InsightBackend>,
}

impl Pipeline {
    /// Pipeline with the default engines for the given config: Tesseract CLI
    /// for OCR and the configured enrichment provider.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let ocr: Box<dyn OcrEngine> = Box::new(TesseractEngine::new(&config.ocr));
        let insight = enrich::create_backend(&config.enrichment)?;
        Ok(Self {
            config,
            ocr,
            insight,
        })
    }

    /// Pipeline with caller-supplied engines. This is the seam tests and
    /// embedders use to substitute OCR or inference backends.
    pub fn with_engines(
        config: Config,
        ocr: Box<dyn OcrEngine>,
        insight: Box<dyn InsightBackend>,
    ) -> Self {
        Self {
            config,
            ocr,
            insight,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full pipeline over one artifact.
    pub async fn run(
        &self,
        artifact: &SourceArtifact,
        reporter: &dyn ProgressReporter,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let progress = ProgressTracker::new(reporter);
        let run_id = Uuid::new_v4().to_string();

        progress.report(
            Stage::Classifying,
            PCT_CLASSIFYING,
            format!("Classifying \"{}\"", artifact.name),
        );
        let kind = match classify(artifact) {
            Ok(kind) => kind,
            Err(e) => {
                progress.report(Stage::Failed, PCT_CLASSIFYING, e.to_string());
                return Err(e);
            }
        };

        let extraction = match kind {
            ArtifactKind::PaginatedDocument => {
                progress.report(
                    Stage::Extracting,
                    PCT_EXTRACT_START,
                    "Extracting document text",
                );
                extract_pdf::extract(
                    artifact,
                    &self.config.pdf,
                    &progress,
                    PCT_EXTRACT_START,
                    PCT_EXTRACT_END,
                )
                .await
            }
            ArtifactKind::RasterImage => {
                progress.report(
                    Stage::Extracting,
                    PCT_EXTRACT_START,
                    "Recognizing image text",
                );
                match extract_ocr::extract(
                    artifact,
                    &self.config.ocr,
                    self.ocr.as_ref(),
                    &progress,
                    PCT_EXTRACT_START,
                    PCT_EXTRACT_END,
                )
                .await
                {
                    Ok(extraction) => extraction,
                    Err(e) => {
                        progress.report(Stage::Failed, progress.percent(), e.to_string());
                        return Err(e);
                    }
                }
            }
        };

        progress.report(Stage::Analyzing, PCT_ANALYZING, "Analyzing content");
        let signals = analyze::analyze(&extraction.text);

        progress.report(Stage::Scoring, PCT_SCORING, "Scoring document");
        let summary = score::score(&signals, &extraction.text);

        let insight = if enrich::should_enrich(&signals) {
            progress.report(Stage::Enriching, PCT_ENRICHING, "Generating insight");
            Some(enrich::enrich(self.insight.as_ref(), &signals, &summary, &extraction.text).await)
        } else {
            None
        };

        progress.report(
            Stage::Complete,
            PCT_COMPLETE,
            format!("Analysis complete: score {}", summary.score),
        );

        Ok(AnalysisOutcome {
            run_id,
            artifact_name: artifact.name.clone(),
            media_type: artifact.media_type.clone(),
            artifact_digest: artifact.digest(),
            extraction,
            signals,
            summary,
            insight,
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{MIME_PDF, MIME_PNG};
    use crate::models::PipelineProgress;
    use crate::progress::NoProgress;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockOcr(Result<String, String>);

    #[async_trait]
    impl OcrEngine for MockOcr {
        fn name(&self) -> &str {
            "mock"
        }
        async fn recognize(&self, _image: &[u8]) -> anyhow::Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(msg) => bail!("{}", msg),
            }
        }
    }

    struct FailingInsight;

    #[async_trait]
    impl crate::enrich::InsightBackend for FailingInsight {
        fn name(&self) -> &str {
            "failing"
        }
        async fn narrate(
            &self,
            _signals: &crate::models::ContentSignals,
            _text: &str,
        ) -> anyhow::Result<String> {
            bail!("simulated timeout")
        }
    }

    fn pipeline_with(ocr: MockOcr) -> Pipeline {
        Pipeline::with_engines(Config::default(), Box::new(ocr), Box::new(FailingInsight))
    }

    struct Capture(Mutex<Vec<PipelineProgress>>);

    impl ProgressReporter for Capture {
        fn report(&self, progress: &PipelineProgress) {
            self.0.lock().unwrap().push(progress.clone());
        }
    }

    #[tokio::test]
    async fn unsupported_type_fails_before_extraction() {
        let pipeline = pipeline_with(MockOcr(Ok(String::new())));
        let artifact = SourceArtifact::new("report.csv", "text/csv", vec![1]);
        let err = pipeline.run(&artifact, &NoProgress).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedType(_)));
    }

    #[tokio::test]
    async fn ocr_failure_is_terminal_on_image_path() {
        let pipeline = pipeline_with(MockOcr(Err("engine crashed".to_string())));
        let artifact = SourceArtifact::new("shot.png", MIME_PNG, vec![1, 2, 3]);
        let err = pipeline.run(&artifact, &NoProgress).await.unwrap_err();
        assert!(matches!(err, PipelineError::OcrFailure(_)));
    }

    #[tokio::test]
    async fn zero_byte_document_still_completes() {
        let pipeline = pipeline_with(MockOcr(Ok(String::new())));
        let artifact = SourceArtifact::new("empty-2024.pdf", MIME_PDF, Vec::new());
        let outcome = pipeline.run(&artifact, &NoProgress).await.unwrap();
        assert!(outcome.extraction.is_synthetic);
        assert!(!outcome.extraction.text.is_empty());
        assert!(outcome.summary.score >= 50 && outcome.summary.score <= 95);
        assert!(outcome.summary.recommendations.len() >= 3);
    }

    #[tokio::test]
    async fn enrichment_failure_never_propagates() {
        // Synthetic summary text is sparse, so enrichment runs and fails.
        let pipeline = pipeline_with(MockOcr(Ok(String::new())));
        let artifact = SourceArtifact::new("empty.pdf", MIME_PDF, Vec::new());
        let outcome = pipeline.run(&artifact, &NoProgress).await.unwrap();
        let insight = outcome.insight.expect("sparse signals should enrich");
        assert!(!insight.is_ai_generated);
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_reaches_complete() {
        let pipeline = pipeline_with(MockOcr(Ok(String::new())));
        let artifact = SourceArtifact::new("empty.pdf", MIME_PDF, Vec::new());
        let capture = Capture(Mutex::new(Vec::new()));
        pipeline.run(&artifact, &capture).await.unwrap();

        let seen = capture.0.lock().unwrap();
        assert!(!seen.is_empty());
        let mut last = 0u8;
        for p in seen.iter() {
            assert!(p.percent >= last, "progress went backwards");
            last = p.percent;
        }
        assert_eq!(seen.last().unwrap().stage, Stage::Complete);
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn chart_text_triggers_enhanced_pass_markers() {
        // First OCR pass mentions a chart, so the pipeline asks for a second
        // pass; the mock returns the same text and enhancement of the fake
        // image bytes fails, which is absorbed as a warning.
        let pipeline = pipeline_with(MockOcr(Ok(
            "bar chart shows 42% growth through March 2024".to_string()
        )));
        let artifact = SourceArtifact::new("chart.png", MIME_PNG, vec![0u8; 16]);
        let outcome = pipeline.run(&artifact, &NoProgress).await.unwrap();
        assert!(outcome.signals.has_chart_indicators);
        assert!(outcome.signals.has_time_series);
        assert!(outcome
            .extraction
            .warnings
            .iter()
            .any(|w| w.contains("contrast enhancement skipped")));
    }

    #[tokio::test]
    async fn blank_image_placeholder_is_marked_synthetic() {
        let pipeline = pipeline_with(MockOcr(Ok(String::new())));
        let artifact = SourceArtifact::new("blank.png", MIME_PNG, vec![1, 2, 3]);
        let outcome = pipeline.run(&artifact, &NoProgress).await.unwrap();
        assert!(outcome.extraction.text.contains("no readable text"));
        assert!(outcome.extraction.is_synthetic);
        assert!(outcome
            .extraction
            .warnings
            .iter()
            .any(|w| w.contains("no text recognized")));
    }

    #[tokio::test]
    async fn runs_do_not_share_state() {
        let pipeline = pipeline_with(MockOcr(Ok(String::new())));
        let artifact = SourceArtifact::new("empty.pdf", MIME_PDF, Vec::new());
        let a = pipeline.run(&artifact, &NoProgress).await.unwrap();
        let b = pipeline.run(&artifact, &NoProgress).await.unwrap();
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.summary, b.summary);
    }
}
