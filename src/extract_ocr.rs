//! Raster-image OCR extraction.
//!
//! Two-pass design: a first recognition pass over the raw image, then, when
//! the first pass looks like it contains a chart, graph, or table, a second
//! pass over a contrast-enhanced binarized copy. Both outputs are merged
//! with an explicit marker so callers can see enhanced recognition ran.
//!
//! Engine failure is terminal for this path — there is no metadata fallback
//! because a raw image carries no structural metadata — so the error
//! propagates to the caller with a human-readable message.
//!
//! The engine itself sits behind [`OcrEngine`] so the Tesseract CLI default
//! can be swapped for another backend (or a mock in tests).

use std::io::Write;
use std::process::Stdio;

use async_trait::async_trait;
use image::GenericImageView;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::artifact::SourceArtifact;
use crate::config::OcrConfig;
use crate::error::PipelineError;
use crate::models::{ExtractionResult, Stage};
use crate::progress::ProgressTracker;

/// Marker inserted between the raw-pass and enhanced-pass outputs.
pub const ENHANCED_PASS_MARKER: &str = "[enhanced recognition applied]";

/// Vocabulary whose presence in first-pass text suggests visualization
/// content worth a second, enhanced pass.
const VISUALIZATION_VOCAB: &[&str] = &[
    "chart", "graph", "axis", "axes", "trend", "distribution", "plot", "histogram", "legend",
    "table", "bar", "pie",
];

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep",
    "oct", "nov", "dec",
];

static NUMERIC_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d,.]+%?$").unwrap());

/// Optical character recognition backend.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine identifier for messages ("tesseract", "mock", ...).
    fn name(&self) -> &str;

    /// Recognize text in an encoded image. An `Err` here is terminal for
    /// the raster extraction path.
    async fn recognize(&self, image_bytes: &[u8]) -> anyhow::Result<String>;
}

/// Default engine: shells out to the Tesseract CLI with the image written
/// to a temp file, reading recognized text from stdout.
pub struct TesseractEngine {
    binary: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            language: config.language.clone(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image_bytes: &[u8]) -> anyhow::Result<String> {
        let mut tmp = tempfile::NamedTempFile::new()?;
        tmp.write_all(image_bytes)?;
        tmp.flush()?;

        let output = tokio::process::Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extract text from a raster image via one or two OCR passes.
pub async fn extract(
    artifact: &SourceArtifact,
    config: &OcrConfig,
    engine: &dyn OcrEngine,
    progress: &ProgressTracker<'_>,
    percent_from: u8,
    percent_to: u8,
) -> Result<ExtractionResult, PipelineError> {
    let midpoint = percent_from + (percent_to - percent_from) / 2;

    progress.report(
        Stage::Extracting,
        percent_from,
        format!("Recognizing text ({})", engine.name()),
    );
    let first_pass = engine
        .recognize(&artifact.bytes)
        .await
        .map_err(|e| PipelineError::OcrFailure(e.to_string()))?;
    progress.report(Stage::Extracting, midpoint, "First recognition pass done");

    let mut warnings = Vec::new();

    if !has_visualization_indicators(&first_pass, config.numeric_density_threshold) {
        progress.report(Stage::Extracting, percent_to, "Recognition complete");
        let (text, is_synthetic) = placeholder_if_empty(first_pass, artifact, &mut warnings);
        return Ok(ExtractionResult {
            text,
            page_count: 1,
            warnings,
            is_synthetic,
        });
    }

    // Chart-like content: binarize and run the engine again.
    progress.report(
        Stage::Extracting,
        midpoint,
        "Chart content detected, running enhanced pass",
    );
    let text = match enhance_contrast(&artifact.bytes) {
        Ok(enhanced) => {
            let second_pass = engine
                .recognize(&enhanced)
                .await
                .map_err(|e| PipelineError::OcrFailure(e.to_string()))?;
            format!(
                "{}\n\n{}\n{}",
                first_pass.trim(),
                ENHANCED_PASS_MARKER,
                second_pass.trim()
            )
        }
        Err(e) => {
            // Enhancement is best-effort; the first pass already succeeded.
            warnings.push(format!("contrast enhancement skipped: {}", e));
            first_pass
        }
    };
    progress.report(Stage::Extracting, percent_to, "Enhanced recognition done");

    let (text, is_synthetic) = placeholder_if_empty(text, artifact, &mut warnings);
    Ok(ExtractionResult {
        text,
        page_count: 1,
        warnings,
        is_synthetic,
    })
}

/// OCR can legitimately return nothing for a blank image; keep the
/// never-empty-text contract with a minimal placeholder. The placeholder is
/// synthesized from metadata, so it is flagged as synthetic.
fn placeholder_if_empty(
    text: String,
    artifact: &SourceArtifact,
    warnings: &mut Vec<String>,
) -> (String, bool) {
    if text.trim().is_empty() {
        warnings.push("no text recognized in image".to_string());
        let placeholder = format!(
            "Image \"{}\" ({} bytes): no readable text was recognized.",
            artifact.name,
            artifact.byte_size()
        );
        (placeholder, true)
    } else {
        (text, false)
    }
}

/// Decide whether first-pass text suggests a chart/graph/table: known
/// visualization vocabulary, a numeric token density above the threshold,
/// or month names implying a time series.
pub fn has_visualization_indicators(text: &str, numeric_density_threshold: f64) -> bool {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    if tokens.is_empty() {
        return false;
    }

    let has_vocab = tokens.iter().any(|tok| {
        let tok = tok.trim_matches(|c: char| !c.is_alphanumeric());
        VISUALIZATION_VOCAB.contains(&tok)
    });
    if has_vocab {
        return true;
    }

    let has_months = tokens.iter().any(|tok| {
        let tok = tok.trim_matches(|c: char| !c.is_alphanumeric());
        MONTHS.contains(&tok)
    });
    if has_months {
        return true;
    }

    let numeric = tokens
        .iter()
        .filter(|tok| NUMERIC_TOKEN.is_match(tok.trim_matches(|c: char| c == '(' || c == ')')))
        .count();
    numeric as f64 / tokens.len() as f64 > numeric_density_threshold
}

/// Grayscale the image and binarize each pixel against the mean luminance,
/// re-encoding as PNG for the second pass.
fn enhance_contrast(image_bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(image_bytes)?;
    let gray = img.to_luma8();

    let (width, height) = img.dimensions();
    let total: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    let pixel_count = (width as u64 * height as u64).max(1);
    let threshold = (total / pixel_count) as u8;

    let mut binarized = gray;
    for pixel in binarized.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
    }

    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(binarized).write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}
