//! Pipeline error taxonomy.
//!
//! Only two conditions cross the orchestrator boundary as rejections:
//! an unsupported (or missing) media type, and an OCR engine failure on the
//! raster path. Every other failure — decode timeout, per-page extraction
//! error, enrichment failure — is absorbed into warnings or fallbacks and
//! the run still completes.

/// Terminal pipeline error surfaced to the caller.
#[derive(Debug)]
pub enum PipelineError {
    /// The artifact carried no declared media type.
    MissingMediaType,
    /// The declared media type is outside the allow-list. The caller must
    /// re-upload a supported type; no extractor runs.
    UnsupportedType(String),
    /// The OCR engine failed on the raster path. Unlike the document path
    /// there is no metadata fallback for a raw image.
    OcrFailure(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::MissingMediaType => {
                write!(f, "artifact has no declared media type")
            }
            PipelineError::UnsupportedType(mt) => {
                write!(f, "unsupported media type: {}", mt)
            }
            PipelineError::OcrFailure(msg) => {
                write!(f, "image recognition failed: {}. Try a sharper image or a PDF export.", msg)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Machine-readable code for the HTTP error envelope.
impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::MissingMediaType => "missing_media_type",
            PipelineError::UnsupportedType(_) => "unsupported_type",
            PipelineError::OcrFailure(_) => "ocr_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offending_type() {
        let err = PipelineError::UnsupportedType("text/csv".to_string());
        assert!(err.to_string().contains("text/csv"));
    }

    #[test]
    fn ocr_failure_suggests_retry() {
        let err = PipelineError::OcrFailure("engine exited with status 1".to_string());
        assert!(err.to_string().contains("Try"));
    }
}
