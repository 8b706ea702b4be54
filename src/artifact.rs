//! Uploaded artifacts and media-type classification.
//!
//! An artifact is an opaque byte buffer with a declared media type; the
//! classifier routes it to the paginated-document or raster-image extraction
//! path and rejects everything else. Classification has no side effects.

use sha2::{Digest, Sha256};

use crate::error::PipelineError;

/// Supported media types. One paginated-document type, several raster types.
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_WEBP: &str = "image/webp";
pub const MIME_BMP: &str = "image/bmp";
pub const MIME_TIFF: &str = "image/tiff";

/// Byte ceiling enforced at the input boundary (CLI/server), not inside the
/// pipeline itself.
pub const MAX_ARTIFACT_BYTES: usize = 10 * 1024 * 1024;

/// An uploaded byte payload awaiting analysis. Immutable once accepted.
#[derive(Debug, Clone)]
pub struct SourceArtifact {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SourceArtifact {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Hex-encoded SHA-256 of the payload, for caller-side dedup.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// Extraction route chosen by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    PaginatedDocument,
    RasterImage,
}

/// Route an artifact by declared media type.
///
/// `UnsupportedType` and `MissingMediaType` are terminal: they are surfaced
/// verbatim to the caller and no extractor runs.
pub fn classify(artifact: &SourceArtifact) -> Result<ArtifactKind, PipelineError> {
    let media_type = artifact.media_type.trim();
    if media_type.is_empty() {
        return Err(PipelineError::MissingMediaType);
    }
    match media_type {
        MIME_PDF => Ok(ArtifactKind::PaginatedDocument),
        MIME_PNG | MIME_JPEG | MIME_WEBP | MIME_BMP | MIME_TIFF => Ok(ArtifactKind::RasterImage),
        other => Err(PipelineError::UnsupportedType(other.to_string())),
    }
}

/// Guess a media type from a file extension. Used by the CLI when the caller
/// does not declare one; unknown extensions map to `None` so classification
/// still fails loudly.
pub fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some(MIME_PDF),
        "png" => Some(MIME_PNG),
        "jpg" | "jpeg" => Some(MIME_JPEG),
        "webp" => Some(MIME_WEBP),
        "bmp" => Some(MIME_BMP),
        "tif" | "tiff" => Some(MIME_TIFF),
        _ => None,
    }
}
