use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_artifact_bytes: default_max_artifact_bytes(),
        }
    }
}

fn default_max_artifact_bytes() -> usize {
    crate::artifact::MAX_ARTIFACT_BYTES
}

#[derive(Debug, Deserialize, Clone)]
pub struct PdfConfig {
    /// Ceiling on document decode; past it the extractor falls back to the
    /// synthetic metadata summary.
    #[serde(default = "default_decode_timeout_secs")]
    pub decode_timeout_secs: u64,
    /// Pages read per document; bounds cost on huge reports.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Per-page character cap; excess is truncated with an explicit marker.
    #[serde(default = "default_page_char_cap")]
    pub page_char_cap: usize,
    /// Leading pages scanned for heading/TOC candidates.
    #[serde(default = "default_heading_scan_pages")]
    pub heading_scan_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            decode_timeout_secs: default_decode_timeout_secs(),
            max_pages: default_max_pages(),
            page_char_cap: default_page_char_cap(),
            heading_scan_pages: default_heading_scan_pages(),
        }
    }
}

fn default_decode_timeout_secs() -> u64 {
    5
}
fn default_max_pages() -> usize {
    15
}
fn default_page_char_cap() -> usize {
    2000
}
fn default_heading_scan_pages() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    /// OCR binary; resolved via PATH unless absolute.
    #[serde(default = "default_ocr_binary")]
    pub binary: String,
    #[serde(default = "default_ocr_language")]
    pub language: String,
    /// Fraction of numeric/percent tokens above which the first pass is
    /// treated as chart-like and a second enhanced pass runs.
    #[serde(default = "default_numeric_density_threshold")]
    pub numeric_density_threshold: f64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: default_ocr_binary(),
            language: default_ocr_language(),
            numeric_density_threshold: default_numeric_density_threshold(),
        }
    }
}

fn default_ocr_binary() -> String {
    "tesseract".to_string()
}
fn default_ocr_language() -> String {
    "eng".to_string()
}
fn default_numeric_density_threshold() -> f64 {
    0.15
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    /// `disabled` or `openai`.
    #[serde(default = "default_enrichment_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_enrichment_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            provider: default_enrichment_provider(),
            model: None,
            timeout_secs: default_enrichment_timeout_secs(),
        }
    }
}

fn default_enrichment_provider() -> String {
    "disabled".to_string()
}
fn default_enrichment_timeout_secs() -> u64 {
    20
}

impl EnrichmentConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7410".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config at `path`, or defaults when the file does not exist.
/// `audit analyze` must work without any configuration on disk.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.limits.max_artifact_bytes == 0 {
        anyhow::bail!("limits.max_artifact_bytes must be > 0");
    }
    if config.pdf.max_pages == 0 {
        anyhow::bail!("pdf.max_pages must be > 0");
    }
    if config.pdf.page_char_cap == 0 {
        anyhow::bail!("pdf.page_char_cap must be > 0");
    }
    if config.pdf.decode_timeout_secs == 0 {
        anyhow::bail!("pdf.decode_timeout_secs must be > 0");
    }
    if !(0.0..=1.0).contains(&config.ocr.numeric_density_threshold) {
        anyhow::bail!("ocr.numeric_density_threshold must be in [0.0, 1.0]");
    }
    if config.enrichment.is_enabled() && config.enrichment.model.is_none() {
        anyhow::bail!(
            "enrichment.model must be specified when provider is '{}'",
            config.enrichment.provider
        );
    }
    match config.enrichment.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown enrichment provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.pdf.max_pages, 15);
        assert_eq!(config.pdf.decode_timeout_secs, 5);
        assert!(!config.enrichment.is_enabled());
    }

    #[test]
    fn empty_toml_parses_with_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.ocr.binary, "tesseract");
        assert_eq!(config.limits.max_artifact_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn zero_page_cap_rejected() {
        let config: Config = toml::from_str("[pdf]\nmax_pages = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let config: Config =
            toml::from_str("[enrichment]\nprovider = \"oracle\"\nmodel = \"m\"\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn enabled_provider_requires_model() {
        let config: Config = toml::from_str("[enrichment]\nprovider = \"openai\"\n").unwrap();
        assert!(validate(&config).is_err());
    }
}
