//! Core data types that flow through the analysis pipeline.
//!
//! Each stage consumes the previous stage's output and produces exactly one
//! of these values; the orchestrator owns them for the duration of a run and
//! hands the final [`AnalysisOutcome`] to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text extracted from an artifact by whichever extractor ran.
///
/// `text` is never empty: both extractors substitute a metadata-derived
/// placeholder (marked via `is_synthetic`) rather than returning nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub page_count: usize,
    pub warnings: Vec<String>,
    /// True when `text` was synthesized from artifact metadata instead of
    /// real extraction (decode failure, timeout, zero readable pages, or an
    /// image with no recognizable text).
    pub is_synthetic: bool,
}

/// Metric strings detected in extracted text, grouped by category.
///
/// Each list is capped so a metric-dense document cannot blow up the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricMatches {
    pub percentages: Vec<String>,
    pub rankings: Vec<String>,
    pub traffic: Vec<String>,
    pub engagement_times: Vec<String>,
}

impl MetricMatches {
    /// Number of categories with at least one match.
    pub fn categories_present(&self) -> usize {
        [
            &self.percentages,
            &self.rankings,
            &self.traffic,
            &self.engagement_times,
        ]
        .iter()
        .filter(|v| !v.is_empty())
        .count()
    }

    pub fn total(&self) -> usize {
        self.percentages.len()
            + self.rankings.len()
            + self.traffic.len()
            + self.engagement_times.len()
    }
}

/// Content-domain flags. Domains are not mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainFlags {
    pub financial: bool,
    pub marketing: bool,
    pub search: bool,
    pub social: bool,
}

impl DomainFlags {
    pub fn any(&self) -> bool {
        self.financial || self.marketing || self.search || self.social
    }

    pub fn count(&self) -> usize {
        [self.financial, self.marketing, self.search, self.social]
            .iter()
            .filter(|b| **b)
            .count()
    }
}

/// Overall direction inferred from sentiment tokens around detected metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Positive,
    Negative,
    Mixed,
    Neutral,
}

/// Read-only signals derived from extracted text by the heuristic analyzer.
///
/// Deterministic for a given input text: keyword ordering, counts, and match
/// lists are byte-for-byte reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSignals {
    /// Top keywords by frequency, most frequent first; ties keep
    /// first-occurrence order.
    pub keywords: Vec<(String, usize)>,
    pub metrics: MetricMatches,
    pub domains: DomainFlags,
    pub trend: TrendDirection,
    pub has_chart_indicators: bool,
    pub has_time_series: bool,
    /// Whitespace token count of the analyzed text.
    pub word_count: usize,
}

/// Qualitative rating for one scored dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Good,
    Fair,
    Poor,
    Missing,
}

/// Counts of structural elements recognized in the raw text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCounts {
    pub meta: usize,
    pub headings: usize,
    pub links: usize,
    pub images: usize,
}

/// Per-dimension qualitative ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRatings {
    pub title: Rating,
    pub headings: Rating,
    pub links: Rating,
    pub alt_text: Rating,
    pub metadata: Rating,
}

/// The externally visible analysis result.
///
/// Derived solely from [`ContentSignals`] and the raw text; identical inputs
/// produce identical summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Overall quality score, clamped to [50, 95] by policy.
    pub score: u8,
    pub element_counts: ElementCounts,
    pub ratings: DimensionRatings,
    /// Between 3 and 5 entries, most specific first.
    pub recommendations: Vec<String>,
    /// Top keywords with frequencies, mirrored from the signals.
    pub keyword_stats: Vec<(String, usize)>,
    /// Top-keyword frequency as a percentage of the word count, one decimal.
    pub keyword_density: f64,
}

/// Optional prose narration layered on top of the heuristic findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedInsight {
    pub narrative: String,
    /// False when the narrative is the canned heuristic-only fallback.
    pub is_ai_generated: bool,
}

/// Pipeline stage. Strictly sequential; `Failed` is reachable only from
/// `Classifying` (unsupported type) and `Extracting` (raster OCR failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Idle,
    Classifying,
    Extracting,
    Analyzing,
    Scoring,
    Enriching,
    Complete,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Classifying => "classifying",
            Stage::Extracting => "extracting",
            Stage::Analyzing => "analyzing",
            Stage::Scoring => "scoring",
            Stage::Enriching => "enriching",
            Stage::Complete => "complete",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Transient progress state, overwritten on every stage transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProgress {
    pub stage: Stage,
    /// Monotonically non-decreasing within a run, 0..=100.
    pub percent: u8,
    pub message: String,
}

/// Terminal, caller-owned result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub run_id: String,
    pub artifact_name: String,
    pub media_type: String,
    /// SHA-256 digest of the artifact bytes, hex-encoded.
    pub artifact_digest: String,
    pub extraction: ExtractionResult,
    pub signals: ContentSignals,
    pub summary: AnalysisSummary,
    pub insight: Option<EnrichedInsight>,
    pub completed_at: DateTime<Utc>,
}
