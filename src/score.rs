//! Scoring and recommendation engine.
//!
//! Converts analyzer signals into a bounded score, per-dimension ratings,
//! and a prioritized recommendation list. Deterministic: identical signals
//! and text produce an identical summary.
//!
//! The score is clamped to [50, 95] by policy — "always moderately
//! confident, never absolute" — so a degraded extraction still yields a
//! usable result and a perfect-looking document never reads as certainty.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{
    AnalysisSummary, ContentSignals, DimensionRatings, ElementCounts, Rating, TrendDirection,
};

pub const SCORE_FLOOR: u8 = 50;
pub const SCORE_CEILING: u8 = 95;
const SCORE_BASELINE: i32 = 75;

const MIN_RECOMMENDATIONS: usize = 3;
const MAX_RECOMMENDATIONS: usize = 5;

/// Word-count bounds used by the score adjustments.
const THIN_CONTENT_WORDS: usize = 100;
const LIGHT_CONTENT_WORDS: usize = 300;
const RICH_CONTENT_WORDS: usize = 600;

/// Appended, in order, when fewer than three specific recommendations were
/// derived from the signals.
const GENERIC_RECOMMENDATIONS: &[&str] = &[
    "Add descriptive title tags and meta descriptions to every page covered by the report.",
    "Build internal links between related report sections and their landing pages.",
    "Compress images and add alt text to improve accessibility and image search.",
    "Set up monthly tracking so the next report can show trend lines.",
];

static HEADING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)*[.)]?\s+\S").unwrap());

/// Score the analyzed document. `raw_text` supplies the structural element
/// counts; everything else derives from the signals.
pub fn score(signals: &ContentSignals, raw_text: &str) -> AnalysisSummary {
    let element_counts = count_elements(raw_text);
    let score = compute_score(signals, &element_counts);
    let ratings = rate_dimensions(raw_text, &element_counts);
    let recommendations = build_recommendations(signals);

    let keyword_density = match signals.keywords.first() {
        Some((_, count)) if signals.word_count > 0 => {
            let pct = *count as f64 / signals.word_count as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        }
        _ => 0.0,
    };

    AnalysisSummary {
        score,
        element_counts,
        ratings,
        recommendations,
        keyword_stats: signals.keywords.clone(),
        keyword_density,
    }
}

/// Fixed additive adjustments over a baseline, clamped to the policy range.
fn compute_score(signals: &ContentSignals, elements: &ElementCounts) -> u8 {
    let mut score = SCORE_BASELINE;

    if signals.word_count < THIN_CONTENT_WORDS {
        score -= 10;
    } else if signals.word_count < LIGHT_CONTENT_WORDS {
        score -= 4;
    } else if signals.word_count > RICH_CONTENT_WORDS {
        score += 5;
    }

    score += 3 * signals.metrics.categories_present() as i32;

    if signals.has_chart_indicators {
        score += 4;
    }
    if signals.has_time_series {
        score += 2;
    }
    if signals.domains.count() >= 2 {
        score += 3;
    }

    score += match signals.trend {
        TrendDirection::Positive => 3,
        TrendDirection::Negative => -5,
        TrendDirection::Mixed => -1,
        TrendDirection::Neutral => 0,
    };

    if elements.headings >= 3 {
        score += 3;
    }
    if elements.links >= 3 {
        score += 2;
    }

    score.clamp(SCORE_FLOOR as i32, SCORE_CEILING as i32) as u8
}

fn count_elements(raw_text: &str) -> ElementCounts {
    let lowered = raw_text.to_lowercase();

    let meta = lowered.matches("meta description").count()
        + lowered.matches("meta title").count()
        + lowered.matches("og:").count()
        + lowered.matches("canonical").count();

    let headings = raw_text
        .lines()
        .filter(|line| is_heading_like(line.trim()))
        .count();

    let links = lowered.matches("http://").count()
        + lowered.matches("https://").count()
        + lowered.matches("www.").count();

    let images = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| matches!(*tok, "image" | "images" | "figure" | "img" | "screenshot"))
        .count();

    ElementCounts {
        meta,
        headings,
        links,
        images,
    }
}

/// A line counts as a heading when short and uppercase-dominant, or shaped
/// like a numbered section.
fn is_heading_like(line: &str) -> bool {
    if line.is_empty() || line.len() > 60 {
        return false;
    }
    if HEADING_LINE.is_match(line) {
        return true;
    }
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 3 {
        return false;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    upper * 10 >= letters.len() * 8
}

fn rate_dimensions(raw_text: &str, elements: &ElementCounts) -> DimensionRatings {
    let first_line = raw_text.lines().map(str::trim).find(|l| !l.is_empty());
    let title = match first_line {
        None => Rating::Missing,
        Some(line) => {
            let len = line.chars().count();
            if (10..=70).contains(&len) {
                Rating::Good
            } else if len < 10 {
                Rating::Poor
            } else {
                Rating::Fair
            }
        }
    };

    let headings = match elements.headings {
        0 => Rating::Missing,
        1..=2 => Rating::Fair,
        _ => Rating::Good,
    };

    let links = match elements.links {
        0 => Rating::Poor,
        1..=4 => Rating::Fair,
        _ => Rating::Good,
    };

    // Alt-text equivalent: only meaningful when images are referenced at all.
    let alt_mentions = raw_text.to_lowercase().matches("alt").count();
    let alt_text = if elements.images == 0 {
        Rating::Good
    } else if alt_mentions == 0 {
        Rating::Missing
    } else if alt_mentions >= elements.images {
        Rating::Good
    } else {
        Rating::Fair
    };

    let metadata = match elements.meta {
        0 => Rating::Missing,
        1 => Rating::Fair,
        _ => Rating::Good,
    };

    DimensionRatings {
        title,
        headings,
        links,
        alt_text,
        metadata,
    }
}

/// Candidate recommendations from whichever signals are present, most
/// specific first, topped up with generic fallbacks and capped.
fn build_recommendations(signals: &ContentSignals) -> Vec<String> {
    let mut recs: Vec<String> = Vec::new();

    if signals.trend == TrendDirection::Negative {
        push_unique(&mut recs, "Prioritize the declining metrics: diagnose ranking and traffic drops before investing in new content.");
    }
    if signals.domains.search {
        push_unique(&mut recs, "Track keyword rankings weekly and target striking-distance terms in positions 5-15.");
    }
    if signals.domains.financial {
        push_unique(&mut recs, "Tie revenue figures to their traffic sources to find the channels that actually convert.");
    }
    if signals.domains.marketing {
        push_unique(&mut recs, "A/B test the highest-traffic landing pages to lift conversion rate.");
    }
    if signals.domains.social {
        push_unique(&mut recs, "Repurpose the best-performing report sections into social posts to widen reach.");
    }
    if !signals.metrics.percentages.is_empty() {
        push_unique(&mut recs, "Add period-over-period comparisons next to each percentage metric.");
    }
    if !signals.metrics.engagement_times.is_empty() {
        push_unique(&mut recs, "Improve dwell time by expanding thin sections to at least 300 words.");
    }
    if signals.has_chart_indicators {
        push_unique(&mut recs, "Label chart axes and include data tables so figures stay machine-readable.");
    }

    for generic in GENERIC_RECOMMENDATIONS {
        if recs.len() >= MIN_RECOMMENDATIONS {
            break;
        }
        push_unique(&mut recs, generic);
    }

    recs.truncate(MAX_RECOMMENDATIONS);
    recs
}

fn push_unique(recs: &mut Vec<String>, rec: &str) {
    if !recs.iter().any(|r| r == rec) {
        recs.push(rec.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::analyze;

    #[test]
    fn score_is_always_in_policy_range() {
        for text in [
            "",
            "tiny",
            "Organic traffic: 9,000 sessions grew 40% with rankings improved. chart \
             revenue conversion keyword followers March"
                .repeat(80)
                .as_str(),
            "clicks dropped 90% and rankings declined badly",
        ] {
            let signals = analyze(text);
            let summary = score(&signals, text);
            assert!(summary.score >= SCORE_FLOOR, "floor violated for {:?}", text);
            assert!(summary.score <= SCORE_CEILING, "ceiling violated");
        }
    }

    #[test]
    fn recommendations_bounded_three_to_five() {
        let sparse = analyze("plain words without any signal");
        let rich = analyze(
            "revenue conversion ranking followers grew 10% dropped 5% chart \
             traffic: 4,000 time 00:01:30",
        );
        for signals in [sparse, rich] {
            let summary = score(&signals, "x");
            assert!(summary.recommendations.len() >= MIN_RECOMMENDATIONS);
            assert!(summary.recommendations.len() <= MAX_RECOMMENDATIONS);
        }
    }

    #[test]
    fn recommendations_are_deduplicated() {
        let signals = analyze("ranking keyword serp organic seo");
        let summary = score(&signals, "x");
        let mut sorted = summary.recommendations.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), summary.recommendations.len());
    }

    #[test]
    fn matched_domains_each_contribute_a_recommendation() {
        let signals = analyze("revenue grew while conversion and keyword ranking improved");
        assert!(signals.domains.financial && signals.domains.marketing && signals.domains.search);
        let summary = score(&signals, "x");
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.contains("revenue")));
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.contains("conversion")));
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.contains("keyword rankings")));
        assert!(summary.recommendations.len() <= MAX_RECOMMENDATIONS);
    }

    #[test]
    fn scoring_is_idempotent() {
        let text = "Traffic: 2,500 sessions increased 12%, see the chart for March.";
        let signals = analyze(text);
        assert_eq!(score(&signals, text), score(&signals, text));
    }

    #[test]
    fn heading_detection() {
        assert!(is_heading_like("EXECUTIVE SUMMARY"));
        assert!(is_heading_like("2.1 Keyword performance"));
        assert!(!is_heading_like("a plain sentence that happens to be here"));
        assert!(!is_heading_like(""));
    }

    #[test]
    fn element_counts_from_text() {
        let text = "SITE AUDIT\nSee https://example.com and www.example.org\n\
                    meta description present\n1. Findings\nimage of the funnel";
        let counts = count_elements(text);
        assert_eq!(counts.links, 2);
        assert_eq!(counts.meta, 1);
        assert!(counts.headings >= 2);
        assert_eq!(counts.images, 1);
    }

    #[test]
    fn keyword_density_one_decimal() {
        let signals = analyze("keyword keyword keyword filler filler other words here");
        let summary = score(&signals, "x");
        assert!(summary.keyword_density > 0.0);
        let scaled = summary.keyword_density * 10.0;
        assert!((scaled - scaled.round()).abs() < 1e-9);
    }
}
