//! Heuristic content analyzer.
//!
//! Pure function over extracted text: keyword frequencies, metric detection,
//! content-domain classification, and trend direction. The metric detectors
//! are a declarative `{category, pattern}` table consumed by one loop, so the
//! rule set is data and each rule is testable on its own.
//!
//! Same text in, same [`ContentSignals`] out — keyword ordering and counts
//! are byte-for-byte reproducible.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ContentSignals, DomainFlags, MetricMatches, TrendDirection};

/// Keywords reported, by descending frequency.
const TOP_KEYWORDS: usize = 8;
/// Minimum token length to count as a keyword.
const MIN_TOKEN_LEN: usize = 4;
/// Stored matches per metric category.
const MAX_MATCHES_PER_CATEGORY: usize = 6;
/// Characters of context inspected on each side of a metric match when
/// inferring trend direction.
const TREND_WINDOW: usize = 40;

/// Tokens too common to be meaningful keywords.
const STOPWORDS: &[&str] = &[
    "that", "this", "with", "from", "have", "has", "been", "were", "their", "there", "which",
    "will", "would", "could", "should", "about", "after", "before", "other", "these", "those",
    "than", "then", "them", "they", "when", "where", "what", "your", "more", "most", "some",
    "such", "into", "over", "under", "also", "each", "only", "very", "between", "during",
    "through", "while", "being", "because", "both", "does", "made", "make", "many",
    "much", "must", "same", "since", "still", "within",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricCategory {
    Percentage,
    Ranking,
    Traffic,
    EngagementTime,
}

struct MetricRule {
    category: MetricCategory,
    pattern: &'static str,
}

/// The metric detector table. Order matters only within a category: matches
/// are stored in document order up to the per-category cap.
const METRIC_RULES: &[MetricRule] = &[
    MetricRule {
        category: MetricCategory::Percentage,
        pattern: r"\b\d+(?:\.\d+)?%",
    },
    MetricRule {
        category: MetricCategory::Ranking,
        pattern: r"(?i)\brank(?:ing|ed|s)?\s*(?:#|no\.?\s*)?\d+\b",
    },
    MetricRule {
        category: MetricCategory::Ranking,
        pattern: r"#\d{1,4}\b",
    },
    MetricRule {
        category: MetricCategory::Traffic,
        pattern: r"(?i)\b(?:traffic|visits|visitors|sessions|clicks|impressions|pageviews)\b[:\s]+[\d,]+\b",
    },
    MetricRule {
        category: MetricCategory::EngagementTime,
        pattern: r"\b\d{1,2}:\d{2}(?::\d{2})?\b",
    },
];

static COMPILED_RULES: Lazy<Vec<(MetricCategory, Regex)>> = Lazy::new(|| {
    METRIC_RULES
        .iter()
        .map(|rule| (rule.category, Regex::new(rule.pattern).expect("metric rule")))
        .collect()
});

/// Vocabulary presence marks a content domain; any subset may match.
const FINANCIAL_VOCAB: &[&str] = &[
    "revenue", "profit", "cost", "budget", "roi", "earnings", "income", "sales", "margin",
];
const MARKETING_VOCAB: &[&str] = &[
    "conversion", "campaign", "engagement", "brand", "funnel", "leads", "ctr", "audience",
];
const SEARCH_VOCAB: &[&str] = &[
    "ranking", "rankings", "keyword", "keywords", "serp", "seo", "backlink", "backlinks",
    "organic", "crawl", "index",
];
const SOCIAL_VOCAB: &[&str] = &[
    "followers", "likes", "shares", "retweets", "social", "instagram", "facebook", "twitter",
    "linkedin",
];

/// Visualization vocabulary that marks chart/graph/table content.
const CHART_VOCAB: &[&str] = &[
    "chart", "charts", "graph", "graphs", "axis", "axes", "trend", "trendline", "distribution",
    "plot", "histogram", "legend", "table",
];

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

const POSITIVE_TOKENS: &[&str] = &[
    "increase", "increased", "increasing", "growth", "grew", "growing", "improved", "improvement",
    "gain", "gains", "higher", "rose", "up",
];
const NEGATIVE_TOKENS: &[&str] = &[
    "decrease", "decreased", "decreasing", "decline", "declined", "declining", "dropped", "drop",
    "loss", "losses", "lower", "fell", "down", "reduced",
];

/// Analyze extracted text into content signals. Pure and deterministic.
pub fn analyze(text: &str) -> ContentSignals {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();

    let keywords = keyword_stats(&tokens);
    let metrics = detect_metrics(text);
    let domains = detect_domains(&lowered);
    let has_chart_indicators = contains_any(&lowered, CHART_VOCAB);
    let has_time_series = contains_any(&lowered, MONTHS);
    let trend = infer_trend(&lowered, &metrics);

    ContentSignals {
        keywords,
        metrics,
        domains,
        trend,
        has_chart_indicators,
        has_time_series,
        word_count: tokens.len(),
    }
}

/// Top-N stopword-filtered token frequencies. Ties keep first-occurrence
/// order, which makes the output stable for identical input.
fn keyword_stats(tokens: &[&str]) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for raw in tokens {
        let word: String = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_string();
        if word.len() < MIN_TOKEN_LEN {
            continue;
        }
        if word.chars().all(|c| c.is_numeric()) {
            continue;
        }
        if STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        let entry = counts.entry(word.clone()).or_insert(0);
        if *entry == 0 {
            order.push(word);
        }
        *entry += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|w| {
            let c = counts[&w];
            (w, c)
        })
        .collect();
    // Stable sort: equal counts retain first-occurrence order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(TOP_KEYWORDS);
    ranked
}

/// Run the declarative rule table over the original-case text.
fn detect_metrics(text: &str) -> MetricMatches {
    let mut matches = MetricMatches::default();
    for (category, regex) in COMPILED_RULES.iter() {
        let bucket = match category {
            MetricCategory::Percentage => &mut matches.percentages,
            MetricCategory::Ranking => &mut matches.rankings,
            MetricCategory::Traffic => &mut matches.traffic,
            MetricCategory::EngagementTime => &mut matches.engagement_times,
        };
        for m in regex.find_iter(text) {
            if bucket.len() >= MAX_MATCHES_PER_CATEGORY {
                break;
            }
            let s = m.as_str().to_string();
            if !bucket.contains(&s) {
                bucket.push(s);
            }
        }
    }
    matches
}

fn detect_domains(lowered: &str) -> DomainFlags {
    DomainFlags {
        financial: contains_any(lowered, FINANCIAL_VOCAB),
        marketing: contains_any(lowered, MARKETING_VOCAB),
        search: contains_any(lowered, SEARCH_VOCAB),
        social: contains_any(lowered, SOCIAL_VOCAB),
    }
}

fn contains_any(lowered: &str, vocab: &[&str]) -> bool {
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|tok| vocab.contains(&tok))
}

/// Count positive vs negative sentiment tokens in a bounded window around
/// each detected metric; fall back to a global count when no metric matched.
fn infer_trend(lowered: &str, metrics: &MetricMatches) -> TrendDirection {
    let contexts: Vec<&str> = if metrics.total() > 0 {
        metric_contexts(lowered, metrics)
    } else {
        vec![lowered]
    };

    let mut positive = 0usize;
    let mut negative = 0usize;
    for ctx in contexts {
        for tok in ctx.split(|c: char| !c.is_alphanumeric()) {
            if POSITIVE_TOKENS.contains(&tok) {
                positive += 1;
            } else if NEGATIVE_TOKENS.contains(&tok) {
                negative += 1;
            }
        }
    }

    if positive > negative {
        TrendDirection::Positive
    } else if negative > positive {
        TrendDirection::Negative
    } else if positive > 0 {
        TrendDirection::Mixed
    } else {
        TrendDirection::Neutral
    }
}

/// Slice a ±`TREND_WINDOW`-char window around each metric occurrence,
/// snapped to char boundaries.
fn metric_contexts<'a>(lowered: &'a str, metrics: &MetricMatches) -> Vec<&'a str> {
    let mut contexts = Vec::new();
    let all = metrics
        .percentages
        .iter()
        .chain(&metrics.rankings)
        .chain(&metrics.traffic)
        .chain(&metrics.engagement_times);
    for needle in all {
        let needle = needle.to_lowercase();
        if let Some(pos) = lowered.find(&needle) {
            let mut start = pos.saturating_sub(TREND_WINDOW);
            while start > 0 && !lowered.is_char_boundary(start) {
                start -= 1;
            }
            let mut end = (pos + needle.len() + TREND_WINDOW).min(lowered.len());
            while end < lowered.len() && !lowered.is_char_boundary(end) {
                end += 1;
            }
            contexts.push(&lowered[start..end]);
        }
    }
    contexts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzer_is_pure() {
        let text = "Organic traffic: 1,200 grew 15% while rankings improved. \
                    Conversion conversion conversion revenue revenue.";
        let a = analyze(text);
        let b = analyze(text);
        assert_eq!(a, b);
    }

    #[test]
    fn keywords_are_frequency_ordered_with_stable_ties() {
        let signals = analyze("alpha beta alpha gamma beta alpha delta gamma");
        assert_eq!(signals.keywords[0], ("alpha".to_string(), 3));
        // beta and gamma both occur twice; beta appeared first.
        assert_eq!(signals.keywords[1].0, "beta");
        assert_eq!(signals.keywords[2].0, "gamma");
        assert_eq!(signals.keywords[3], ("delta".to_string(), 1));
    }

    #[test]
    fn stopwords_and_short_tokens_filtered() {
        let signals = analyze("the and that this with keyword keyword seo a an");
        let words: Vec<&str> = signals.keywords.iter().map(|(w, _)| w.as_str()).collect();
        assert!(words.contains(&"keyword"));
        assert!(!words.contains(&"that"));
        assert!(!words.contains(&"the"));
    }

    #[test]
    fn metric_rules_detect_each_category() {
        let signals = analyze(
            "Bounce rate fell 42.5% this quarter. Ranked #3 for the head term. \
             Traffic: 15,000 sessions, average time 00:03:45.",
        );
        assert!(signals.metrics.percentages.contains(&"42.5%".to_string()));
        assert!(!signals.metrics.rankings.is_empty());
        assert!(!signals.metrics.traffic.is_empty());
        assert!(!signals.metrics.engagement_times.is_empty());
        assert_eq!(signals.metrics.categories_present(), 4);
    }

    #[test]
    fn match_lists_are_capped() {
        let text = (0..20)
            .map(|i| format!("{}%", i))
            .collect::<Vec<_>>()
            .join(" ");
        let signals = analyze(&text);
        assert!(signals.metrics.percentages.len() <= MAX_MATCHES_PER_CATEGORY);
    }

    #[test]
    fn domains_are_not_mutually_exclusive() {
        let signals = analyze("Revenue rose as conversion improved and keyword ranking climbed.");
        assert!(signals.domains.financial);
        assert!(signals.domains.marketing);
        assert!(signals.domains.search);
        assert!(!signals.domains.social);
    }

    #[test]
    fn chart_and_time_series_indicators() {
        let signals = analyze("The bar chart shows 42% growth through March 2024.");
        assert!(signals.has_chart_indicators);
        assert!(signals.has_time_series);
    }

    #[test]
    fn trend_positive_near_metric() {
        let signals = analyze("Sessions increased 30% after the migration.");
        assert_eq!(signals.trend, TrendDirection::Positive);
    }

    #[test]
    fn trend_negative_near_metric() {
        let signals = analyze("Organic clicks dropped 12% month over month.");
        assert_eq!(signals.trend, TrendDirection::Negative);
    }

    #[test]
    fn trend_mixed_when_balanced() {
        let signals = analyze("Mobile grew 10% but desktop declined 8% overall.");
        assert_eq!(signals.trend, TrendDirection::Mixed);
    }

    #[test]
    fn trend_neutral_without_sentiment() {
        let signals = analyze("The report covers the prior quarter in detail.");
        assert_eq!(signals.trend, TrendDirection::Neutral);
    }

    #[test]
    fn empty_text_yields_empty_signals() {
        let signals = analyze("");
        assert!(signals.keywords.is_empty());
        assert_eq!(signals.word_count, 0);
        assert_eq!(signals.trend, TrendDirection::Neutral);
        assert!(!signals.domains.any());
    }
}
