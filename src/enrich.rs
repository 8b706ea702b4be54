//! AI enrichment adapter.
//!
//! Optionally narrates the heuristic findings into prose via one outbound
//! inference call. This adapter never raises past its own boundary: any
//! failure — timeout, non-success response, missing key — yields the canned
//! heuristic-only narrative with `is_ai_generated = false`.
//!
//! At most one outbound request is made per pipeline run; there is no retry.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::EnrichmentConfig;
use crate::models::{AnalysisSummary, ContentSignals, EnrichedInsight};

/// Characters of raw text sent as inference context.
const MAX_CONTEXT_CHARS: usize = 6000;

/// Inference backend that turns heuristic findings into narrative prose.
#[async_trait]
pub trait InsightBackend: Send + Sync {
    fn name(&self) -> &str;

    /// One narration attempt. Errors are absorbed by [`enrich`].
    async fn narrate(&self, signals: &ContentSignals, raw_text: &str) -> Result<String>;
}

/// Backend used when enrichment is not configured; always errors, which
/// routes every run to the canned narrative.
pub struct DisabledBackend;

#[async_trait]
impl InsightBackend for DisabledBackend {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn narrate(&self, _signals: &ContentSignals, _raw_text: &str) -> Result<String> {
        bail!("enrichment provider is disabled")
    }
}

/// Backend calling the OpenAI chat-completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable. The request carries
/// the truncated raw text plus the structured chart/metric signals as JSON.
pub struct OpenAiBackend {
    model: String,
    timeout_secs: u64,
}

impl OpenAiBackend {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("enrichment.model required for OpenAI provider"))?;
        Ok(Self {
            model,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl InsightBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn narrate(&self, signals: &ContentSignals, raw_text: &str) -> Result<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let mut context = raw_text.to_string();
        if context.len() > MAX_CONTEXT_CHARS {
            let mut cut = MAX_CONTEXT_CHARS;
            while cut > 0 && !context.is_char_boundary(cut) {
                cut -= 1;
            }
            context.truncate(cut);
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You summarize SEO report findings into two or three sentences of plain, actionable prose. No markdown."
                },
                {
                    "role": "user",
                    "content": format!(
                        "Heuristic signals: {}\n\nDocument text:\n{}",
                        serde_json::to_string(signals)?,
                        context
                    )
                }
            ]
        });

        let response = client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("inference API returned {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        let narrative = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("inference response missing content"))?
            .trim()
            .to_string();
        if narrative.is_empty() {
            bail!("inference response was empty");
        }
        Ok(narrative)
    }
}

/// Build a backend for the configured provider.
pub fn create_backend(config: &EnrichmentConfig) -> Result<Box<dyn InsightBackend>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledBackend)),
        "openai" => Ok(Box::new(OpenAiBackend::new(config)?)),
        other => bail!("Unknown enrichment provider: {}", other),
    }
}

/// Narrate the findings, failing closed to the canned heuristic narrative.
/// Always returns a valid insight; never an error.
pub async fn enrich(
    backend: &dyn InsightBackend,
    signals: &ContentSignals,
    summary: &AnalysisSummary,
    raw_text: &str,
) -> EnrichedInsight {
    match backend.narrate(signals, raw_text).await {
        Ok(narrative) => EnrichedInsight {
            narrative,
            is_ai_generated: true,
        },
        Err(_) => EnrichedInsight {
            narrative: canned_narrative(summary),
            is_ai_generated: false,
        },
    }
}

/// Deterministic heuristic-only narrative assembled from the summary.
/// Byte-stable for a given summary so tests and callers can rely on it.
pub fn canned_narrative(summary: &AnalysisSummary) -> String {
    let themes = if summary.keyword_stats.is_empty() {
        "no dominant themes detected".to_string()
    } else {
        summary
            .keyword_stats
            .iter()
            .take(3)
            .map(|(w, _)| w.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let top_recommendation = summary
        .recommendations
        .first()
        .map(String::as_str)
        .unwrap_or("Review the document manually.");
    format!(
        "Heuristic review: this document scores {}/100. Key themes: {}. Top recommendation: {}",
        summary.score, themes, top_recommendation
    )
}

/// Enrichment only runs when the heuristic result is sparse enough that
/// narration adds signal: fewer than two keywords or no domain match.
pub fn should_enrich(signals: &ContentSignals) -> bool {
    signals.keywords.len() < 2 || !signals.domains.any()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::analyze;
    use crate::score::score;

    struct FailingBackend;

    #[async_trait]
    impl InsightBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }
        async fn narrate(&self, _s: &ContentSignals, _t: &str) -> Result<String> {
            bail!("simulated network timeout")
        }
    }

    struct EchoBackend;

    #[async_trait]
    impl InsightBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }
        async fn narrate(&self, _s: &ContentSignals, _t: &str) -> Result<String> {
            Ok("model narrative".to_string())
        }
    }

    #[tokio::test]
    async fn failure_yields_canned_narrative() {
        let text = "plain words";
        let signals = analyze(text);
        let summary = score(&signals, text);
        let insight = enrich(&FailingBackend, &signals, &summary, text).await;
        assert!(!insight.is_ai_generated);
        assert_eq!(insight.narrative, canned_narrative(&summary));
    }

    #[tokio::test]
    async fn success_is_marked_ai_generated() {
        let text = "plain words";
        let signals = analyze(text);
        let summary = score(&signals, text);
        let insight = enrich(&EchoBackend, &signals, &summary, text).await;
        assert!(insight.is_ai_generated);
        assert_eq!(insight.narrative, "model narrative");
    }

    #[test]
    fn canned_narrative_is_byte_stable() {
        let text = "revenue conversion keyword ranking content grew 10%";
        let signals = analyze(text);
        let summary = score(&signals, text);
        assert_eq!(canned_narrative(&summary), canned_narrative(&summary));
        assert!(canned_narrative(&summary).contains(&format!("{}/100", summary.score)));
    }

    #[test]
    fn sparse_signals_trigger_enrichment() {
        assert!(should_enrich(&analyze("nothing meaningful here")));
        assert!(!should_enrich(&analyze(
            "keyword ranking organic traffic revenue conversion funnel backlinks"
        )));
    }

    #[test]
    fn disabled_provider_builds() {
        let backend = create_backend(&EnrichmentConfig::default()).unwrap();
        assert_eq!(backend.name(), "disabled");
    }
}
