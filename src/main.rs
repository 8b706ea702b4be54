//! # auditlens CLI (`audit`)
//!
//! The `audit` binary runs the document analysis pipeline from the command
//! line and can serve it over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! audit analyze <file> [--media-type <mime>] [--json] [--progress <mode>]
//! audit serve
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `audit analyze <file>` | Classify, extract, analyze, and score a report |
//! | `audit serve` | Start the JSON HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Score a PDF report with human progress on stderr
//! audit analyze q3-seo-report.pdf
//!
//! # OCR a dashboard screenshot and emit the outcome as JSON
//! audit analyze dashboard.png --json --progress off
//!
//! # Use a config file and serve over HTTP
//! audit serve --config ./audit.toml
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use auditlens::artifact::{media_type_for_extension, SourceArtifact};
use auditlens::config::load_config_or_default;
use auditlens::pipeline::Pipeline;
use auditlens::progress::ProgressMode;
use auditlens::server::run_server;

/// auditlens — document ingestion and heuristic analysis for SEO reports.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; when the file does not exist, built-in defaults apply.
#[derive(Parser)]
#[command(
    name = "audit",
    about = "auditlens — upload a report, get a score",
    version,
    long_about = "auditlens classifies an uploaded report (PDF or image), extracts its text, \
    runs heuristic content analysis, and produces a bounded quality score with prioritized \
    recommendations, optionally enriched by an external inference call."
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when absent.
    #[arg(long, global = true, default_value = "./audit.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Analyze a report file and print the outcome.
    ///
    /// The media type is inferred from the file extension unless
    /// `--media-type` is given. Unsupported types are rejected before any
    /// extraction runs.
    Analyze {
        /// Path to the report (PDF, PNG, JPEG, WebP, BMP, or TIFF).
        file: PathBuf,

        /// Declared media type; overrides extension inference.
        #[arg(long)]
        media_type: Option<String>,

        /// Print the full outcome as JSON instead of the human summary.
        #[arg(long)]
        json: bool,

        /// Progress output on stderr: auto, off, human, or json.
        #[arg(long, default_value = "auto")]
        progress: String,
    },

    /// Start the JSON HTTP API on the configured bind address.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Analyze {
            file,
            media_type,
            json,
            progress,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if bytes.len() > config.limits.max_artifact_bytes {
                bail!(
                    "{} is {} bytes; the limit is {}",
                    file.display(),
                    bytes.len(),
                    config.limits.max_artifact_bytes
                );
            }

            let media_type = match media_type {
                Some(mt) => mt,
                None => file
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(media_type_for_extension)
                    .map(str::to_string)
                    .unwrap_or_default(),
            };
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();

            let mode = match progress.as_str() {
                "auto" => ProgressMode::default_for_tty(),
                "off" => ProgressMode::Off,
                "human" => ProgressMode::Human,
                "json" => ProgressMode::Json,
                other => bail!("Unknown progress mode: {}", other),
            };
            let reporter = mode.reporter();

            let pipeline = Pipeline::new(config)?;
            let artifact = SourceArtifact::new(name, media_type, bytes);
            let outcome = pipeline.run(&artifact, reporter.as_ref()).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_human(&outcome);
            }
        }
        Commands::Serve => {
            let pipeline = Pipeline::new(config)?;
            run_server(pipeline).await?;
        }
    }

    Ok(())
}

fn print_human(outcome: &auditlens::models::AnalysisOutcome) {
    println!("analyze {}", outcome.artifact_name);
    println!("  score: {}/100", outcome.summary.score);
    println!(
        "  pages: {}{}",
        outcome.extraction.page_count,
        if outcome.extraction.is_synthetic {
            " (synthetic summary)"
        } else {
            ""
        }
    );
    if !outcome.summary.keyword_stats.is_empty() {
        let keywords: Vec<String> = outcome
            .summary
            .keyword_stats
            .iter()
            .take(5)
            .map(|(w, c)| format!("{} ({})", w, c))
            .collect();
        println!("  keywords: {}", keywords.join(", "));
    }
    println!("  keyword density: {:.1}%", outcome.summary.keyword_density);
    println!("  recommendations:");
    for rec in &outcome.summary.recommendations {
        println!("    - {}", rec);
    }
    if let Some(insight) = &outcome.insight {
        let provenance = if insight.is_ai_generated {
            "ai"
        } else {
            "heuristic"
        };
        println!("  insight ({}): {}", provenance, insight.narrative);
    }
    for warning in &outcome.extraction.warnings {
        println!("  warning: {}", warning);
    }
    println!("ok");
}
