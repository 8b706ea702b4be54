//! # auditlens
//!
//! A document ingestion and heuristic analysis pipeline for SEO report
//! scoring: upload a report, get a score.
//!
//! auditlens classifies an uploaded artifact, extracts text from a paginated
//! document or a raster image (two different backends), runs failure-tolerant
//! content heuristics, computes a deterministic quality score with a
//! prioritized recommendation list, and optionally enriches the result with
//! one external inference call — all while publishing incremental progress
//! and degrading gracefully at every stage.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────┐   ┌──────────┐   ┌─────────┐
//! │ Artifact │──▶│ Extract            │──▶│ Analyze  │──▶│ Score   │
//! │ classify │   │ PDF pages / OCR    │   │ signals  │   │ + recs  │
//! └──────────┘   └───────────────────┘   └────┬─────┘   └────┬────┘
//!                                             │              │
//!                                             ▼              ▼
//!                                       ┌──────────┐   ┌──────────┐
//!                                       │ Enrich   │   │ Outcome  │
//!                                       │ (opt.)   │──▶│ (JSON)   │
//!                                       └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! audit analyze report.pdf              # score a PDF report
//! audit analyze dashboard.png --json    # OCR an image, print JSON
//! audit serve                           # start the HTTP API
//! ```
//!
//! ## Failure policy
//!
//! Only two conditions reject a run: an unsupported media type and an OCR
//! engine failure on the image path. Everything else — decode timeouts,
//! unreadable pages, enrichment failures — degrades to a complete result
//! with warnings and explicit provenance flags.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`artifact`] | Source artifacts and media-type classification |
//! | [`extract_pdf`] | Paginated-document text extraction with fallback |
//! | [`extract_ocr`] | Two-pass raster OCR extraction |
//! | [`analyze`] | Pure heuristic content analyzer |
//! | [`score`] | Deterministic scoring and recommendations |
//! | [`enrich`] | Optional AI narration, fails closed |
//! | [`pipeline`] | Stage orchestration and failure policy |
//! | [`progress`] | Progress reporting |
//! | [`config`] | TOML configuration |
//! | [`server`] | JSON HTTP API |

pub mod analyze;
pub mod artifact;
pub mod config;
pub mod enrich;
pub mod error;
pub mod extract_ocr;
pub mod extract_pdf;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod score;
pub mod server;
