//! HTTP surface for the analysis pipeline.
//!
//! Exposes the pipeline as a JSON API for rendering layers that do not link
//! the library directly.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/analyze` | Analyze a base64-encoded artifact |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses use a single envelope:
//!
//! ```json
//! { "error": { "code": "unsupported_type", "message": "unsupported media type: text/csv" } }
//! ```
//!
//! Codes: `bad_request` (400), `payload_too_large` (413),
//! `unsupported_type` / `missing_media_type` (415), `ocr_failed` (422).
//!
//! The transport body limit is sized from `limits.max_artifact_bytes` plus
//! base64/JSON overhead, so an artifact at the configured ceiling is always
//! judged by the handler's own size check.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based
//! dashboards can call the API directly.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::artifact::SourceArtifact;
use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::progress::NoProgress;

/// Shared state: the configured pipeline, cheap to clone via `Arc`.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Request body for `POST /analyze`.
#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    name: String,
    media_type: String,
    data_base64: String,
}

/// Start the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(pipeline: Pipeline) -> anyhow::Result<()> {
    let bind_addr = pipeline.config().server.bind.clone();
    let body_limit = body_limit_for(pipeline.config().limits.max_artifact_bytes);
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state);

    println!("auditlens listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn analyze_handler(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    let bytes = match base64::engine::general_purpose::STANDARD.decode(&req.data_base64) {
        Ok(bytes) => bytes,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "bad_request",
                &format!("data_base64 is not valid base64: {}", e),
            );
        }
    };

    let max = state.pipeline.config().limits.max_artifact_bytes;
    if bytes.len() > max {
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            &format!("artifact is {} bytes; the limit is {}", bytes.len(), max),
        );
    }

    let artifact = SourceArtifact::new(req.name, req.media_type, bytes);
    match state.pipeline.run(&artifact, &NoProgress).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            let status = match &e {
                PipelineError::MissingMediaType | PipelineError::UnsupportedType(_) => {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                }
                PipelineError::OcrFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            };
            error_response(status, e.code(), &e.to_string())
        }
    }
}

async fn health_handler() -> Response {
    let body = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// Request-body ceiling sized so an artifact at the configured byte limit
/// still fits once base64-expanded and wrapped in the JSON envelope. The
/// handler's own decoded-size check stays authoritative.
fn body_limit_for(max_artifact_bytes: usize) -> usize {
    let base64_expanded = max_artifact_bytes.div_ceil(3) * 4;
    base64_expanded + 64 * 1024
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "error": { "code": code, "message": message }
    });
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::MAX_ARTIFACT_BYTES;

    #[test]
    fn body_limit_admits_a_max_size_artifact() {
        let encoded = MAX_ARTIFACT_BYTES.div_ceil(3) * 4;
        assert!(body_limit_for(MAX_ARTIFACT_BYTES) > encoded + 1024);
    }

    #[test]
    fn body_limit_scales_with_configured_ceiling() {
        assert!(body_limit_for(1024) < body_limit_for(MAX_ARTIFACT_BYTES));
    }
}
