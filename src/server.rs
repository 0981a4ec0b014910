//! HTTP surface for on-demand telemetry batches.
//!
//! Every request gets its own entropy-seeded generator and timestamped ids,
//! so repeated calls never collide.

use crate::config::ServerConfig;
use crate::document::TelemetryDocument;
use crate::error::{Result, TelemetryError};
use crate::generator::TelemetryGenerator;
use crate::stats::BatchSummary;
use crate::types::{GeneratorConfig, Meta};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::sync::Arc;

pub struct AppState {
    pub meta: Meta,
    pub max_count: usize,
}

impl AppState {
    pub fn new(meta: Meta, max_count: usize) -> Self {
        Self { meta, max_count }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TelemetryQuery {
    pub count: Option<usize>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/telemetry", get(telemetry))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let meta = config.load_meta()?;
    config.log_token_status();

    let state = Arc::new(AppState::new(meta, config.max_count));
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TelemetryError::Server(format!("bind {addr}: {e}")))?;

    tracing::info!(%addr, max_count = config.max_count, "Telemetry server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TelemetryError::Server(e.to_string()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

async fn health() -> &'static str {
    "ok"
}

async fn telemetry(State(state): State<Arc<AppState>>, Query(query): Query<TelemetryQuery>) -> Response {
    let count = query.count.unwrap_or_else(|| GeneratorConfig::default().batch_size);
    if count > state.max_count {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("count must be at most {}", state.max_count),
        );
    }

    let meta = state.meta.clone();
    match tokio::task::spawn_blocking(move || render_batch(meta, count)).await {
        Ok(Ok((body, summary))) => {
            let archetypes: Vec<String> = summary
                .archetypes
                .iter()
                .map(|a| format!("{}={}", a.archetype.as_str(), a.count))
                .collect();
            tracing::info!(
                count,
                archetypes = %archetypes.join(","),
                hot_drop_rate = summary.hot_drop_rate(),
                "Generated dynamic telemetry"
            );
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Telemetry generation failed");
            generation_failed()
        }
        Err(e) => {
            tracing::error!(error = %e, "Telemetry generation task panicked");
            generation_failed()
        }
    }
}

/// Generate and serialize off the async runtime; any failure maps to one response
fn render_batch(meta: Meta, count: usize) -> Result<(String, BatchSummary)> {
    let document = generate_document(meta, count)?;
    let summary = BatchSummary::from_matches(&document.matches);
    Ok((document.to_json()?, summary))
}

/// Build a fresh dynamic batch stamped with the current time
pub fn generate_document(meta: Meta, count: usize) -> Result<TelemetryDocument> {
    let now = Utc::now();
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let generator = TelemetryGenerator::new(meta, GeneratorConfig::api_route(millis))?;
    let matches = generator.generate_matches(count, &mut StdRng::from_entropy());
    Ok(TelemetryDocument::dynamic(
        matches,
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}

fn generation_failed() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to generate telemetry data".to_string(),
    )
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
