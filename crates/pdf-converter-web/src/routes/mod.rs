//! HTTP route handlers for the converter web service.
//!
//! Every route speaks JSON except downloads, which stream the generated
//! PDF or zip archive.

mod download;
mod upload;

pub use download::download_file;
pub use upload::convert_files;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Room for multipart framing on top of the batch size ceiling.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Liveness probe; also names the active renderer.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let renderer = state.batch.converter().renderer().info();
    Json(json!({
        "status": "ok",
        "renderer": renderer.name,
    }))
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.config.limits.max_batch_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/convert", post(convert_files))
        .route("/api/download/{name}", get(download_file))
        .route("/health", get(health))
        // Responses describe files that are deleted soon after
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
