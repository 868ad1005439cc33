//! Download route - generated PDFs and archives.

use std::io::ErrorKind;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use pdf_converter_core::util::base_name;
use tracing::{info, warn};

use crate::helpers::{OptionExt, ResultExt, RouteResult, api_error};
use crate::state::AppState;

/// Content type for the files this route hands out.
fn content_type(name: &str) -> Option<&'static str> {
    let (_, extension) = name.rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "zip" => Some("application/zip"),
        _ => None,
    }
}

/// Send a generated file as an attachment, then delete it.
///
/// Only the last path component of `name` is used, so requests cannot
/// leave the output directory.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> RouteResult<Response> {
    let name = base_name(&name);
    if name.is_empty() || name.starts_with('.') {
        return Err(api_error(StatusCode::NOT_FOUND, "File not found"));
    }
    let mime = content_type(name).or_not_found("File not found")?;

    let path = state.batch.output_dir().join(name);
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(api_error(StatusCode::NOT_FOUND, "File not found"));
        }
        Err(e) => return Err(e).or_internal_error(),
    };

    match tokio::fs::remove_file(&path).await {
        Ok(()) => info!("Served and removed {}", name),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {} after download: {}", path.display(), e),
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        )
        .body(Body::from(data))
        .or_internal_error()
}
