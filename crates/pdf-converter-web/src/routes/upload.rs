//! Upload route - multipart batch submission.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use pdf_converter_core::util::{safe_stem, unix_millis};
use pdf_converter_core::{BatchManifest, Error, LimitViolation, UploadedFile};
use tracing::{error, info, warn};

use crate::helpers::{ResultExt, RouteResult, api_error};
use crate::state::AppState;

/// Multipart field names that carry files.
const FILE_FIELDS: [&str; 2] = ["files", "filesToConvert"];

/// One received file before it is stored.
struct Received {
    name: String,
    mime: String,
    data: bytes::Bytes,
}

/// Convert every uploaded file and return the batch manifest.
///
/// 200 when at least one file converted, 400 when none did (or nothing was
/// sent), 413 when a size ceiling is exceeded and 500 for setup and
/// packaging faults.
pub async fn convert_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> RouteResult<(StatusCode, Json<BatchManifest>)> {
    let limits = &state.config.limits;
    let mut received: Vec<Received> = Vec::new();

    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        if !field.name().is_some_and(|n| FILE_FIELDS.contains(&n)) {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        // Generic content types fall back to the extension
        let mime = field
            .content_type()
            .filter(|ct| *ct != "application/octet-stream")
            .map_or_else(
                || mime_guess::from_path(&name).first_or_octet_stream().to_string(),
                ToString::to_string,
            );
        let data = field.bytes().await.or_bad_request()?;

        if received.len() >= limits.max_files {
            return Err(limit_error(&LimitViolation::TooManyFiles {
                count: received.len() + 1,
                limit: limits.max_files,
            }));
        }
        limits
            .check_file(&name, data.len() as u64)
            .map_err(|v| limit_error(&v))?;
        received.push(Received { name, mime, data });
    }

    limits
        .check(received.iter().map(|r| (r.name.as_str(), r.data.len() as u64)))
        .map_err(|v| limit_error(&v))?;

    let files = store_uploads(&state.config.storage.upload_dir, received).await?;
    info!("Received batch of {} file(s)", files.len());

    match state.batch.convert_batch(files).await {
        Ok(manifest) => {
            let status = if manifest.succeeded() > 0 {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };
            Ok((status, Json(manifest)))
        }
        Err(e @ Error::EmptyBatch) => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(Error::Packaging { reason, results }) => {
            error!("Archive could not be created: {}", reason);
            let mut manifest = BatchManifest::new(results, None);
            manifest.success = false;
            manifest.message =
                format!("Files were converted but the archive could not be created: {reason}");
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(manifest)))
        }
        Err(e) => {
            error!("Batch failed: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

fn limit_error(violation: &LimitViolation) -> crate::helpers::ApiError {
    let status = match violation {
        LimitViolation::TooManyFiles { .. } => StatusCode::BAD_REQUEST,
        LimitViolation::FileTooLarge { .. } | LimitViolation::BatchTooLarge { .. } => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
    };
    warn!("Rejected upload: {}", violation);
    api_error(status, violation.to_string())
}

/// Write each upload to `upload_dir` under a collision-free name.
///
/// On a write failure everything stored so far is removed again.
async fn store_uploads(upload_dir: &Path, received: Vec<Received>) -> RouteResult<Vec<UploadedFile>> {
    let mut stored: Vec<UploadedFile> = Vec::with_capacity(received.len());
    for file in received {
        let path = upload_dir.join(upload_name(&file.name));
        if let Err(e) = tokio::fs::write(&path, &file.data).await {
            error!("Failed to store upload {}: {}", path.display(), e);
            for upload in &stored {
                upload.discard().await;
            }
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to store upload: {e}"),
            ));
        }
        stored.push(UploadedFile::stored(
            file.name,
            file.mime,
            path,
            file.data.len() as u64,
        ));
    }
    Ok(stored)
}

/// `<safe-base>-<millis>-<uuid8>.<ext>`
fn upload_name(original_filename: &str) -> PathBuf {
    let stem = safe_stem(original_filename);
    let extension: String = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    let id = uuid::Uuid::new_v4().simple().to_string();
    let base = format!("{stem}-{}-{}", unix_millis(), &id[..8]);
    if extension.is_empty() {
        PathBuf::from(base)
    } else {
        PathBuf::from(format!("{base}.{extension}"))
    }
}
