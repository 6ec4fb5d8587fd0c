//! HTTP surface for docdigest.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /upload` – Accept up to `MAX_FILES` documents as multipart parts named `files`, run
//!   OCR and summarization on each, and return `{ "files": [...] }` with one outcome per file in
//!   submission order. A file that fails is reported as `{ "fileName", "error" }` alongside its
//!   successful siblings.
//! - `GET /health` – Liveness probe with a timestamp and uptime.
//! - `GET /metrics` – Batch and per-file counters since startup.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Request-level problems (no files, unsupported type, oversized file) answer `400` with
//! `{ "error": message }`; storage failures answer `500` in the same shape.

use crate::metrics::MetricsSnapshot;
use crate::processing::{
    BatchResponse, IncomingFile, ProcessingApi, ProcessingError, ValidationError,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Multipart field carrying uploaded documents.
pub const UPLOAD_FIELD: &str = "files";

/// Allowance for multipart framing on top of the file payload limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

struct AppState<S> {
    service: Arc<S>,
    started: Instant,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            started: self.started,
        }
    }
}

/// Build the HTTP router exposing the upload API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ProcessingApi + 'static,
{
    let policy = service.upload_policy();
    let body_limit = policy
        .max_file_size
        .saturating_mul(policy.max_files)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/upload", post(upload::<S>))
        .route("/health", get(health::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(AppState {
            service,
            started: Instant::now(),
        })
}

/// Accept a multipart batch and process every file.
///
/// File parts are read chunk by chunk so an oversized file is rejected as soon as it crosses
/// the per-file limit. Parts with other field names are ignored.
async fn upload<S>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, AppError>
where
    S: ProcessingApi,
{
    let policy = state.service.upload_policy().clone();
    let mut files = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some(UPLOAD_FIELD) {
            tracing::debug!(field = ?field.name(), "Ignoring non-file multipart field");
            continue;
        }
        let original_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or(ValidationError::MissingFileName)?;
        policy.check_type(&original_name)?;
        if files.len() >= policy.max_files {
            return Err(ValidationError::TooManyFiles {
                limit: policy.max_files,
            }
            .into());
        }
        let content_type = field.content_type().map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
            policy.check_size(&original_name, bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        files.push(IncomingFile {
            original_name,
            content_type,
            bytes,
        });
    }

    tracing::info!(files = files.len(), "Upload received");
    let response = state.service.process_uploads(files).await?;
    Ok(Json(response))
}

fn malformed(error: axum::extract::multipart::MultipartError) -> AppError {
    ValidationError::Malformed(error.body_text()).into()
}

/// Response body for `GET /health`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime_secs: u64,
}

/// Report liveness.
async fn health<S>(State(state): State<AppState<S>>) -> Json<HealthResponse>
where
    S: ProcessingApi,
{
    Json(HealthResponse {
        status: "healthy",
        timestamp: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

/// Return batch and per-file counters.
async fn get_metrics<S>(State(state): State<AppState<S>>) -> Json<MetricsSnapshot>
where
    S: ProcessingApi,
{
    Json(state.service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/upload",
                description: "Upload PDF, PNG or JPEG documents as multipart parts named \"files\". Response returns { \"files\": [...] } with extracted text and a summary per file.",
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe returning status, timestamp and uptime.",
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return batch, per-file and degraded-summary counters.",
            },
        ],
    })
}

/// Error body shared by every failing response.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError(ProcessingError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ProcessingError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Upload request failed");
        } else {
            tracing::info!(error = %self.0, "Upload rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self(inner)
    }
}

impl From<ValidationError> for AppError {
    fn from(inner: ValidationError) -> Self {
        Self(inner.into())
    }
}
