//! Route table and handlers.

use crate::error::IngestError;
use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::Instrument;
use triage_store::{Batch, CategoryStore, MergeOutcome};
use triage_watch::DashboardView;
use uuid::Uuid;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    store: Arc<CategoryStore>,
}

impl AppState {
    pub fn new(store: Arc<CategoryStore>) -> Self {
        Self { store }
    }
}

pub fn router(store: Arc<CategoryStore>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/healthz", get(healthz))
        .route("/snapshot", get(snapshot))
        .route("/summary", get(summary))
        .fallback(not_found)
        .with_state(AppState::new(store))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

#[derive(Debug, Serialize)]
pub struct WebhookReply {
    pub status: &'static str,
    pub request_id: String,
    #[serde(flatten)]
    pub outcome: MergeOutcome,
}

/// `POST /webhook`: validate a batch and merge it into the store.
pub async fn webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WebhookReply>, IngestError> {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("webhook", request_id = %request_id);

    async move {
        tracing::info!(bytes = body.len(), "received batch");
        tracing::debug!(body = %String::from_utf8_lossy(&body), "batch payload");

        let batch = Batch::from_slice(&body)?;
        let store = Arc::clone(&state.store);
        let outcome = tokio::task::spawn_blocking(move || store.merge(&batch))
            .await
            .map_err(|e| IngestError::Internal(format!("merge task failed: {e}")))??;

        tracing::info!(
            added = outcome.total_added(),
            duplicates = outcome.total_duplicates(),
            rejected = outcome.total_rejected(),
            "batch merged"
        );
        Ok::<_, IngestError>(Json(WebhookReply {
            status: "success",
            request_id,
            outcome,
        }))
    }
    .instrument(span)
    .await
}

/// `GET /healthz`.
pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /snapshot`: the store file's content, served from memory.
///
/// Carries the snapshot digest as `ETag`; a matching `If-None-Match`
/// yields `304` so pollers can skip unchanged bodies.
pub async fn snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, IngestError> {
    let snapshot = state.store.snapshot()?;
    let etag = format!("\"{}\"", snapshot.digest());

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.split(',').any(|tag| tag.trim() == etag));
    let etag_value = HeaderValue::from_str(&etag)
        .map_err(|e| IngestError::Internal(format!("invalid etag: {e}")))?;
    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag_value)]).into_response());
    }

    let body = serde_json::to_vec(snapshot.as_ref())
        .map_err(|e| IngestError::Internal(format!("snapshot serialization failed: {e}")))?;
    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ),
            (header::ETAG, etag_value),
        ],
        Body::from(body),
    )
        .into_response())
}

/// `GET /summary`: dashboard view of the current snapshot.
pub async fn summary(State(state): State<AppState>) -> Result<Json<DashboardView>, IngestError> {
    let snapshot = state.store.snapshot()?;
    Ok(Json(DashboardView::from_snapshot(&snapshot)))
}

async fn not_found(uri: Uri) -> IngestError {
    IngestError::NotFound(uri.path().to_string())
}
