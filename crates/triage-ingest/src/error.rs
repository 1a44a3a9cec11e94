//! Errors that end a request, and their JSON bodies.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use triage_store::{BatchError, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    /// The body is not a JSON object keyed by category.
    #[error("malformed batch: {0}")]
    Malformed(#[from] BatchError),

    /// The merge could not be persisted; nothing was stored.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller. Storage and internal details
    /// stay in the server log.
    pub fn public_message(&self) -> String {
        match self {
            Self::Malformed(err) => err.to_string(),
            Self::NotFound(path) => format!("unknown route: {path}"),
            Self::Storage(_) => "failed to persist batch; no cases were stored".to_string(),
            Self::Internal(_) => "an error occurred while processing the request".to_string(),
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let body = json!({
            "status": "error",
            "message": self.public_message(),
        });
        (status, Json(body)).into_response()
    }
}
