//! HTTP intake for the category store.
//!
//! `POST /webhook` accepts a JSON object keyed by category, merges it through
//! [`triage_store::CategoryStore::merge`], and reports per-category counts.
//! Read routes (`/snapshot`, `/summary`, `/healthz`) serve the published
//! snapshot without touching the writer.

pub mod error;
pub mod routes;
pub mod server;

pub use error::IngestError;
pub use routes::{AppState, MAX_BODY_BYTES, WebhookReply, router};
pub use server::{DEFAULT_BIND, ServeError, ServerConfig, serve, serve_with_listener};
