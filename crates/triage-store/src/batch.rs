//! Inbound batch: one ingestion request's payload.

use serde_json::{Map, Value};

/// Errors that reject a whole batch before any merge happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("request body is not valid JSON: {0}")]
    Json(String),

    #[error("expected a JSON object keyed by category at top level, got {0}")]
    NotAnObject(&'static str),
}

/// Category name -> raw JSON value as submitted.
///
/// Only the top-level shape is checked here. Per-category and per-case
/// checks happen during merge so they can be reported individually.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    entries: Map<String, Value>,
}

impl Batch {
    pub fn from_json(value: Value) -> Result<Self, BatchError> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(BatchError::NotAnObject(json_kind(&other))),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, BatchError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| BatchError::Json(e.to_string()))?;
        Self::from_json(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(category, value)| (category.as_str(), value))
    }

    /// Number of category entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
