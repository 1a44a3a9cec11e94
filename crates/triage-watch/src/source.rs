//! Where a reader gets snapshots from.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use triage_store::{CategoryStore, Snapshot, SnapshotFileError, read_snapshot_from_path};

/// A read that failed but may succeed on a later poll.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("snapshot file unavailable: {0}")]
    File(#[from] SnapshotFileError),

    #[error("store unavailable: {0}")]
    Store(String),
}

/// Where a watcher reads snapshots from.
///
/// `load` is called synchronously from the polling task, so it must stay
/// cheap: reading one small store file or cloning an in-memory `Arc`.
pub trait SnapshotSource {
    fn load(&self) -> Result<Arc<Snapshot>, SourceError>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Reads the persisted store file, as any out-of-process consumer would.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSource for FileSource {
    fn load(&self) -> Result<Arc<Snapshot>, SourceError> {
        Ok(Arc::new(read_snapshot_from_path(&self.path)?))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Reads the published snapshot of an in-process store.
#[derive(Debug, Clone)]
pub struct StoreSource {
    store: Arc<CategoryStore>,
}

impl StoreSource {
    pub fn new(store: Arc<CategoryStore>) -> Self {
        Self { store }
    }
}

impl SnapshotSource for StoreSource {
    fn load(&self) -> Result<Arc<Snapshot>, SourceError> {
        self.store
            .snapshot()
            .map_err(|e| SourceError::Store(e.to_string()))
    }

    fn describe(&self) -> String {
        format!("store:{}", self.store.path().display())
    }
}
