//! The category store: canonical in-memory state plus its store file.

use crate::batch::Batch;
use crate::category::CategorySet;
use crate::file::{SnapshotFileError, read_snapshot_from_path, write_snapshot_to_path};
use crate::lock::{LockError, WriterLock};
use crate::merge::{MergeOutcome, MergePolicy, apply_batch};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// Default store file name, relative to the working directory.
pub const DEFAULT_STORE_PATH: &str = "data.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub categories: CategorySet,
    #[serde(flatten)]
    pub policy: MergePolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("failed to load store file: {0}")]
    Load(SnapshotFileError),

    #[error("failed to persist store file: {0}")]
    Storage(SnapshotFileError),

    #[error("store state lock poisoned")]
    Poisoned,
}

/// Single-writer, multi-reader store of cases by category.
///
/// Merges are serialized by a writer mutex and applied to a copy of the
/// current snapshot; the copy is persisted and only then published, so
/// readers see either the state before a merge or after it.
#[derive(Debug)]
pub struct CategoryStore {
    path: PathBuf,
    config: StoreConfig,
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
    _lock: WriterLock,
}

impl CategoryStore {
    /// Open the store at `path`, creating it if absent.
    ///
    /// An existing file is loaded as-is; configured categories it lacks are
    /// added as empty sequences, and a case number repeated within one
    /// category keeps only its first occurrence. Categories in the file that are not
    /// configured are kept but do not accept new cases.
    pub fn initialize(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let lock = WriterLock::acquire(&path)?;

        let snapshot = match read_snapshot_from_path(&path) {
            Ok(mut snapshot) => {
                let repeated = snapshot.drop_repeated_cases();
                if !repeated.is_empty() {
                    tracing::warn!(
                        path = %path.display(),
                        ?repeated,
                        "store file repeats case numbers within a category; keeping the first of each"
                    );
                }
                let added = snapshot.ensure_categories(&config.categories);
                if !added.is_empty() {
                    tracing::info!(path = %path.display(), ?added, "adding configured categories to store file");
                }
                if !repeated.is_empty() || !added.is_empty() {
                    write_snapshot_to_path(&path, &snapshot).map_err(StoreError::Storage)?;
                }
                let retained: Vec<&str> = snapshot
                    .category_names()
                    .filter(|name| !config.categories.contains(name))
                    .collect();
                if !retained.is_empty() {
                    tracing::warn!(
                        path = %path.display(),
                        ?retained,
                        "store file holds categories that are not configured; they are kept read-only"
                    );
                }
                tracing::info!(
                    path = %path.display(),
                    cases = snapshot.total_cases(),
                    "loaded store file"
                );
                snapshot
            }
            Err(SnapshotFileError::NotFound(_)) => {
                let snapshot = Snapshot::empty(&config.categories);
                write_snapshot_to_path(&path, &snapshot).map_err(StoreError::Storage)?;
                tracing::info!(
                    path = %path.display(),
                    categories = config.categories.len(),
                    "initialized store file with empty categories"
                );
                snapshot
            }
            Err(err) => return Err(StoreError::Load(err)),
        };

        Ok(Self {
            path,
            config,
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn categories(&self) -> &CategorySet {
        &self.config.categories
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.config.policy
    }

    /// Immutable point-in-time copy of the current state.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, StoreError> {
        let current = self.current.read().map_err(|_| StoreError::Poisoned)?;
        Ok(Arc::clone(&current))
    }

    /// Merge `batch` and persist the result.
    ///
    /// On a persist failure the published state is left untouched and the
    /// error is returned; nothing from this batch becomes visible.
    pub fn merge(&self, batch: &Batch) -> Result<MergeOutcome, StoreError> {
        let _writer = self.writer.lock().map_err(|_| StoreError::Poisoned)?;

        let base = self.snapshot()?;
        let mut next = Snapshot::clone(&base);
        let outcome = apply_batch(&mut next, &self.config.categories, batch, &self.config.policy);

        if outcome.changed() {
            write_snapshot_to_path(&self.path, &next).map_err(|err| {
                tracing::error!(path = %self.path.display(), error = %err, "persist failed; merge discarded");
                StoreError::Storage(err)
            })?;
            let mut current = self.current.write().map_err(|_| StoreError::Poisoned)?;
            *current = Arc::new(next);
        }

        tracing::info!(
            added = outcome.total_added(),
            duplicates = outcome.total_duplicates(),
            updated = outcome.total_updated(),
            rejected = outcome.total_rejected(),
            persisted = outcome.changed(),
            "merged batch"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    struct TempDirGuard {
        path: PathBuf,
    }

    impl TempDirGuard {
        fn new(prefix: &str) -> Self {
            let unique = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock should be after unix epoch")
                .as_nanos();
            let path = std::env::temp_dir().join(format!(
                "triage-store-{prefix}-{}-{unique}",
                std::process::id()
            ));
            fs::create_dir_all(&path).expect("temp dir should be created");
            Self { path }
        }
    }

    impl Drop for TempDirGuard {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    fn config(names: &[&str]) -> StoreConfig {
        StoreConfig {
            categories: CategorySet::new(names.iter().copied()).expect("set should build"),
            policy: MergePolicy::default(),
        }
    }

    fn police_batch() -> Batch {
        Batch::from_json(json!({
            "police": [{
                "case_number": "P1",
                "location": "Main St",
                "dispatch": "unit 4",
                "situation": "noise complaint",
                "open_status": "yes",
                "stack_rank": 3
            }]
        }))
        .expect("batch should parse")
    }

    #[test]
    fn initialize_creates_empty_file_once() {
        let tmp = TempDirGuard::new("init");
        let path = tmp.path.join("data.json");

        let store = CategoryStore::initialize(&path, config(&["police", "fire"]))
            .expect("store should initialize");
        assert_eq!(
            fs::read_to_string(&path).expect("file should exist"),
            r#"{"fire":[],"police":[]}"#
        );
        store.merge(&police_batch()).expect("merge should persist");
        drop(store);

        let reopened = CategoryStore::initialize(&path, config(&["police", "fire"]))
            .expect("store should reopen");
        let snapshot = reopened.snapshot().expect("snapshot");
        assert_eq!(snapshot.cases("police").map(<[_]>::len), Some(1));
    }

    #[test]
    fn initialize_keeps_unconfigured_categories_read_only() {
        let tmp = TempDirGuard::new("retain");
        let path = tmp.path.join("data.json");
        fs::write(&path, r#"{"police":[],"legacy":[]}"#).expect("fixture should write");

        let store =
            CategoryStore::initialize(&path, config(&["police", "fire"])).expect("store opens");
        let snapshot = store.snapshot().expect("snapshot");
        let names: Vec<&str> = snapshot.category_names().collect();
        assert_eq!(names, vec!["fire", "legacy", "police"]);

        let outcome = store
            .merge(&Batch::from_json(json!({ "legacy": [] })).expect("batch"))
            .expect("merge should not fail");
        assert_eq!(outcome.rejected_cases("legacy"), 0);
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[test]
    fn initialize_refuses_corrupt_file_without_overwriting() {
        let tmp = TempDirGuard::new("corrupt");
        let path = tmp.path.join("data.json");
        fs::write(&path, "{not json").expect("fixture should write");

        let result = CategoryStore::initialize(&path, config(&["police"]));
        assert!(matches!(result, Err(StoreError::Load(_))));
        assert_eq!(fs::read_to_string(&path).expect("file"), "{not json");
        WriterLock::acquire(&path).expect("failed initialize should release the writer lock");
    }

    #[test]
    fn second_store_on_same_path_is_refused() {
        let tmp = TempDirGuard::new("two-writers");
        let path = tmp.path.join("data.json");
        let _first = CategoryStore::initialize(&path, config(&["police"])).expect("first");

        let second = CategoryStore::initialize(&path, config(&["police"]));
        assert!(matches!(second, Err(StoreError::Lock(LockError::Busy { .. }))));
    }

    #[test]
    fn failed_persist_leaves_published_state_unchanged() {
        let tmp = TempDirGuard::new("persist-fail");
        let dir = tmp.path.join("store");
        let path = dir.join("data.json");
        let store = CategoryStore::initialize(&path, config(&["police"])).expect("store");
        let before = store.snapshot().expect("snapshot");

        // Replace the store directory with a plain file so the temp write fails.
        fs::remove_dir_all(&dir).expect("store dir should be removable");
        fs::write(&dir, b"blocker").expect("blocker should write");

        let result = store.merge(&police_batch());
        assert!(matches!(result, Err(StoreError::Storage(_))));
        assert_eq!(store.snapshot().expect("snapshot"), before);
    }

    #[test]
    fn initialize_reclaims_lock_left_by_killed_writer() {
        let tmp = TempDirGuard::new("stale-lock");
        let path = tmp.path.join("data.json");
        fs::write(
            crate::lock::store_lock_path(&path),
            "pid=999999999\nutc=2026-01-01T00:00:00+00:00\n",
        )
        .expect("leftover lock should write");

        let store = CategoryStore::initialize(&path, config(&["police"]))
            .expect("leftover lock file should not block startup");
        store.merge(&police_batch()).expect("merge should persist");
    }

    #[test]
    fn initialize_loads_loosely_typed_store_file() {
        let tmp = TempDirGuard::new("loose");
        let path = tmp.path.join("data.json");
        fs::write(
            &path,
            r#"{"police":[{"case_number":7,"location":"Main St","dispatch":"unit 4","situation":"noise complaint","open_status":"yes","stack_rank":"2"}]}"#,
        )
        .expect("fixture should write");

        let store = CategoryStore::initialize(&path, config(&["police"]))
            .expect("loose store file should load");
        let snapshot = store.snapshot().expect("snapshot");
        let cases = snapshot.cases("police").expect("police exists");
        assert_eq!(cases[0].case_number, "7");
        assert_eq!(cases[0].stack_rank, 2);

        let outcome = store
            .merge(
                &Batch::from_json(json!({
                    "police": [{
                        "case_number": "7",
                        "location": "Main St",
                        "dispatch": "unit 4",
                        "situation": "noise complaint",
                        "open_status": "yes",
                        "stack_rank": 2
                    }]
                }))
                .expect("batch"),
            )
            .expect("merge");
        assert_eq!(outcome.duplicates.get("police"), Some(&1));
    }

    #[test]
    fn initialize_drops_repeated_case_numbers_and_rewrites_file() {
        let tmp = TempDirGuard::new("repeated");
        let path = tmp.path.join("data.json");
        fs::write(
            &path,
            r#"{"police":[{"case_number":"P1","location":"Main St","dispatch":"unit 4","situation":"noise complaint","open_status":"open","stack_rank":3},{"case_number":"P1","location":"Main St","dispatch":"unit 9","situation":"noise complaint","open_status":"closed","stack_rank":1}]}"#,
        )
        .expect("fixture should write");

        let store = CategoryStore::initialize(&path, config(&["police"])).expect("store opens");
        let snapshot = store.snapshot().expect("snapshot");
        let cases = snapshot.cases("police").expect("police exists");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].dispatch, "unit 4");

        let on_disk = read_snapshot_from_path(&path).expect("file should reload");
        assert_eq!(on_disk, *snapshot);
    }
}
