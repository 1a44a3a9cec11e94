//! # triage-store
//!
//! Durable intake state for categorized emergency-call cases.
//!
//! This crate provides:
//! - `CaseRecord` and its explicit inbound schema check
//! - `CategorySet` (the recognised, configurable categories)
//! - `Snapshot` (category -> ordered cases) and its JSON store file
//! - `CategoryStore` (single-writer merge with dedup, atomic persist)
//!
//! HTTP and polling concerns live in `triage-ingest` and `triage-watch`.
//!
//! ## Data model
//!
//! ```text
//! data.json (on disk, one JSON object keyed by category)
//!     ↕  load / write-temp-then-rename
//! CategoryStore (canonical in-memory snapshot behind Arc)
//! ```

pub mod batch;
pub mod case;
pub mod category;
pub mod file;
pub mod lock;
pub mod merge;
pub mod snapshot;
pub mod store;

pub use batch::{Batch, BatchError};
pub use case::{CaseRecord, FieldProblem, OpenStatus, REQUIRED_FIELDS, RecordError};
pub use category::{CategoryError, CategorySet, DEFAULT_CATEGORIES, is_valid_category_name};
pub use file::{SnapshotFileError, read_snapshot_from_path, write_snapshot_to_path};
pub use lock::{LockError, WriterLock, store_lock_path};
pub use merge::{
    DuplicatePolicy, IgnoredCategory, MergeOutcome, MergePolicy, Rejection, RejectionKind,
    UnknownCategoryPolicy, apply_batch,
};
pub use snapshot::Snapshot;
pub use store::{CategoryStore, DEFAULT_STORE_PATH, StoreConfig, StoreError};
