//! Observation side of triage.
//!
//! A consumer polls the store's snapshot through a [`SnapshotSource`],
//! learns whether anything changed since its last look, and re-derives its
//! [`DashboardView`] from the new snapshot when it did. Diffs of individual
//! cases are deliberately not computed.

pub mod reader;
pub mod source;
pub mod view;

pub use reader::{
    ChangeDetectingReader, DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_POLL_INTERVAL, PollOutcome,
    WatchError, watch,
};
pub use source::{FileSource, SnapshotSource, SourceError, StoreSource};
pub use view::{CaseRow, CategorySummary, DashboardView, OpenStatusCounts};
