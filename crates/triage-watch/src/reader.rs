//! Change-detecting reader: poll a snapshot source on a fixed interval and
//! report whole-snapshot changes.
//!
//! There is no notification channel from the store. The poll interval bounds
//! how stale a consumer's view can be; it does not affect what the consumer
//! eventually sees.

use crate::source::SnapshotSource;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use triage_store::Snapshot;

/// Dashboard refresh cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// One minute of failed reads at the default interval.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The snapshot differs from the last one observed (or is the first).
    Changed(Arc<Snapshot>),
    /// Structurally equal to the last snapshot observed.
    Unchanged(Arc<Snapshot>),
    /// The read failed; the next poll will retry.
    Unavailable {
        consecutive_failures: u32,
        reason: String,
    },
}

impl PollOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            Self::Changed(snapshot) | Self::Unchanged(snapshot) => Some(snapshot),
            Self::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("snapshot unavailable for {attempts} consecutive reads: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

pub struct ChangeDetectingReader<S> {
    source: S,
    last: Option<Arc<Snapshot>>,
    consecutive_failures: u32,
    max_consecutive_failures: Option<u32>,
}

impl<S: SnapshotSource> ChangeDetectingReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last: None,
            consecutive_failures: 0,
            max_consecutive_failures: Some(DEFAULT_MAX_CONSECUTIVE_FAILURES),
        }
    }

    /// Tolerate up to `max` consecutive failed reads; `None` retries forever.
    pub fn with_max_consecutive_failures(mut self, max: Option<u32>) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn last_seen(&self) -> Option<&Arc<Snapshot>> {
        self.last.as_ref()
    }

    pub fn poll(&mut self) -> Result<PollOutcome, WatchError> {
        let snapshot = match self.source.load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.consecutive_failures += 1;
                let reason = err.to_string();
                if let Some(max) = self.max_consecutive_failures
                    && self.consecutive_failures > max
                {
                    return Err(WatchError::RetriesExhausted {
                        attempts: self.consecutive_failures,
                        last_error: reason,
                    });
                }
                tracing::debug!(
                    source = %self.source.describe(),
                    consecutive_failures = self.consecutive_failures,
                    error = %reason,
                    "snapshot read failed; retrying next poll"
                );
                return Ok(PollOutcome::Unavailable {
                    consecutive_failures: self.consecutive_failures,
                    reason,
                });
            }
        };
        self.consecutive_failures = 0;

        let unchanged = match &self.last {
            Some(previous) => Arc::ptr_eq(previous, &snapshot) || **previous == *snapshot,
            None => false,
        };
        if unchanged {
            return Ok(PollOutcome::Unchanged(snapshot));
        }
        self.last = Some(Arc::clone(&snapshot));
        Ok(PollOutcome::Changed(snapshot))
    }
}

/// Poll `reader` every `interval` until `shutdown` resolves, calling
/// `on_change` with each new snapshot.
///
/// Returns the number of polls made. Fails only when the reader's failure
/// ceiling is exceeded.
///
/// Each poll runs inline on the calling task, and shutdown is noticed
/// between polls. Sources are expected to be cheap (see [`SnapshotSource`]);
/// run the watcher on its own runtime, as the CLI does, rather than beside
/// latency-sensitive tasks.
pub async fn watch<S, F>(
    reader: &mut ChangeDetectingReader<S>,
    interval: Duration,
    mut on_change: F,
    shutdown: impl Future<Output = ()>,
) -> Result<u64, WatchError>
where
    S: SnapshotSource,
    F: FnMut(&Arc<Snapshot>),
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    let mut polls = 0u64;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!(polls, "watch stopped");
                return Ok(polls);
            }
            _ = ticker.tick() => {
                polls += 1;
                match reader.poll()? {
                    PollOutcome::Changed(snapshot) => on_change(&snapshot),
                    PollOutcome::Unchanged(_) => {}
                    PollOutcome::Unavailable { consecutive_failures, reason } => {
                        tracing::warn!(consecutive_failures, error = %reason, "snapshot unavailable");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use triage_store::{CategorySet, SnapshotFileError};

    /// Replays a scripted sequence of reads.
    struct ScriptedSource {
        reads: RefCell<VecDeque<Option<Snapshot>>>,
    }

    impl ScriptedSource {
        fn new(reads: Vec<Option<Snapshot>>) -> Self {
            Self {
                reads: RefCell::new(reads.into()),
            }
        }
    }

    impl SnapshotSource for ScriptedSource {
        fn load(&self) -> Result<Arc<Snapshot>, SourceError> {
            match self.reads.borrow_mut().pop_front().flatten() {
                Some(snapshot) => Ok(Arc::new(snapshot)),
                None => Err(SourceError::File(SnapshotFileError::NotFound(
                    "data.json".to_string(),
                ))),
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn snapshot(names: &[&str]) -> Snapshot {
        Snapshot::empty(&CategorySet::new(names.iter().copied()).expect("set should build"))
    }

    #[test]
    fn first_read_is_a_change_and_equal_reads_are_not() {
        let mut reader = ChangeDetectingReader::new(ScriptedSource::new(vec![
            Some(snapshot(&["police"])),
            Some(snapshot(&["police"])),
            Some(snapshot(&["police", "fire"])),
        ]));

        assert!(reader.poll().expect("poll").changed());
        let second = reader.poll().expect("poll");
        assert!(!second.changed());
        assert!(second.snapshot().is_some());
        assert!(reader.poll().expect("poll").changed());
        assert_eq!(
            reader.last_seen().map(|s| s.category_names().count()),
            Some(2)
        );
    }

    #[test]
    fn failed_reads_are_retried_and_do_not_reset_last_seen() {
        let mut reader = ChangeDetectingReader::new(ScriptedSource::new(vec![
            Some(snapshot(&["police"])),
            None,
            None,
            Some(snapshot(&["police"])),
        ]));

        assert!(reader.poll().expect("poll").changed());
        assert_eq!(
            reader.poll().expect("poll"),
            PollOutcome::Unavailable {
                consecutive_failures: 1,
                reason: "snapshot file unavailable: store file not found: data.json".to_string(),
            }
        );
        assert!(matches!(
            reader.poll().expect("poll"),
            PollOutcome::Unavailable {
                consecutive_failures: 2,
                ..
            }
        ));
        // Recovery with identical content is not reported as a change.
        assert!(!reader.poll().expect("poll").changed());
    }

    #[test]
    fn failure_ceiling_ends_the_watch() {
        let mut reader = ChangeDetectingReader::new(ScriptedSource::new(vec![None, None, None]))
            .with_max_consecutive_failures(Some(2));

        assert!(matches!(
            reader.poll(),
            Ok(PollOutcome::Unavailable { .. })
        ));
        assert!(matches!(
            reader.poll(),
            Ok(PollOutcome::Unavailable { .. })
        ));
        assert_eq!(
            reader.poll(),
            Err(WatchError::RetriesExhausted {
                attempts: 3,
                last_error: "snapshot file unavailable: store file not found: data.json"
                    .to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn watch_reports_each_change_once() {
        let mut reader = ChangeDetectingReader::new(ScriptedSource::new(vec![
            Some(snapshot(&["police"])),
            Some(snapshot(&["police"])),
            None,
            Some(snapshot(&["police", "fire"])),
            Some(snapshot(&["police", "fire"])),
        ]))
        .with_max_consecutive_failures(None);

        let mut seen = Vec::new();
        let polls = watch(
            &mut reader,
            Duration::from_secs(5),
            |snapshot| seen.push(snapshot.category_names().count()),
            tokio::time::sleep(Duration::from_secs(22)),
        )
        .await
        .expect("watch should stop cleanly");

        // Ticks at 0, 5, 10, 15, 20 seconds.
        assert_eq!(polls, 5);
        assert_eq!(seen, vec![1, 2]);
    }
}
