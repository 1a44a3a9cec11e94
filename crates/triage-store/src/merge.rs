//! Deduplicating merge of a batch into a snapshot.
//!
//! Pure function over an owned snapshot copy; the store decides when the
//! result is persisted and published.

use crate::batch::{Batch, json_kind};
use crate::case::CaseRecord;
use crate::category::CategorySet;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// What happens when an inbound case reuses a stored `case_number`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the stored case; drop the inbound one.
    #[default]
    FirstWriteWins,
    /// Replace the stored case in place, keeping its position.
    LastWriteWins,
}

/// What happens to a batch entry whose category is not recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Report under `rejected`.
    #[default]
    Reject,
    /// Report under `ignored`.
    Ignore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    pub duplicates: DuplicatePolicy,
    pub unknown_categories: UnknownCategoryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// One case failed the schema check.
    MalformedRecord,
    /// The category value was not an array of cases.
    MalformedCategory,
    /// The category is not in the recognised set.
    UnknownCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub category: String,
    pub kind: RejectionKind,
    /// Position in the submitted array, for record rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    /// Number of submitted cases this rejection covers.
    pub cases: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IgnoredCategory {
    pub category: String,
    pub cases: usize,
}

/// Per-category accounting for one merge.
///
/// For every category `c` in the batch:
/// `added[c] + duplicates[c] + updated[c] + rejected_cases(c) + ignored_cases(c)`
/// equals the number of submitted cases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub added: BTreeMap<String, usize>,
    pub duplicates: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub updated: BTreeMap<String, usize>,
    pub rejected: Vec<Rejection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<IgnoredCategory>,
}

impl MergeOutcome {
    pub fn total_added(&self) -> usize {
        self.added.values().sum()
    }

    pub fn total_duplicates(&self) -> usize {
        self.duplicates.values().sum()
    }

    pub fn total_updated(&self) -> usize {
        self.updated.values().sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.rejected.iter().map(|r| r.cases).sum()
    }

    pub fn rejected_cases(&self, category: &str) -> usize {
        self.rejected
            .iter()
            .filter(|r| r.category == category)
            .map(|r| r.cases)
            .sum()
    }

    pub fn ignored_cases(&self, category: &str) -> usize {
        self.ignored
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.cases)
            .sum()
    }

    /// Whether the snapshot was modified and needs persisting.
    pub fn changed(&self) -> bool {
        self.total_added() + self.total_updated() > 0
    }
}

/// Merge `batch` into `snapshot`.
///
/// Only categories in `recognised` that are present in the snapshot accept
/// cases. Accepted cases are appended in submission order; a case whose
/// number is already stored (including earlier in the same batch) is
/// handled per `policy.duplicates`.
pub fn apply_batch(
    snapshot: &mut Snapshot,
    recognised: &CategorySet,
    batch: &Batch,
    policy: &MergePolicy,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (category, value) in batch.iter() {
        let stored = if recognised.contains(category) {
            snapshot.cases_mut(category)
        } else {
            None
        };
        let Some(stored) = stored else {
            unknown_category(&mut outcome, category, value, policy.unknown_categories);
            continue;
        };

        outcome.added.insert(category.to_string(), 0);
        outcome.duplicates.insert(category.to_string(), 0);

        let Value::Array(cases) = value else {
            tracing::warn!(category, "category value is not an array; rejecting category");
            outcome.rejected.push(Rejection {
                category: category.to_string(),
                kind: RejectionKind::MalformedCategory,
                index: None,
                case_number: None,
                cases: 1,
                message: format!("expected an array of cases, got {}", json_kind(value)),
            });
            continue;
        };

        let mut positions: HashMap<String, usize> = stored
            .iter()
            .enumerate()
            .map(|(idx, case)| (case.case_number.clone(), idx))
            .collect();
        let mut added = 0usize;
        let mut duplicates = 0usize;
        let mut updated = 0usize;

        for (index, raw) in cases.iter().enumerate() {
            let record = match CaseRecord::from_json(raw) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(category, index, error = %err, "rejecting malformed case");
                    outcome.rejected.push(Rejection {
                        category: category.to_string(),
                        kind: RejectionKind::MalformedRecord,
                        index: Some(index),
                        case_number: err.case_number().map(str::to_string),
                        cases: 1,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            match positions.get(&record.case_number) {
                None => {
                    positions.insert(record.case_number.clone(), stored.len());
                    stored.push(record);
                    added += 1;
                }
                Some(&pos) => match policy.duplicates {
                    DuplicatePolicy::FirstWriteWins => duplicates += 1,
                    DuplicatePolicy::LastWriteWins if stored[pos] == record => duplicates += 1,
                    DuplicatePolicy::LastWriteWins => {
                        stored[pos] = record;
                        updated += 1;
                    }
                },
            }
        }

        outcome.added.insert(category.to_string(), added);
        outcome.duplicates.insert(category.to_string(), duplicates);
        if policy.duplicates == DuplicatePolicy::LastWriteWins {
            outcome.updated.insert(category.to_string(), updated);
        }
    }

    outcome
}

fn unknown_category(
    outcome: &mut MergeOutcome,
    category: &str,
    value: &Value,
    policy: UnknownCategoryPolicy,
) {
    let cases = match value {
        Value::Array(cases) => cases.len(),
        _ => 1,
    };
    match policy {
        UnknownCategoryPolicy::Reject => {
            tracing::warn!(category, cases, "rejecting unknown category");
            outcome.rejected.push(Rejection {
                category: category.to_string(),
                kind: RejectionKind::UnknownCategory,
                index: None,
                case_number: None,
                cases,
                message: format!("unknown category `{category}`"),
            });
        }
        UnknownCategoryPolicy::Ignore => {
            tracing::warn!(category, cases, "ignoring unknown category");
            outcome.ignored.push(IgnoredCategory {
                category: category.to_string(),
                cases,
            });
        }
    }
}
