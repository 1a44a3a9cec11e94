//! Point-in-time store state: category name -> ordered cases.

use crate::case::CaseRecord;
use crate::category::CategorySet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

/// Complete, consistent store state.
///
/// Serializes as one JSON object keyed by category; this is also the
/// on-disk layout of the store file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    categories: BTreeMap<String, Vec<CaseRecord>>,
}

impl Snapshot {
    /// Every category in `set` mapped to an empty sequence.
    pub fn empty(set: &CategorySet) -> Self {
        Self {
            categories: set.iter().map(|name| (name.to_string(), Vec::new())).collect(),
        }
    }

    /// Add empty sequences for categories in `set` that are absent.
    ///
    /// Returns the names that were added. Existing categories are untouched.
    pub fn ensure_categories(&mut self, set: &CategorySet) -> Vec<String> {
        let mut added = Vec::new();
        for name in set.iter() {
            if !self.categories.contains_key(name) {
                self.categories.insert(name.to_string(), Vec::new());
                added.push(name.to_string());
            }
        }
        added
    }

    /// Drop later cases whose `case_number` repeats an earlier one in the
    /// same category, keeping the first occurrence and the order of the rest.
    ///
    /// Returns the number of cases dropped per affected category.
    pub fn drop_repeated_cases(&mut self) -> BTreeMap<String, usize> {
        let mut dropped = BTreeMap::new();
        for (name, cases) in &mut self.categories {
            let before = cases.len();
            let mut seen = HashSet::with_capacity(before);
            cases.retain(|case| seen.insert(case.case_number.clone()));
            if cases.len() < before {
                dropped.insert(name.clone(), before - cases.len());
            }
        }
        dropped
    }

    pub fn cases(&self, category: &str) -> Option<&[CaseRecord]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub(crate) fn cases_mut(&mut self, category: &str) -> Option<&mut Vec<CaseRecord>> {
        self.categories.get_mut(category)
    }

    /// Category names in deterministic order.
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Iterate `(category, cases)` in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CaseRecord])> {
        self.categories
            .iter()
            .map(|(name, cases)| (name.as_str(), cases.as_slice()))
    }

    pub fn total_cases(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Content digest of the canonical JSON form (`sha256:<hex>`).
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let hash = Sha256::digest(&bytes);
        let hex: String = hash.iter().map(|byte| format!("{byte:02x}")).collect();
        format!("sha256:{hex}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::OpenStatus;

    fn case(number: &str) -> CaseRecord {
        CaseRecord {
            case_number: number.to_string(),
            location: "Main St".to_string(),
            dispatch: "unit 4".to_string(),
            situation: "noise complaint".to_string(),
            open_status: OpenStatus::Open,
            stack_rank: 3,
        }
    }

    #[test]
    fn empty_snapshot_serializes_every_category() {
        let set = CategorySet::new(["police", "fire"]).expect("set should build");
        let encoded =
            serde_json::to_string(&Snapshot::empty(&set)).expect("snapshot should serialize");
        assert_eq!(encoded, r#"{"fire":[],"police":[]}"#);
    }

    #[test]
    fn ensure_categories_keeps_existing_cases() {
        let mut snapshot: Snapshot = serde_json::from_str(
            r#"{"police":[{"case_number":"P1","location":"Main St","dispatch":"unit 4","situation":"noise complaint","open_status":"open","stack_rank":3}]}"#,
        )
        .expect("snapshot should parse");
        let set = CategorySet::new(["police", "fire"]).expect("set should build");

        let added = snapshot.ensure_categories(&set);

        assert_eq!(added, vec!["fire".to_string()]);
        assert_eq!(snapshot.cases("police"), Some(&[case("P1")][..]));
        assert_eq!(snapshot.cases("fire"), Some(&[][..]));
    }

    #[test]
    fn digest_tracks_content() {
        let set = CategorySet::new(["police"]).expect("set should build");
        let empty = Snapshot::empty(&set);
        let mut filled = empty.clone();
        filled
            .cases_mut("police")
            .expect("police exists")
            .push(case("P1"));

        assert!(empty.digest().starts_with("sha256:"));
        assert_eq!(empty.digest(), Snapshot::empty(&set).digest());
        assert_ne!(empty.digest(), filled.digest());
    }

    #[test]
    fn drop_repeated_cases_keeps_first_occurrence_per_category() {
        let mut later = case("P1");
        later.stack_rank = 1;
        let mut snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "police": [case("P1"), case("P2"), later],
            "fire": [case("P1")]
        }))
        .expect("snapshot should parse");

        let dropped = snapshot.drop_repeated_cases();

        assert_eq!(dropped, BTreeMap::from([("police".to_string(), 1)]));
        assert_eq!(snapshot.cases("police"), Some(&[case("P1"), case("P2")][..]));
        assert_eq!(snapshot.cases("fire"), Some(&[case("P1")][..]));
        assert!(snapshot.drop_repeated_cases().is_empty());
    }
}
