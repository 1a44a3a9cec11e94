//! Dashboard view derived entirely from one snapshot.
//!
//! Consumers rebuild this on every change; nothing is carried over from a
//! previous snapshot.

use serde::Serialize;
use triage_store::{CaseRecord, Snapshot};

/// One case flattened for tabular display, tagged with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRow {
    #[serde(flatten)]
    pub case: CaseRecord,
    pub category: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpenStatusCounts {
    pub open: usize,
    pub closed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub total: usize,
    #[serde(flatten)]
    pub status: OpenStatusCounts,
    /// Case number with the lowest stack rank; earliest stored wins ties.
    pub top_priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub digest: String,
    pub total_cases: usize,
    pub open_status: OpenStatusCounts,
    pub categories: Vec<CategorySummary>,
    pub rows: Vec<CaseRow>,
}

impl DashboardView {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut open_status = OpenStatusCounts::default();
        let mut categories = Vec::new();
        let mut rows = Vec::with_capacity(snapshot.total_cases());

        for (category, cases) in snapshot.iter() {
            let status = count_status(cases);
            open_status.open += status.open;
            open_status.closed += status.closed;
            categories.push(CategorySummary {
                category: category.to_string(),
                total: cases.len(),
                status,
                top_priority: top_priority(cases).map(|case| case.case_number.clone()),
            });
            rows.extend(cases.iter().map(|case| CaseRow {
                case: case.clone(),
                category: category.to_string(),
            }));
        }

        Self {
            digest: snapshot.digest(),
            total_cases: rows.len(),
            open_status,
            categories,
            rows,
        }
    }

    /// One-line text summary, e.g. `3 cases (2 open, 1 closed) | fire 1 | police 2`.
    pub fn headline(&self) -> String {
        let mut line = format!(
            "{} cases ({} open, {} closed)",
            self.total_cases, self.open_status.open, self.open_status.closed
        );
        for summary in &self.categories {
            line.push_str(&format!(" | {} {}", summary.category, summary.total));
        }
        line
    }
}

fn count_status(cases: &[CaseRecord]) -> OpenStatusCounts {
    let open = cases.iter().filter(|c| c.open_status.is_open()).count();
    OpenStatusCounts {
        open,
        closed: cases.len() - open,
    }
}

fn top_priority(cases: &[CaseRecord]) -> Option<&CaseRecord> {
    cases.iter().reduce(|best, case| {
        if case.stack_rank < best.stack_rank {
            case
        } else {
            best
        }
    })
}
