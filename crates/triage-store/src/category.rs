//! Recognised category set.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Categories a fresh store starts with when none are configured.
pub const DEFAULT_CATEGORIES: [&str; 5] = ["wildlife", "police", "water", "fire", "medical"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    #[error("invalid category name `{0}` (expected lowercase [a-z][a-z0-9_-]*, at most 64 chars)")]
    InvalidName(String),

    #[error("category set must not be empty")]
    Empty,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9_-]{0,63}$").expect("category name pattern should compile")
    })
}

/// Whether `name` is a syntactically valid category name.
pub fn is_valid_category_name(name: &str) -> bool {
    name_pattern().is_match(name)
}

/// The fixed set of categories a store accepts merges for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CategorySet {
    names: BTreeSet<String>,
}

impl CategorySet {
    pub fn new<I, S>(names: I) -> Result<Self, CategoryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for name in names {
            let name = name.into();
            if !is_valid_category_name(&name) {
                return Err(CategoryError::InvalidName(name));
            }
            set.insert(name);
        }
        if set.is_empty() {
            return Err(CategoryError::Empty);
        }
        Ok(Self { names: set })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self {
            names: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for CategorySet {
    type Error = CategoryError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<CategorySet> for Vec<String> {
    fn from(set: CategorySet) -> Self {
        set.names.into_iter().collect()
    }
}
