//! Case record: one emergency-call case as stored in a category.
//!
//! Producers are language-model agents, so the inbound shape is loose:
//! key spelling varies (`"case number"`, `"Open-Status"`), case numbers
//! arrive as strings or integers, and open status arrives as yes/no,
//! open/closed, or a boolean. [`CaseRecord::from_json`] is the explicit
//! schema check that turns such a value into the strict stored form or a
//! list of per-field problems.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Stored field names, in serialization order.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "case_number",
    "location",
    "dispatch",
    "situation",
    "open_status",
    "stack_rank",
];

/// Whether a case still needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenStatus {
    #[serde(alias = "yes")]
    Open,
    #[serde(alias = "no")]
    Closed,
}

impl OpenStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl Display for OpenStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpenStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "yes" | "true" => Ok(Self::Open),
            "closed" | "no" | "false" => Ok(Self::Closed),
            other => Err(format!(
                "unknown open status `{other}` (expected open/closed/yes/no/true/false)"
            )),
        }
    }
}

/// A single case, as persisted in the store file.
///
/// Always written in the strict form. Reading goes through
/// [`CaseRecord::from_json`], so a hand-edited or older store file holding
/// an integer case number or a numeric-string rank still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    pub case_number: String,
    pub location: String,
    pub dispatch: String,
    pub situation: String,
    pub open_status: OpenStatus,
    /// Lower is more urgent within the category. Display attribute only;
    /// storage order is insertion order.
    pub stack_rank: u32,
}

/// One problem found while checking a field of an inbound case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldProblem {
    #[error("missing required field `{0}`")]
    Missing(&'static str),

    #[error("required field `{0}` is null")]
    Null(&'static str),

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{0}` must not be empty")]
    Empty(&'static str),
}

/// Why an inbound case was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("case must be a JSON object")]
    NotAnObject,

    #[error("{}", join_problems(.problems))]
    Invalid {
        /// Present when the case number itself was readable.
        case_number: Option<String>,
        problems: Vec<FieldProblem>,
    },
}

impl RecordError {
    pub fn case_number(&self) -> Option<&str> {
        match self {
            Self::NotAnObject => None,
            Self::Invalid { case_number, .. } => case_number.as_deref(),
        }
    }
}

fn join_problems(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl CaseRecord {
    /// Validate an inbound JSON case and convert it to the stored form.
    ///
    /// Every required field is checked; all problems are reported together
    /// rather than stopping at the first one. Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self, RecordError> {
        let Value::Object(raw) = value else {
            return Err(RecordError::NotAnObject);
        };

        let mut fields: BTreeMap<String, &Value> = BTreeMap::new();
        for (key, value) in raw {
            fields.entry(normalize_key(key)).or_insert(value);
        }

        let mut problems = Vec::new();
        let case_number = check(&fields, "case_number", &mut problems, parse_case_number);
        let location = check(&fields, "location", &mut problems, parse_text);
        let dispatch = check(&fields, "dispatch", &mut problems, parse_text);
        let situation = check(&fields, "situation", &mut problems, parse_text);
        let open_status = check(&fields, "open_status", &mut problems, parse_open_status);
        let stack_rank = check(&fields, "stack_rank", &mut problems, parse_stack_rank);

        match (
            case_number,
            location,
            dispatch,
            situation,
            open_status,
            stack_rank,
        ) {
            (
                Some(case_number),
                Some(location),
                Some(dispatch),
                Some(situation),
                Some(open_status),
                Some(stack_rank),
            ) if problems.is_empty() => Ok(Self {
                case_number,
                location,
                dispatch,
                situation,
                open_status,
                stack_rank,
            }),
            (case_number, ..) => Err(RecordError::Invalid {
                case_number,
                problems,
            }),
        }
    }
}

impl<'de> Deserialize<'de> for CaseRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(|err| match err.case_number() {
            Some(number) => serde::de::Error::custom(format!("case `{number}`: {err}")),
            None => serde::de::Error::custom(err),
        })
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

fn check<T>(
    fields: &BTreeMap<String, &Value>,
    name: &'static str,
    problems: &mut Vec<FieldProblem>,
    parse: fn(&'static str, &Value) -> Result<T, FieldProblem>,
) -> Option<T> {
    let value = match fields.get(name) {
        None => {
            problems.push(FieldProblem::Missing(name));
            return None;
        }
        Some(Value::Null) => {
            problems.push(FieldProblem::Null(name));
            return None;
        }
        Some(value) => *value,
    };
    match parse(name, value) {
        Ok(parsed) => Some(parsed),
        Err(problem) => {
            problems.push(problem);
            None
        }
    }
}

fn parse_text(field: &'static str, value: &Value) -> Result<String, FieldProblem> {
    match value {
        Value::String(text) => Ok(text.clone()),
        _ => Err(FieldProblem::WrongType {
            field,
            expected: "a string",
        }),
    }
}

fn parse_case_number(field: &'static str, value: &Value) -> Result<String, FieldProblem> {
    let number = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(n) if n.is_u64() || n.is_i64() => n.to_string(),
        _ => {
            return Err(FieldProblem::WrongType {
                field,
                expected: "a string or integer",
            });
        }
    };
    if number.is_empty() {
        return Err(FieldProblem::Empty(field));
    }
    Ok(number)
}

fn parse_open_status(field: &'static str, value: &Value) -> Result<OpenStatus, FieldProblem> {
    let wrong = FieldProblem::WrongType {
        field,
        expected: "one of open/closed/yes/no/true/false",
    };
    match value {
        Value::Bool(true) => Ok(OpenStatus::Open),
        Value::Bool(false) => Ok(OpenStatus::Closed),
        Value::String(text) => text.parse().map_err(|_| wrong),
        _ => Err(wrong),
    }
}

fn parse_stack_rank(field: &'static str, value: &Value) -> Result<u32, FieldProblem> {
    let wrong = FieldProblem::WrongType {
        field,
        expected: "a non-negative integer",
    };
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|rank| u32::try_from(rank).ok())
            .ok_or(wrong),
        Value::String(text) => text.trim().parse::<u32>().map_err(|_| wrong),
        _ => Err(wrong),
    }
}
