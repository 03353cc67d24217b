use std::sync::LazyLock;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::report::issue::{Issue, Meta, Project, Subject, Tool, DATE_FORMAT};
use crate::report::severity::Severity;

/// Canonical flat field list: first-level fields, then `tool_*`, `subject_*`,
/// `project_*` and `meta_*`, each in declaration order. This is also the
/// column order of tabular exports.
pub static FLAT_FIELDS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    [
        Issue::FIELDS,
        Tool::FIELDS,
        Subject::FIELDS,
        Project::FIELDS,
        Meta::FIELDS,
    ]
    .concat()
});

/// Default fields used to compute the issue identity hash
pub const HASH_FIELDS: &[&str] = &["tool_identifier", "subject_identifier", "identifier"];

/// Intersect requested field names with the canonical list.
///
/// Names are trimmed, unknown names are dropped silently and the result
/// follows the canonical order.
pub fn select_fields<S: AsRef<str>>(requested: &[S]) -> Vec<&'static str> {
    FLAT_FIELDS
        .iter()
        .copied()
        .filter(|field| requested.iter().any(|r| r.as_ref().trim() == *field))
        .collect()
}

/// Same as [`select_fields`] for a comma-separated list
pub fn select_fields_str(requested: &str) -> Vec<&'static str> {
    let names: Vec<&str> = requested.split(',').collect();
    select_fields(&names)
}

/// The value of a single flat field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Count(u32),
    Date(NaiveDateTime),
    Severity(Severity),
    /// Optional value not set (no date, no hash, no metadata yet)
    Absent,
}

impl FieldValue<'_> {
    pub fn from_date(date: Option<NaiveDateTime>) -> Self {
        date.map_or(FieldValue::Absent, FieldValue::Date)
    }

    /// JSON form: counts stay numbers, absent values become null
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.to_string()),
            FieldValue::Count(n) => Value::from(*n),
            FieldValue::Date(_) | FieldValue::Severity(_) => Value::String(self.to_string()),
            FieldValue::Absent => Value::Null,
        }
    }
}

impl std::fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Count(n) => write!(f, "{}", n),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            FieldValue::Severity(s) => write!(f, "{}", s.identifier()),
            FieldValue::Absent => Ok(()),
        }
    }
}

/// An issue flattened to a single level, in canonical field order
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIssue<'a> {
    entries: Vec<(&'static str, FieldValue<'a>)>,
}

impl<'a> FlatIssue<'a> {
    pub(crate) fn new(entries: Vec<(&'static str, FieldValue<'a>)>) -> Self {
        FlatIssue { entries }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue<'a>> {
        self.entries.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    /// Values for the given projection, in projection order.
    /// Fields missing from the issue render as empty text.
    pub fn project(&self, fields: &[&str]) -> Vec<String> {
        fields
            .iter()
            .map(|f| self.get(f).map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }

    /// JSON object restricted to the given projection
    pub fn to_json(&self, fields: &[&str]) -> Map<String, Value> {
        fields
            .iter()
            .map(|f| {
                let value = self.get(f).map_or(Value::Null, FieldValue::to_json);
                (f.to_string(), value)
            })
            .collect()
    }
}
