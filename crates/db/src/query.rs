//! Filter, sort and pagination descriptors passed to a [`DocumentStore`](crate::DocumentStore).

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::{Document, StoreError};

/// Predicate applied to a single document field.
#[derive(Debug, Clone)]
pub enum Condition {
    /// The field equals the value. Numbers compare by numeric value.
    Eq(Value),
    /// The field is a string matching the pattern.
    Matches(Regex),
    /// Matches nothing.
    Never,
}

impl Condition {
    /// Case-insensitive substring match on a string field. `needle` is taken
    /// literally, never as a pattern.
    pub fn contains_ignore_case(needle: &str) -> Result<Self, StoreError> {
        let regex = RegexBuilder::new(&regex::escape(needle))
            .case_insensitive(true)
            .build()
            .map_err(|e| StoreError::InvalidQuery(e.to_string()))?;
        Ok(Self::Matches(regex))
    }

    fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Condition::Eq(expected), Some(actual)) => values_equal(expected, actual),
            (Condition::Eq(expected), None) => expected.is_null(),
            (Condition::Matches(regex), Some(Value::String(s))) => regex.is_match(s),
            (Condition::Matches(_), _) => false,
            (Condition::Never, _) => false,
        }
    }
}

/// Conjunction of field conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, Condition)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with a single equality clause.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(field, Condition::Eq(value.into()))
    }

    /// Add a clause that must hold in addition to the existing ones.
    pub fn and(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push((field.into(), condition));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(String, Condition)] {
        &self.clauses
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, condition)| condition.matches(document.get(field)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Single-field sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = compare_values(a.get(&self.field), b.get(&self.field));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Complete find request: filter, then sort, then skip, then limit.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Option<SortSpec>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate the query over documents given in store order.
    ///
    /// Sorting is stable: documents with equal keys keep their store order.
    pub fn apply<'a, I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut selected: Vec<&Document> = documents
            .into_iter()
            .filter(|doc| self.filter.matches(doc))
            .collect();

        if let Some(sort) = &self.sort {
            selected.sort_by(|a, b| sort.compare(a, b));
        }

        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        selected
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect()
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

// Missing and null sort first, then numbers, strings, objects, arrays, booleans.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
