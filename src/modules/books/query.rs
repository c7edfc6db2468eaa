//! Translation of query-string parameters into store descriptors.
//!
//! Parameters arrive as raw text and are parsed leniently: a value that does
//! not parse falls back to its default instead of failing the request.

use bookshelf_db::{Condition, Filter, FindQuery, SortDirection, SortSpec, StoreError};
use serde_json::{Number, Value};
use thiserror::Error;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Fields a listing may be sorted by.
pub const SORT_FIELDS: &[&str] = &["year", "title", "author"];
pub const DEFAULT_SORT_FIELD: &str = "year";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Category is required")]
    MissingCategory,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SortParams {
    pub by: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    pub year: Option<String>,
    pub author: Option<String>,
}

/// Query-string pairs in request order. Repeated keys are kept; the params
/// structs below take the first value of each key.
pub type QueryPairs = Vec<(String, String)>;

fn first(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.clone())
}

impl ListParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            page: first(pairs, "page"),
            limit: first(pairs, "limit"),
        }
    }
}

impl SearchParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            category: first(pairs, "category"),
        }
    }
}

impl SortParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            by: first(pairs, "by"),
            order: first(pairs, "order"),
        }
    }
}

impl FilterParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            year: first(pairs, "year"),
            author: first(pairs, "author"),
        }
    }
}

/// Resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Parse the leading integer of `raw`, ignoring leading whitespace and any
/// trailing garbage (`"12abc"` is 12).
fn leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Positive integer from `raw`, or `default` when absent, unparseable or not positive.
pub fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(leading_int)
        .and_then(|v| u64::try_from(v).ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Page window requested by `params`, or `None` when neither `page` nor
/// `limit` was given and the whole collection is wanted.
pub fn pagination(params: &ListParams) -> Option<Page> {
    if params.page.is_none() && params.limit.is_none() {
        return None;
    }
    Some(Page {
        page: positive_or(params.page.as_deref(), DEFAULT_PAGE),
        limit: positive_or(params.limit.as_deref(), DEFAULT_LIMIT),
    })
}

pub fn list_query(params: &ListParams) -> FindQuery {
    match pagination(params) {
        Some(page) => FindQuery::new().skip(page.skip()).limit(page.limit),
        None => FindQuery::new(),
    }
}

/// Case-insensitive substring search on `category`.
pub fn search_query(category: &str) -> Result<FindQuery, QueryError> {
    if category.is_empty() {
        return Err(QueryError::MissingCategory);
    }
    let condition = Condition::contains_ignore_case(category)?;
    Ok(FindQuery::new().filter(Filter::new().and("category", condition)))
}

pub fn sort_spec(params: &SortParams) -> SortSpec {
    let field = params
        .by
        .as_deref()
        .filter(|by| SORT_FIELDS.contains(by))
        .unwrap_or(DEFAULT_SORT_FIELD);
    let direction = match params.order.as_deref() {
        Some("desc") => SortDirection::Descending,
        _ => SortDirection::Ascending,
    };
    SortSpec::new(field, direction)
}

pub fn sort_query(params: &SortParams) -> FindQuery {
    FindQuery::new().sort(sort_spec(params))
}

/// Exact year match. Text that is not a finite number yields a condition
/// that matches nothing.
fn year_condition(raw: &str) -> Condition {
    let trimmed = raw.trim();
    if let Ok(year) = trimmed.parse::<i64>() {
        return Condition::Eq(Value::from(year));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(|n| Condition::Eq(Value::Number(n)))
        .unwrap_or(Condition::Never)
}

/// Conjunction of the optional `year` and `author` filters; absent or empty
/// parameters do not filter.
pub fn filter_query(params: &FilterParams) -> Result<FindQuery, QueryError> {
    let mut filter = Filter::new();

    if let Some(year) = params.year.as_deref().filter(|y| !y.is_empty()) {
        filter = filter.and("year", year_condition(year));
    }
    if let Some(author) = params.author.as_deref().filter(|a| !a.is_empty()) {
        filter = filter.and("author", Condition::contains_ignore_case(author)?);
    }

    Ok(FindQuery::new().filter(filter))
}
