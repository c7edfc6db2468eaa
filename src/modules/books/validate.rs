//! Per-endpoint request checks.

use bookshelf_db::{DocumentStore, Filter};
use bookshelf_http::error::AppError;
use serde_json::json;

use super::models::{BookValidationError, CreateBook, NewBook, COLLECTION};
use super::query::{QueryError, SearchParams};

impl From<BookValidationError> for AppError {
    fn from(err: BookValidationError) -> Self {
        AppError::validation(err.details(), err.to_string())
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::MissingCategory => AppError::missing_parameter(err.to_string()),
            QueryError::Store(e) => e.into(),
        }
    }
}

/// Error reported when a book with `isbn` already exists.
pub fn duplicate_isbn(isbn: &str) -> AppError {
    AppError::duplicate_key(
        vec![json!({ "field": "isbn", "value": isbn })],
        "Book with this ISBN already exists",
    )
}

/// Check a create request: required fields, year range, and ISBN not taken.
///
/// The ISBN lookup gives a clean error for the common case; the unique index
/// on `isbn` still guards the insert against a concurrent create.
pub async fn validate_new_book(
    store: &dyn DocumentStore,
    payload: CreateBook,
) -> Result<NewBook, AppError> {
    let book = NewBook::try_from(payload)?;

    let existing = store
        .find_one(COLLECTION, &Filter::eq("isbn", book.isbn.as_str()))
        .await?;
    if existing.is_some() {
        return Err(duplicate_isbn(&book.isbn));
    }

    Ok(book)
}

/// The `category` a search needs; absent or empty is an error.
pub fn require_category(params: &SearchParams) -> Result<&str, AppError> {
    params
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| QueryError::MissingCategory.into())
}
