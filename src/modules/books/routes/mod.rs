//! HTTP handlers for the books module.

use anyhow::Context;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookshelf_db::{DocumentStore, Filter, FindQuery, SharedStore, StoreError};
use bookshelf_http::error::AppError;

use super::models::{Book, BookStats, CreateBook, COLLECTION};
use super::query::{self, FilterParams, ListParams, QueryPairs, SearchParams, SortParams};
use super::validate;

/// Shared state of the books routes.
#[derive(Clone)]
pub struct BooksState {
    pub store: SharedStore,
}

/// Routes of the books module, relative to its mount point.
pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/search", get(search_books))
        .route("/isbn/{isbn}", get(get_book_by_isbn))
        .route("/sort", get(sort_books))
        .route("/stats", get(book_stats))
        .route("/filter", get(filter_books))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn find_books(store: &dyn DocumentStore, query: &FindQuery) -> Result<Vec<Book>, AppError> {
    let documents = store.find(COLLECTION, query).await?;
    let books = documents
        .into_iter()
        .map(Book::from_document)
        .collect::<Result<Vec<_>, _>>()
        .context("stored book is malformed")?;
    Ok(books)
}

/// Query-string pairs of the request. Parameters are read leniently from
/// these, so repeated keys never fail a request.
fn query_pairs(query: Result<Query<QueryPairs>, QueryRejection>) -> Result<QueryPairs, AppError> {
    query
        .map(|Query(pairs)| pairs)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// Validate and store a new book, returning it as stored.
pub async fn insert_book(store: &dyn DocumentStore, payload: CreateBook) -> Result<Book, AppError> {
    let new_book = validate::validate_new_book(store, payload).await?;
    let isbn = new_book.isbn.clone();
    let document = new_book
        .into_document()
        .context("failed to encode book")?;

    let stored = match store.insert_one(COLLECTION, document).await {
        Ok(stored) => stored,
        Err(StoreError::DuplicateKey { .. }) => return Err(validate::duplicate_isbn(&isbn)),
        Err(e) => return Err(AppError::bad_request(e.to_string())),
    };

    let book = Book::from_document(stored).context("stored book is malformed")?;
    tracing::info!(module = "books", isbn = %book.isbn, id = %book.id, "book created");
    Ok(book)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

/// All books, or one page of them when `page` or `limit` is given
async fn list_books(
    State(state): State<BooksState>,
    raw_query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let params = ListParams::from_pairs(&query_pairs(raw_query)?);
    let books = find_books(state.store.as_ref(), &query::list_query(&params)).await?;
    Ok(Json(books))
}

async fn search_books(
    State(state): State<BooksState>,
    raw_query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let params = SearchParams::from_pairs(&query_pairs(raw_query)?);
    let category = validate::require_category(&params)?;
    let query = query::search_query(category)?;
    let books = find_books(state.store.as_ref(), &query).await?;
    Ok(Json(books))
}

async fn get_book_by_isbn(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
) -> Result<Json<Book>, AppError> {
    let document = state
        .store
        .find_one(COLLECTION, &Filter::eq("isbn", isbn))
        .await?
        .ok_or_else(|| AppError::not_found("Book not found"))?;

    let book = Book::from_document(document).context("stored book is malformed")?;
    Ok(Json(book))
}

async fn create_book(
    State(state): State<BooksState>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(payload) = payload.map_err(|rejection| match rejection {
        JsonRejection::JsonDataError(e) => AppError::validation(vec![], e.body_text()),
        other => AppError::bad_request(other.body_text()),
    })?;

    let book = insert_book(state.store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn sort_books(
    State(state): State<BooksState>,
    raw_query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let params = SortParams::from_pairs(&query_pairs(raw_query)?);
    let books = find_books(state.store.as_ref(), &query::sort_query(&params)).await?;
    Ok(Json(books))
}

async fn book_stats(State(state): State<BooksState>) -> Result<Json<BookStats>, AppError> {
    let books = find_books(state.store.as_ref(), &FindQuery::new()).await?;
    if books.is_empty() {
        return Err(AppError::not_found("No books found"));
    }
    Ok(Json(BookStats::from_books(&books)))
}

async fn filter_books(
    State(state): State<BooksState>,
    raw_query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let params = FilterParams::from_pairs(&query_pairs(raw_query)?);
    let query = query::filter_query(&params)?;
    let books = find_books(state.store.as_ref(), &query).await?;
    Ok(Json(books))
}
