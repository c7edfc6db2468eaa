//! End-to-end tests of the books endpoints through the full router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bookshelf_db::{MemoryStore, SharedStore};
use bookshelf_kernel::{settings::Settings, InitCtx};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_router() -> Router {
    let settings = Settings::default();
    let store: SharedStore = Arc::new(MemoryStore::new());
    let registry = bookshelf_app::registry();
    let ctx = InitCtx {
        settings: &settings,
        store,
    };
    bookshelf_app::prepare(&registry, &ctx)
        .await
        .expect("modules should start");
    bookshelf_http::build_router(&registry, &ctx)
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: Body,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let response = router
        .clone()
        .oneshot(builder.body(body).expect("request should build"))
        .await
        .expect("router is infallible");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body should be readable");
    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, parsed)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, None, Body::empty()).await
}

async fn post_book(router: &Router, book: Value) -> (StatusCode, Value) {
    send(
        router,
        Method::POST,
        "/books",
        Some("application/json"),
        Body::from(book.to_string()),
    )
    .await
}

fn book(isbn: &str, title: &str, author: &str, year: i64, category: &str) -> Value {
    json!({
        "isbn": isbn,
        "title": title,
        "author": author,
        "year": year,
        "category": category,
    })
}

async fn stocked_router() -> Router {
    let router = test_router().await;
    for entry in [
        book("1", "Neuromancer", "William Gibson", 1984, "Science Fiction"),
        book("2", "Beloved", "Toni Morrison", 1987, "Fiction"),
        book("3", "The Guns of August", "Barbara Tuchman", 1962, "History"),
        book("4", "Count Zero", "William Gibson", 1986, "Science Fiction"),
        book("5", "Jazz", "Toni Morrison", 1992, "Fiction"),
    ] {
        let (status, _) = post_book(&router, entry).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    router
}

fn field<'a>(books: &'a Value, name: &str) -> Vec<&'a Value> {
    books
        .as_array()
        .expect("expected an array")
        .iter()
        .map(|b| &b[name])
        .collect()
}

fn isbns(books: &Value) -> Vec<&str> {
    field(books, "isbn")
        .into_iter()
        .filter_map(Value::as_str)
        .collect()
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn create_then_lookup_by_isbn() {
    let router = test_router().await;

    let (status, created) = post_book(
        &router,
        book("978-0", "Dune", "Frank Herbert", 1965, "Science Fiction"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["_id"].is_string());
    assert!(created["createdAt"].is_string());
    assert_eq!(created["createdAt"], created["updatedAt"]);

    let (status, found) = get(&router, "/books/isbn/978-0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, created);
    assert_eq!(found["title"], "Dune");
    assert_eq!(found["year"], 1965);
}

#[tokio::test]
async fn unknown_isbn_is_not_found() {
    let router = stocked_router().await;
    let (status, body) = get(&router, "/books/isbn/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "not_found");
    assert_eq!(body["error"]["message"], "Book not found");
}

#[tokio::test]
async fn every_required_field_is_enforced() {
    let router = test_router().await;
    let complete = book("1", "Dune", "Frank Herbert", 1965, "Science Fiction");

    for missing in ["isbn", "title", "author", "year", "category"] {
        let mut payload = complete.clone();
        payload.as_object_mut().unwrap().remove(missing);
        let (status, body) = post_book(&router, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "without {missing}");
        assert_eq!(body["error"]["message"], "All fields are required");
    }

    for (name, falsy) in [("title", json!("")), ("year", json!(0)), ("isbn", json!(null))] {
        let mut payload = complete.clone();
        payload[name] = falsy;
        let (status, _) = post_book(&router, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "falsy {name}");
    }

    let (status, books) = get(&router, "/books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn year_must_lie_in_range() {
    let router = test_router().await;

    for (isbn, year) in [("a", 1899), ("b", 2026), ("c", -5)] {
        let (status, body) = post_book(&router, book(isbn, "T", "A", year, "C")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "year {year}");
        assert_eq!(error_code(&body), "validation_error");
        assert_eq!(body["error"]["message"], "Year must be between 1900 and 2025");
    }

    for (isbn, year) in [("d", 1900), ("e", 2025)] {
        let (status, created) = post_book(&router, book(isbn, "T", "A", year, "C")).await;
        assert_eq!(status, StatusCode::CREATED, "year {year}");
        assert_eq!(created["year"], year);
    }
}

#[tokio::test]
async fn duplicate_isbn_is_rejected() {
    let router = test_router().await;
    let payload = book("42", "Hitchhiker", "Douglas Adams", 1979, "Comedy");

    let (first, _) = post_book(&router, payload.clone()).await;
    assert_eq!(first, StatusCode::CREATED);

    let (second, body) = post_book(&router, payload).await;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "duplicate_key");
    assert_eq!(body["error"]["message"], "Book with this ISBN already exists");
}

#[tokio::test]
async fn concurrent_duplicates_create_one_book() {
    let router = test_router().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let (status, _) = post_book(
                &router,
                book("race", &format!("Copy {i}"), "Anon", 2000, "Misc"),
            )
            .await;
            status
        }));
    }

    let mut created = 0;
    for handle in handles {
        let status = handle.await.unwrap();
        if status == StatusCode::CREATED {
            created += 1;
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }
    assert_eq!(created, 1);

    let (_, books) = get(&router, "/books").await;
    assert_eq!(isbns(&books), vec!["race"]);
}

#[tokio::test]
async fn writes_require_json_content_type() {
    let router = test_router().await;
    let payload = book("1", "Dune", "Frank Herbert", 1965, "Science Fiction").to_string();

    for content_type in [None, Some("text/plain"), Some("application/json; charset=utf-8")] {
        let (status, body) = send(
            &router,
            Method::POST,
            "/books",
            content_type,
            Body::from(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{content_type:?}");
        assert_eq!(error_code(&body), "unsupported_media_type");
        assert_eq!(body["error"]["message"], "Content-Type must be application/json");
    }

    let (status, books) = get(&router, "/books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let router = test_router().await;

    let (status, _) = send(
        &router,
        Method::POST,
        "/books",
        Some("application/json"),
        Body::from("{not json"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_book(
        &router,
        json!({"isbn": "1", "title": "T", "author": "A", "year": "soon", "category": "C"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");
}

#[tokio::test]
async fn search_matches_category_case_insensitively() {
    let router = stocked_router().await;

    let (status, body) = get(&router, "/books/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "missing_parameter");
    assert_eq!(body["error"]["message"], "Category is required");

    let (status, _) = get(&router, "/books/search?category=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, books) = get(&router, "/books/search?category=fic").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&books), vec!["1", "2", "4", "5"]);

    let (_, books) = get(&router, "/books/search?category=HISTORY").await;
    assert_eq!(isbns(&books), vec!["3"]);

    let (_, books) = get(&router, "/books/search?category=.%2A").await;
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn sort_orders_books() {
    let router = stocked_router().await;

    let (status, books) = get(&router, "/books/sort").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&books), vec!["3", "1", "4", "2", "5"]);

    let (_, books) = get(&router, "/books/sort?by=title&order=desc").await;
    assert_eq!(isbns(&books), vec!["3", "1", "5", "4", "2"]);

    let (_, books) = get(&router, "/books/sort?by=author").await;
    assert_eq!(isbns(&books), vec!["3", "2", "5", "1", "4"]);
}

#[tokio::test]
async fn sort_by_unknown_field_falls_back_to_year() {
    let router = test_router().await;
    for entry in [
        book("a", "First", "X", 2000, "C"),
        book("b", "Second", "Y", 1990, "C"),
        book("c", "Third", "Z", 2000, "C"),
        book("d", "Fourth", "W", 1990, "C"),
    ] {
        post_book(&router, entry).await;
    }

    let (status, books) = get(&router, "/books/sort?by=price&order=desc").await;
    assert_eq!(status, StatusCode::OK);
    // Equal years keep their insertion order.
    assert_eq!(isbns(&books), vec!["a", "c", "b", "d"]);

    let (_, books) = get(&router, "/books/sort?by=price").await;
    assert_eq!(isbns(&books), vec!["b", "d", "a", "c"]);
}

#[tokio::test]
async fn stats_require_books() {
    let router = test_router().await;
    let (status, body) = get(&router, "/books/stats").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "No books found");
}

#[tokio::test]
async fn stats_cover_every_book_in_store_order() {
    let router = stocked_router().await;
    let (status, stats) = get(&router, "/books/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalBooks"], 5);
    assert_eq!(stats["year"], json!([1984, 1987, 1962, 1986, 1992]));
    assert_eq!(
        stats["category"],
        json!(["Science Fiction", "Fiction", "History", "Science Fiction", "Fiction"])
    );
}

#[tokio::test]
async fn filter_by_year_and_author() {
    let router = stocked_router().await;

    let (status, books) = get(&router, "/books/filter").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&books).len(), 5);

    let (_, books) = get(&router, "/books/filter?author=gibson").await;
    assert_eq!(isbns(&books), vec!["1", "4"]);

    let (_, books) = get(&router, "/books/filter?year=1986&author=gibson").await;
    assert_eq!(isbns(&books), vec!["4"]);

    let (_, books) = get(&router, "/books/filter?year=1987&author=gibson").await;
    assert_eq!(books, json!([]));

    let (status, books) = get(&router, "/books/filter?year=soon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn list_paginates_only_when_asked() {
    let router = test_router().await;
    for i in 0..12 {
        let (status, _) = post_book(&router, book(&format!("{i:02}"), "T", "A", 2000, "C")).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, books) = get(&router, "/books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&books).len(), 12);

    let (_, books) = get(&router, "/books?page=2&limit=5").await;
    assert_eq!(isbns(&books), vec!["05", "06", "07", "08", "09"]);

    let (_, books) = get(&router, "/books?page=2").await;
    assert_eq!(isbns(&books), vec!["10", "11"]);

    let (_, books) = get(&router, "/books?limit=abc").await;
    assert_eq!(isbns(&books).len(), 10);

    let (_, books) = get(&router, "/books?page=9&limit=5").await;
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn framework_routes_are_served() {
    let router = test_router().await;

    let (status, body) = get(&router, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));

    let (status, body) = get(&router, "/books/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("books module is healthy".to_string()));

    let (status, doc) = get(&router, "/docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/books"]["post"].is_object());
    assert!(doc["paths"]["/books/isbn/{isbn}"]["get"].is_object());
    assert!(doc["components"]["schemas"]["Book"].is_object());

    let (status, body) = get(&router, "/shelves").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "not_found");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let router = test_router().await;
    let request = Request::builder()
        .uri("/books")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn repeated_query_keys_use_the_first_value() {
    let router = stocked_router().await;

    let (status, books) = get(&router, "/books/sort?by=title&by=year").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&books), vec!["2", "4", "5", "1", "3"]);

    let (status, books) = get(&router, "/books/filter?year=1986&year=1984").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&books), vec!["4"]);

    let (status, books) = get(&router, "/books?page=2&page=1&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&books), vec!["3", "4"]);

    let (status, books) = get(&router, "/books/search?category=hist&category=fic").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&books), vec!["3"]);
}

#[tokio::test]
async fn create_coerces_scalar_fields() {
    let router = test_router().await;

    let (status, created) = post_book(
        &router,
        json!({
            "isbn": 123,
            "title": "Dune",
            "author": "Frank Herbert",
            "year": "2000",
            "category": "Science Fiction"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["isbn"], "123");
    assert_eq!(created["year"], 2000);

    let (status, found) = get(&router, "/books/isbn/123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["year"], 2000);

    let (status, body) = post_book(
        &router,
        json!({ "isbn": "9", "title": "T", "author": "A", "year": "1800", "category": "C" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Year must be between 1900 and 2025");

    let (status, body) = post_book(
        &router,
        json!({ "isbn": "9", "title": "T", "author": "A", "year": "", "category": "C" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "All fields are required");
}
