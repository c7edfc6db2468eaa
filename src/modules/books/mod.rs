pub mod models;
pub mod query;
pub mod routes;
pub mod seed;
pub mod validate;

use async_trait::async_trait;
use axum::Router;
use bookshelf_db::UniqueIndex;
use bookshelf_kernel::{InitCtx, Module};
use serde_json::{json, Value};

use models::COLLECTION;
use routes::BooksState;

/// Books module: the catalog endpoints and their store collection
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );

        if let Some(path) = &ctx.settings.database.seed_path {
            let inserted = seed::load(ctx.store.as_ref(), path).await?;
            tracing::info!(
                module = self.name(),
                seed = %path.display(),
                inserted,
                "seed books loaded"
            );
        }

        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        routes::router(BooksState {
            store: ctx.store.clone(),
        })
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    fn indexes(&self) -> Vec<UniqueIndex> {
        vec![UniqueIndex {
            collection: COLLECTION,
            field: "isbn",
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn error_response(description: &str) -> Value {
    json_response(
        description,
        json!({ "$ref": "#/components/schemas/ErrorResponse" }),
    )
}

fn query_parameter(name: &str, description: &str, required: bool) -> Value {
    json!({
        "name": name,
        "in": "query",
        "required": required,
        "description": description,
        "schema": { "type": "string" }
    })
}

fn book_list() -> Value {
    json!({ "type": "array", "items": { "$ref": "#/components/schemas/Book" } })
}

fn openapi_fragment() -> Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "description": "Returns every book, or one page when `page` or `limit` is given.",
                    "tags": ["Books"],
                    "parameters": [
                        query_parameter("page", "1-based page number, default 1", false),
                        query_parameter("limit", "Page size, default 10", false)
                    ],
                    "responses": {
                        "200": json_response("List of books", book_list()),
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateBook" }
                            }
                        }
                    },
                    "responses": {
                        "201": json_response("Created book", json!({ "$ref": "#/components/schemas/Book" })),
                        "400": error_response("Missing fields, year out of range, duplicate ISBN or wrong content type")
                    }
                }
            },
            "/search": {
                "get": {
                    "summary": "Search books by category",
                    "tags": ["Books"],
                    "parameters": [
                        query_parameter("category", "Case-insensitive substring of the category", true)
                    ],
                    "responses": {
                        "200": json_response("Matching books", book_list()),
                        "400": error_response("Category is required")
                    }
                }
            },
            "/isbn/{isbn}": {
                "get": {
                    "summary": "Get a book by ISBN",
                    "tags": ["Books"],
                    "parameters": [{
                        "name": "isbn",
                        "in": "path",
                        "required": true,
                        "schema": { "type": "string" }
                    }],
                    "responses": {
                        "200": json_response("The book", json!({ "$ref": "#/components/schemas/Book" })),
                        "404": error_response("Book not found"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/sort": {
                "get": {
                    "summary": "List books sorted by one field",
                    "tags": ["Books"],
                    "parameters": [
                        query_parameter("by", "year, title or author; anything else sorts by year", false),
                        query_parameter("order", "asc (default) or desc", false)
                    ],
                    "responses": {
                        "200": json_response("Sorted books", book_list())
                    }
                }
            },
            "/stats": {
                "get": {
                    "summary": "Years and categories of every book",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Catalog statistics", json!({ "$ref": "#/components/schemas/BookStats" })),
                        "404": error_response("No books found")
                    }
                }
            },
            "/filter": {
                "get": {
                    "summary": "Filter books by year and author",
                    "tags": ["Books"],
                    "parameters": [
                        query_parameter("year", "Exact publication year", false),
                        query_parameter("author", "Case-insensitive substring of the author", false)
                    ],
                    "responses": {
                        "200": json_response("Matching books", book_list())
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "_id": { "type": "string", "description": "Store-assigned identifier" },
                        "isbn": { "type": "string" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "year": { "type": "integer", "minimum": 1900, "maximum": 2025 },
                        "category": { "type": "string" },
                        "createdAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" }
                    },
                    "required": ["_id", "isbn", "title", "author", "year", "category", "createdAt", "updatedAt"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "isbn": { "type": "string" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "year": { "type": "integer", "minimum": 1900, "maximum": 2025 },
                        "category": { "type": "string" }
                    },
                    "required": ["isbn", "title", "author", "year", "category"]
                },
                "BookStats": {
                    "type": "object",
                    "properties": {
                        "year": { "type": "array", "items": { "type": "integer" } },
                        "category": { "type": "array", "items": { "type": "string" } },
                        "totalBooks": { "type": "integer" }
                    },
                    "required": ["year", "category", "totalBooks"]
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}
