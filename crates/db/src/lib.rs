//! Document store interface for bookshelf.
//!
//! Modules talk to the store through [`DocumentStore`] using the descriptors in
//! [`query`]. [`MemoryStore`] is the bundled implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod memory;
pub mod query;

pub use memory::MemoryStore;
pub use query::{Condition, Filter, FindQuery, SortDirection, SortSpec};

/// Field holding the store-assigned document identifier.
pub const ID_FIELD: &str = "_id";

/// A schemaless document as stored in a collection.
pub type Document = serde_json::Map<String, Value>;

/// Store handle shared between modules and request handlers.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Unique constraint a module asks the store to enforce on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIndex {
    pub collection: &'static str,
    pub field: &'static str,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key on {collection}.{field}: {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: Value,
    },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Operations every document store backend provides.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the documents of `collection` selected by `query`, in store
    /// order unless the query sorts them.
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    /// Return the first document matching `filter`.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let query = FindQuery::new().filter(filter.clone()).limit(1);
        Ok(self.find(collection, &query).await?.into_iter().next())
    }

    /// Insert a document, assigning [`ID_FIELD`] when it is absent, and return
    /// the stored document. Fails with [`StoreError::DuplicateKey`] when a
    /// unique index would be violated.
    async fn insert_one(&self, collection: &str, document: Document)
        -> Result<Document, StoreError>;

    /// Enforce uniqueness of `index.field` within `index.collection` for all
    /// subsequent inserts.
    async fn create_unique_index(&self, index: &UniqueIndex) -> Result<(), StoreError>;
}
