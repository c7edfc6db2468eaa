//! In-process document store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{Document, DocumentStore, FindQuery, StoreError, UniqueIndex, ID_FIELD};

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Document>,
    unique_fields: Vec<String>,
}

impl Collection {
    fn conflict<'a>(&self, document: &'a Document) -> Option<(&str, &'a Value)> {
        self.unique_fields.iter().find_map(|field| {
            let value = document.get(field).filter(|v| !v.is_null())?;
            self.documents
                .iter()
                .any(|existing| existing.get(field) == Some(value))
                .then_some((field.as_str(), value))
        })
    }
}

/// Document store keeping every collection in memory, in insertion order.
///
/// Unique checks and the insert happen under the same write lock, so
/// concurrent inserts of the same key cannot both succeed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |c| c.documents.len())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| query.apply(&c.documents))
            .unwrap_or_default())
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();

        if let Some((field, value)) = target.conflict(&document) {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                field: field.to_string(),
                value: value.clone(),
            });
        }

        if !document.contains_key(ID_FIELD) {
            document.insert(
                ID_FIELD.to_string(),
                Value::String(Uuid::now_v7().to_string()),
            );
        }

        target.documents.push(document.clone());
        tracing::debug!(collection, "document inserted");
        Ok(document)
    }

    async fn create_unique_index(&self, index: &UniqueIndex) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let target = collections.entry(index.collection.to_string()).or_default();

        if target.unique_fields.iter().any(|f| f == index.field) {
            return Ok(());
        }

        let mut seen: Vec<&Value> = Vec::new();
        for value in target
            .documents
            .iter()
            .filter_map(|d| d.get(index.field))
            .filter(|v| !v.is_null())
        {
            if seen.contains(&value) {
                return Err(StoreError::DuplicateKey {
                    collection: index.collection.to_string(),
                    field: index.field.to_string(),
                    value: value.clone(),
                });
            }
            seen.push(value);
        }

        target.unique_fields.push(index.field.to_string());
        tracing::info!(
            collection = index.collection,
            field = index.field,
            "unique index created"
        );
        Ok(())
    }
}
