//! Loading of initial catalog records from a JSON file.

use std::path::Path;

use anyhow::{anyhow, Context};
use bookshelf_db::DocumentStore;

use super::models::CreateBook;
use super::routes::insert_book;

/// Insert every record of the JSON array at `path`, going through the same
/// validation as the create endpoint. Returns the number of books inserted.
pub async fn load(store: &dyn DocumentStore, path: &Path) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let records: Vec<CreateBook> = serde_json::from_str(&raw)
        .with_context(|| format!("seed file {} is not a JSON array of books", path.display()))?;

    let total = records.len();
    for (index, record) in records.into_iter().enumerate() {
        insert_book(store, record)
            .await
            .map_err(|e| anyhow!("seed record {} of {} rejected: {}", index + 1, total, e))?;
    }

    Ok(total)
}
