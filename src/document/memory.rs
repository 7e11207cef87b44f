//! In-memory document store implementation using `DashMap`.
//!
//! Data is lost on process restart. Use [`super::DirectoryDocumentStore`]
//! for persistence.

use super::{document_id, paginate, Document, DocumentFilter, DocumentStore};
use crate::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-memory document store using a concurrent hashmap.
///
/// # Example
///
/// ```rust
/// use modelrun_db::document::{DocumentStore, MemoryDocumentStore};
/// use serde_json::json;
///
/// # fn example() -> modelrun_db::Result<()> {
/// let store = MemoryDocumentStore::new();
/// store.insert(json!({"_id": "run-1", "active": true}))?;
/// assert!(store.find_by_id("run-1")?.is_some());
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug)]
pub struct MemoryDocumentStore {
    documents: DashMap<String, Document>,
}

impl MemoryDocumentStore {
    /// Create a new in-memory document store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Get the number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Remove all documents.
    pub fn clear(&self) {
        self.documents.clear();
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn insert(&self, document: Document) -> Result<()> {
        let identifier = document_id(&document)?.to_string();
        match self.documents.entry(identifier) {
            Entry::Occupied(entry) => Err(Error::StorageError(format!(
                "duplicate document identifier: {}",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(document);
                Ok(())
            }
        }
    }

    fn replace_by_id(&self, identifier: &str, document: Document) -> Result<()> {
        match self.documents.get_mut(identifier) {
            Some(mut existing) => {
                *existing = document;
                Ok(())
            }
            None => Err(Error::StorageError(format!(
                "cannot replace missing document: {identifier}"
            ))),
        }
    }

    fn find_by_id(&self, identifier: &str) -> Result<Option<Document>> {
        Ok(self.documents.get(identifier).map(|d| d.value().clone()))
    }

    fn find_many(
        &self,
        filter: &DocumentFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<(Vec<Document>, usize)> {
        let matching = self
            .documents
            .iter()
            .filter(|d| filter.matches(d.value()))
            .map(|d| d.value().clone())
            .collect();
        Ok(paginate(matching, limit, offset))
    }

    fn delete_by_id(&self, identifier: &str) -> Result<bool> {
        Ok(self.documents.remove(identifier).is_some())
    }
}
