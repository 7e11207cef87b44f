//! Document store contract
//!
//! Records are persisted as flat JSON documents keyed by their `_id` field.
//! Two backends are provided:
//! - [`MemoryDocumentStore`]: `DashMap`-backed, data is lost on process exit
//! - [`DirectoryDocumentStore`]: one JSON file per document on local disk
//!
//! # Example
//!
//! ```rust
//! use modelrun_db::document::{DocumentFilter, DocumentStore, MemoryDocumentStore};
//! use serde_json::json;
//!
//! # fn example() -> modelrun_db::Result<()> {
//! let store = MemoryDocumentStore::new();
//! store.insert(json!({"_id": "a", "timestamp": "1", "properties": {"state": "IDLE"}}))?;
//! store.insert(json!({"_id": "b", "timestamp": "2", "properties": {"state": "RUNNING"}}))?;
//!
//! let filter = DocumentFilter::new().property("state", "IDLE");
//! let (items, total) = store.find_many(&filter, None, 0)?;
//! assert_eq!(total, 1);
//! assert_eq!(items[0]["_id"], "a");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod directory;
mod memory;

pub use directory::DirectoryDocumentStore;
pub use memory::MemoryDocumentStore;

use crate::{Error, Result};
use serde_json::Value;

/// A stored JSON document. Top-level objects with a string `_id` field.
pub type Document = Value;

/// Name of the identifier field in every document.
pub const ID_FIELD: &str = "_id";

/// Conjunction of equality clauses on JSON pointers into a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    clauses: Vec<(String, Value)>,
}

impl DocumentFilter {
    /// Create a filter that matches every document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the value at `pointer` (RFC 6901, e.g. `/experiment`) to
    /// equal `value`.
    #[must_use]
    pub fn eq(mut self, pointer: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((pointer.into(), value.into()));
        self
    }

    /// Require the property `key` to equal `value`.
    #[must_use]
    pub fn property(self, key: &str, value: impl Into<Value>) -> Self {
        let escaped = key.replace('~', "~0").replace('/', "~1");
        self.eq(format!("/properties/{escaped}"), value)
    }

    /// Check whether a document satisfies every clause.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(pointer, value)| document.pointer(pointer) == Some(value))
    }

    /// Check if the filter has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Storage backend for JSON documents in a single flat collection.
///
/// All operations are blocking. Errors are propagated, never swallowed.
pub trait DocumentStore: Send + Sync {
    /// Insert a new document.
    ///
    /// Fails if a document with the same `_id` exists.
    fn insert(&self, document: Document) -> Result<()>;

    /// Replace the document with the given identifier.
    ///
    /// Fails if no such document exists.
    fn replace_by_id(&self, identifier: &str, document: Document) -> Result<()>;

    /// Get a document by identifier.
    ///
    /// Returns `None` if the document doesn't exist.
    fn find_by_id(&self, identifier: &str) -> Result<Option<Document>>;

    /// Get the documents matching `filter`, ordered by (`timestamp`, `_id`).
    ///
    /// Returns one page of at most `limit` items starting at `offset`, and
    /// the total number of matching documents.
    fn find_many(
        &self,
        filter: &DocumentFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<(Vec<Document>, usize)>;

    /// Remove a document. Returns `false` if it didn't exist.
    fn delete_by_id(&self, identifier: &str) -> Result<bool>;
}

/// Extract the `_id` field of a document.
///
/// # Errors
///
/// Returns `MalformedRecord` if the field is missing or not a string.
pub fn document_id(document: &Document) -> Result<&str> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedRecord(format!("document without string '{ID_FIELD}'")))
}

/// Order matching documents and cut one page out of them.
pub(crate) fn paginate(
    mut documents: Vec<Document>,
    limit: Option<usize>,
    offset: usize,
) -> (Vec<Document>, usize) {
    documents.sort_by(|a, b| {
        let key = |doc: &Document| {
            (
                doc.get("timestamp").and_then(Value::as_str).map(str::to_owned),
                doc.get(ID_FIELD).and_then(Value::as_str).map(str::to_owned),
            )
        };
        key(a).cmp(&key(b))
    });
    let total = documents.len();
    let page = documents
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    (page, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<Document> {
        vec![
            json!({"_id": "c", "timestamp": "2024-01-03"}),
            json!({"_id": "a", "timestamp": "2024-01-01"}),
            json!({"_id": "b", "timestamp": "2024-01-02"}),
        ]
    }

    #[test]
    fn test_paginate_orders_by_timestamp() {
        let (page, total) = paginate(docs(), None, 0);
        assert_eq!(total, 3);
        let ids: Vec<_> = page.iter().map(|d| d["_id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_paginate_limit_offset() {
        let (page, total) = paginate(docs(), Some(1), 1);
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["_id"], "b");

        let (page, _) = paginate(docs(), Some(10), 5);
        assert!(page.is_empty());
    }

    #[test]
    fn test_filter_matches() {
        let doc = json!({"_id": "x", "experiment": "e1", "properties": {"state": "IDLE", "a/b": "1"}});
        assert!(DocumentFilter::new().matches(&doc));
        assert!(DocumentFilter::new().eq("/experiment", "e1").matches(&doc));
        assert!(!DocumentFilter::new().eq("/experiment", "e2").matches(&doc));
        assert!(DocumentFilter::new()
            .property("state", "IDLE")
            .property("a/b", "1")
            .matches(&doc));
        assert!(!DocumentFilter::new().property("missing", "1").matches(&doc));
    }

    #[test]
    fn test_document_id() {
        assert_eq!(document_id(&json!({"_id": "x"})).unwrap(), "x");
        assert!(matches!(
            document_id(&json!({"id": "x"})),
            Err(Error::MalformedRecord(_))
        ));
    }
}
