//! Directory-backed document store: one JSON file per document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{document_id, paginate, Document, DocumentFilter, DocumentStore};
use crate::object::is_path_segment;
use crate::{Error, Result};

const EXTENSION: &str = "json";

/// Document store persisting each document as `<directory>/<_id>.json`.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// reader never observes a partially written document.
#[derive(Debug, Clone)]
pub struct DirectoryDocumentStore {
    directory: PathBuf,
}

impl DirectoryDocumentStore {
    /// Open (and create if needed) a store rooted at `directory`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|e| {
            Error::StorageError(format!(
                "failed to create document directory {}: {e}",
                directory.display()
            ))
        })?;
        Ok(Self { directory })
    }

    /// Get the root directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, identifier: &str) -> Option<PathBuf> {
        is_path_segment(identifier)
            .then(|| self.directory.join(format!("{identifier}.{EXTENSION}")))
    }

    fn checked_path(&self, identifier: &str) -> Result<PathBuf> {
        self.path_for(identifier).ok_or_else(|| {
            Error::InvalidIdentifier(format!("not a valid document identifier: {identifier}"))
        })
    }

    fn write(&self, path: &Path, document: &Document) -> Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, serde_json::to_vec_pretty(document)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read(path: &Path) -> Result<Option<Document>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl DocumentStore for DirectoryDocumentStore {
    fn insert(&self, document: Document) -> Result<()> {
        let path = self.checked_path(document_id(&document)?)?;
        if path.exists() {
            return Err(Error::StorageError(format!(
                "duplicate document identifier: {}",
                document_id(&document)?
            )));
        }
        self.write(&path, &document)
    }

    fn replace_by_id(&self, identifier: &str, document: Document) -> Result<()> {
        let path = self.checked_path(identifier)?;
        if !path.exists() {
            return Err(Error::StorageError(format!(
                "cannot replace missing document: {identifier}"
            )));
        }
        self.write(&path, &document)
    }

    fn find_by_id(&self, identifier: &str) -> Result<Option<Document>> {
        match self.path_for(identifier) {
            Some(path) => Self::read(&path),
            None => Ok(None),
        }
    }

    fn find_many(
        &self,
        filter: &DocumentFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<(Vec<Document>, usize)> {
        let mut matching = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(document) = Self::read(&path)? {
                if filter.matches(&document) {
                    matching.push(document);
                }
            }
        }
        Ok(paginate(matching, limit, offset))
    }

    fn delete_by_id(&self, identifier: &str) -> Result<bool> {
        let Some(path) = self.path_for(identifier) else {
            return Ok(false);
        };
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_directory_store_persists_across_instances() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryDocumentStore::open(tmp.path().join("docs")).unwrap();
        store.insert(json!({"_id": "a", "value": 1})).unwrap();

        let reopened = DirectoryDocumentStore::open(tmp.path().join("docs")).unwrap();
        assert_eq!(reopened.find_by_id("a").unwrap().unwrap()["value"], 1);
    }

    #[test]
    fn test_directory_store_replace_and_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryDocumentStore::open(tmp.path()).unwrap();
        store.insert(json!({"_id": "a", "value": 1})).unwrap();
        assert!(store.insert(json!({"_id": "a"})).is_err());

        store.replace_by_id("a", json!({"_id": "a", "value": 2})).unwrap();
        assert_eq!(store.find_by_id("a").unwrap().unwrap()["value"], 2);
        assert!(store.replace_by_id("b", json!({"_id": "b"})).is_err());

        assert!(store.delete_by_id("a").unwrap());
        assert!(!store.delete_by_id("a").unwrap());
        assert!(store.find_by_id("a").unwrap().is_none());
    }

    #[test]
    fn test_directory_store_rejects_path_identifiers() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryDocumentStore::open(tmp.path().join("docs")).unwrap();
        let err = store.insert(json!({"_id": "../escape"})).unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(_)));
        assert!(store.find_by_id("../escape").unwrap().is_none());
        assert!(!tmp.path().join("escape.json").exists());
    }

    #[test]
    fn test_directory_store_find_many_skips_foreign_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryDocumentStore::open(tmp.path()).unwrap();
        store.insert(json!({"_id": "a", "timestamp": "1"})).unwrap();
        store.insert(json!({"_id": "b", "timestamp": "2"})).unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let (items, total) = store.find_many(&DocumentFilter::new(), None, 0).unwrap();
        assert_eq!(total, 2);
        assert_eq!(items[0]["_id"], "a");
    }
}
