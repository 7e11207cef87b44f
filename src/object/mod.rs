//! Generic object store
//!
//! Entities (model runs, and any other record kind sharing the same document
//! collection conventions) implement [`Entity`]. [`ObjectStore`] layers the
//! shared bookkeeping on top of a [`DocumentStore`]: active-flag soft delete,
//! property-bag updates, and paginated listing.
//!
//! ## Document Layout
//!
//! ```text
//! { "_id": ..., "timestamp": ..., "properties": {...}, "active": bool, <entity fields> }
//! ```

mod timestamp;

pub use timestamp::{format_timestamp, now, parse_timestamp, TIMESTAMP_FORMAT};

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::document::{Document, DocumentFilter, DocumentStore};
use crate::error::ValidationError;
use crate::{Error, Result};

/// Property holding the user-provided object name. Mandatory.
pub const PROPERTY_NAME: &str = "name";
/// Property mirroring a model run's state tag.
pub const PROPERTY_STATE: &str = "state";
/// Property holding a model run's model identifier.
pub const PROPERTY_MODEL: &str = "model";

/// Property bag of an object.
pub type Properties = BTreeMap<String, String>;

/// A record that can be persisted by an [`ObjectStore`].
pub trait Entity: Sized {
    /// Unique object identifier.
    fn identifier(&self) -> &str;

    /// Object properties.
    fn properties(&self) -> &Properties;

    /// Mutable access to the object properties.
    fn properties_mut(&mut self) -> &mut Properties;

    /// Whether the object is active (not soft-deleted).
    fn is_active(&self) -> bool;

    /// Set the active flag.
    fn set_active(&mut self, active: bool);

    /// Directory on local disk holding the object's resources.
    fn directory(&self) -> &Path;

    /// Serialize into a store document.
    ///
    /// # Errors
    ///
    /// Returns error if the object cannot be serialized.
    fn to_document(&self) -> Result<Document>;

    /// Deserialize from a store document. The object directory is derived
    /// from `base_directory` and the stored identifier.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` if the document does not describe a valid
    /// object.
    fn from_document(document: Document, base_directory: &Path) -> Result<Self>;
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectListing<E> {
    /// Objects on this page.
    pub items: Vec<E>,
    /// Offset of the first item.
    pub offset: usize,
    /// Requested page size (`None` for all).
    pub limit: Option<usize>,
    /// Total number of matching objects.
    pub total_count: usize,
}

/// Store for objects of type `E` in a single document collection.
pub struct ObjectStore<E> {
    store: Arc<dyn DocumentStore>,
    base_directory: PathBuf,
    immutable_properties: Vec<&'static str>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for ObjectStore<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            base_directory: self.base_directory.clone(),
            immutable_properties: self.immutable_properties.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> std::fmt::Debug for ObjectStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("base_directory", &self.base_directory)
            .field("immutable_properties", &self.immutable_properties)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> ObjectStore<E> {
    /// Create an object store.
    ///
    /// # Arguments
    ///
    /// * `store` - Document collection holding the objects
    /// * `base_directory` - Parent of the per-object resource directories
    /// * `immutable_properties` - Property keys that `upsert_property` rejects
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        base_directory: impl Into<PathBuf>,
        immutable_properties: Vec<&'static str>,
    ) -> Self {
        Self {
            store,
            base_directory: base_directory.into(),
            immutable_properties,
            _entity: PhantomData,
        }
    }

    /// Get the base directory for object resources.
    #[must_use]
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Directory for the object with the given identifier.
    #[must_use]
    pub fn object_directory(&self, identifier: &str) -> PathBuf {
        self.base_directory.join(identifier)
    }

    /// Persist a new object.
    pub fn insert_object(&self, object: &E) -> Result<()> {
        self.store.insert(object.to_document()?)
    }

    /// Overwrite the stored version of an existing object.
    pub fn replace_object(&self, object: &E) -> Result<()> {
        self.store
            .replace_by_id(object.identifier(), object.to_document()?)
    }

    /// Get an active object by identifier.
    ///
    /// Returns `None` if the object doesn't exist or has been deleted.
    pub fn get_object(&self, identifier: &str) -> Result<Option<E>> {
        let Some(document) = self.store.find_by_id(identifier)? else {
            debug!(object_id = identifier, "object not found");
            return Ok(None);
        };
        if !is_active_document(&document) {
            debug!(object_id = identifier, "object is inactive");
            return Ok(None);
        }
        E::from_document(document, &self.base_directory).map(Some)
    }

    /// List active objects matching `filter`.
    pub fn list_objects(
        &self,
        filter: &DocumentFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<ObjectListing<E>> {
        let filter = filter.clone().eq("/active", true);
        let (documents, total_count) = self.store.find_many(&filter, limit, offset)?;
        let items = documents
            .into_iter()
            .map(|doc| E::from_document(doc, &self.base_directory))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = items.len(), total_count, offset, "listed objects");
        Ok(ObjectListing {
            items,
            offset,
            limit,
            total_count,
        })
    }

    /// Update, add, or (with a `None` value) remove object properties.
    ///
    /// Every key is validated before any change is made.
    ///
    /// Returns `None` if the object doesn't exist.
    ///
    /// # Errors
    ///
    /// `ImmutableProperty` for keys managed by the store, `MandatoryProperty`
    /// when removing the object name.
    pub fn upsert_property(
        &self,
        identifier: &str,
        updates: &BTreeMap<String, Option<String>>,
    ) -> Result<Option<E>> {
        let Some(mut object) = self.get_object(identifier)? else {
            return Ok(None);
        };
        for (key, value) in updates {
            if self.immutable_properties.contains(&key.as_str()) {
                return Err(ValidationError::ImmutableProperty(key.clone()).into());
            }
            if key == PROPERTY_NAME && value.is_none() {
                return Err(ValidationError::MandatoryProperty(key.clone()).into());
            }
        }
        let properties = object.properties_mut();
        for (key, value) in updates {
            match value {
                Some(value) => {
                    properties.insert(key.clone(), value.clone());
                }
                None => {
                    properties.remove(key);
                }
            }
        }
        self.replace_object(&object)?;
        Ok(Some(object))
    }

    /// Delete an object.
    ///
    /// A soft delete clears the active flag. With `erase` the document and
    /// the object's directory are removed.
    ///
    /// Returns the deleted object, or `None` if it doesn't exist (deleting a
    /// deleted object yields `None`).
    pub fn delete_object(&self, identifier: &str, erase: bool) -> Result<Option<E>> {
        let Some(mut object) = self.get_object(identifier)? else {
            return Ok(None);
        };
        object.set_active(false);
        if erase {
            self.store.delete_by_id(identifier)?;
            remove_dir_if_exists(object.directory())?;
        } else {
            self.replace_object(&object)?;
        }
        Ok(Some(object))
    }
}

fn is_active_document(document: &Document) -> bool {
    document
        .get("active")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

/// Whether `name` can be used as a single directory entry below a base
/// directory: non-empty, no separators, not hidden, and not `.`/`..`.
pub(crate) fn is_path_segment(name: &str) -> bool {
    !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && matches!(
            Path::new(name).components().collect::<Vec<_>>()[..],
            [Component::Normal(_)]
        )
}

/// Recursively remove a directory. Already absent counts as success.
pub(crate) fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::StorageError(format!(
            "failed to remove {}: {e}",
            path.display()
        ))),
    }
}
