//! Model Run Manager - creation, state transitions, and attachments
//!
//! The manager is the only component that mutates run records. Every
//! operation follows the same order: read the record, validate, change the
//! filesystem (if at all), then write the record. A crash in between leaves
//! at worst an orphaned file, never a record pointing at a missing one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::attachment::{resolve_attachment_dir, single_file};
use super::{AttachmentKind, ModelRunRecord, RunState};
use crate::attribute::{ArgumentDefinitions, Attribute};
use crate::document::{Document, DocumentFilter, DocumentStore};
use crate::object::{
    self, remove_dir_if_exists, Entity, ObjectListing, ObjectStore, Properties, PROPERTY_MODEL,
    PROPERTY_NAME, PROPERTY_STATE,
};
use crate::{Error, Result};

/// Name prefix of the scratch directory an attachment is copied into before it
/// replaces the current one. Attachment identifiers never start with a dot.
const STAGING_PREFIX: &str = ".staging-";

/// Manager for model runs and their attachments.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use modelrun_db::attribute::ArgumentDefinitions;
/// use modelrun_db::document::MemoryDocumentStore;
/// use modelrun_db::modelrun::{ModelRunManager, RunState};
///
/// # fn example() -> modelrun_db::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let manager = ModelRunManager::new(Arc::new(MemoryDocumentStore::new()), dir.path());
///
/// let run = manager.create(
///     "My Run",
///     "exp-001",
///     "model-001",
///     &ArgumentDefinitions::with_defaults(),
///     &[],
///     None,
/// )?;
/// assert!(run.state().is_idle());
///
/// let run = manager.update_state(run.identifier(), RunState::Running)?.unwrap();
/// assert!(run.state().is_running());
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ModelRunManager {
    objects: ObjectStore<ModelRunRecord>,
}

impl ModelRunManager {
    /// Create a manager over a document collection.
    ///
    /// # Arguments
    ///
    /// * `store` - Document collection holding run records
    /// * `base_directory` - Parent directory of the per-run directories
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, base_directory: impl Into<PathBuf>) -> Self {
        Self {
            objects: ObjectStore::new(store, base_directory, vec![PROPERTY_STATE, PROPERTY_MODEL]),
        }
    }

    /// Get the base directory for run resources.
    #[must_use]
    pub fn base_directory(&self) -> &Path {
        self.objects.base_directory()
    }

    /// Create a new run in `IDLE` state.
    ///
    /// # Arguments
    ///
    /// * `name` - User-provided run name
    /// * `experiment_id` - Experiment the run belongs to (not checked)
    /// * `model_id` - Model to execute (not checked)
    /// * `definitions` - Arguments the model accepts
    /// * `arguments` - Supplied argument values; defaults fill in the rest
    /// * `properties` - Extra properties; reserved keys are ignored
    ///
    /// # Errors
    ///
    /// `Validation` for duplicate, unknown or ill-typed arguments (nothing
    /// is written in that case). `StorageError` if the run directory or the
    /// record cannot be written.
    pub fn create(
        &self,
        name: &str,
        experiment_id: &str,
        model_id: &str,
        definitions: &ArgumentDefinitions,
        arguments: &[Attribute],
        properties: Option<&Properties>,
    ) -> Result<ModelRunRecord> {
        let arguments = definitions.validate_arguments(arguments)?;

        let identifier = Uuid::new_v4().to_string();
        let directory = self.objects.object_directory(&identifier);
        fs::create_dir_all(&directory).map_err(|e| {
            Error::StorageError(format!(
                "failed to create run directory {}: {e}",
                directory.display()
            ))
        })?;

        let state = RunState::Idle;
        let mut run_properties = Properties::new();
        run_properties.insert(PROPERTY_NAME.to_string(), name.to_string());
        run_properties.insert(PROPERTY_STATE.to_string(), state.tag().to_string());
        run_properties.insert(PROPERTY_MODEL.to_string(), model_id.to_string());
        if let Some(extra) = properties {
            for (key, value) in extra {
                run_properties
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        let run = ModelRunRecord::new(
            identifier,
            run_properties,
            directory,
            experiment_id.to_string(),
            model_id.to_string(),
            arguments,
        );
        self.objects.insert_object(&run)?;
        info!(
            run_id = run.identifier(),
            experiment = experiment_id,
            model = model_id,
            "created model run"
        );
        Ok(run)
    }

    /// Get an active run by identifier.
    ///
    /// Returns `None` if no such run exists.
    pub fn get(&self, identifier: &str) -> Result<Option<ModelRunRecord>> {
        self.objects.get_object(identifier)
    }

    /// Get a run only if it belongs to the given experiment.
    pub fn get_for_experiment(
        &self,
        experiment_id: &str,
        identifier: &str,
    ) -> Result<Option<ModelRunRecord>> {
        Ok(self
            .get(identifier)?
            .filter(|run| run.experiment_id() == experiment_id))
    }

    /// List active runs matching `filter`.
    ///
    /// Filter on the state with `DocumentFilter::new().property("state", "RUNNING")`.
    pub fn list(
        &self,
        filter: &DocumentFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<ObjectListing<ModelRunRecord>> {
        self.objects.list_objects(filter, limit, offset)
    }

    /// List the active runs of an experiment.
    pub fn list_for_experiment(
        &self,
        experiment_id: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<ObjectListing<ModelRunRecord>> {
        let filter = DocumentFilter::new().eq("/experiment", experiment_id);
        self.list(&filter, limit, offset)
    }

    /// Update user-defined run properties. A `None` value removes the key.
    ///
    /// Returns `None` if no such run exists.
    ///
    /// # Errors
    ///
    /// `Validation` when touching `state` or `model`, or removing `name`.
    pub fn upsert_property(
        &self,
        identifier: &str,
        updates: &BTreeMap<String, Option<String>>,
    ) -> Result<Option<ModelRunRecord>> {
        self.objects.upsert_property(identifier, updates)
    }

    /// Delete a run. Soft delete unless `erase` is set, which also removes
    /// the run directory.
    ///
    /// Returns `None` if no such run exists.
    pub fn delete(&self, identifier: &str, erase: bool) -> Result<Option<ModelRunRecord>> {
        let deleted = self.objects.delete_object(identifier, erase)?;
        if deleted.is_some() {
            info!(run_id = identifier, erase, "deleted model run");
        }
        Ok(deleted)
    }

    /// Move a run to a new state.
    ///
    /// | requested | current must be   | schedule     |
    /// |-----------|-------------------|--------------|
    /// | Idle      | (never)           |              |
    /// | Running   | Idle              | `startedAt`  |
    /// | Failed    | Idle or Running   | `finishedAt` |
    /// | Success   | Running           | `finishedAt` |
    ///
    /// Returns `None` if no such run exists.
    ///
    /// # Errors
    ///
    /// `IllegalTransition` for any change not in the table.
    pub fn update_state(
        &self,
        identifier: &str,
        state: RunState,
    ) -> Result<Option<ModelRunRecord>> {
        let Some(mut run) = self.get(identifier)? else {
            return Ok(None);
        };
        let event = match run.state().transition_to(&state) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    run_id = identifier,
                    from = run.state().tag(),
                    to = state.tag(),
                    "illegal state transition"
                );
                return Err(e);
            }
        };

        let from = run.state().tag();
        run.schedule.insert(
            event.as_str().to_string(),
            object::format_timestamp(&object::now()),
        );
        run.properties_mut()
            .insert(PROPERTY_STATE.to_string(), state.tag().to_string());
        run.state = state;
        self.objects.replace_object(&run)?;
        info!(run_id = identifier, from, to = run.state().tag(), "updated run state");
        Ok(Some(run))
    }

    /// Mark an idle run as running.
    pub fn start(&self, identifier: &str) -> Result<Option<ModelRunRecord>> {
        self.update_state(identifier, RunState::Running)
    }

    /// Mark a run as failed with the given error messages.
    pub fn fail<I, S>(&self, identifier: &str, errors: I) -> Result<Option<ModelRunRecord>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_state(identifier, RunState::failed(errors))
    }

    /// Mark a running run as successful.
    pub fn succeed(
        &self,
        identifier: &str,
        model_output: impl Into<String>,
    ) -> Result<Option<ModelRunRecord>> {
        self.update_state(identifier, RunState::success(model_output))
    }

    /// Attach a copy of `source` to a successful run under `attachment_id`.
    ///
    /// An existing attachment of the same kind is replaced.
    ///
    /// Returns `None` if no such run exists.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the run has not finished with success
    /// - `Conflict` if `attachment_id` holds an attachment of another kind
    /// - `InvalidIdentifier` if `attachment_id` escapes the run directory
    /// - `StorageError`/`Io` if the source cannot be copied
    pub fn attach(
        &self,
        identifier: &str,
        attachment_id: &str,
        source: &Path,
        kind: AttachmentKind,
    ) -> Result<Option<ModelRunRecord>> {
        let Some(mut run) = self.get(identifier)? else {
            return Ok(None);
        };
        if !run.state().is_success() {
            return Err(Error::InvalidState(format!(
                "cannot attach file to model run in state: {}",
                run.state()
            )));
        }
        if let Some(existing) = run.attachments().get(attachment_id) {
            if *existing != kind {
                return Err(Error::Conflict(format!(
                    "cannot replace {existing} attachment '{attachment_id}' with {kind}"
                )));
            }
        }
        let directory = resolve_attachment_dir(run.directory(), attachment_id)?;
        let file_name = source.file_name().ok_or_else(|| {
            Error::StorageError(format!("source has no file name: {}", source.display()))
        })?;
        if !source.is_file() {
            return Err(Error::StorageError(format!(
                "source is not a file: {}",
                source.display()
            )));
        }

        // Stage the copy next to the target so a source inside the old
        // attachment directory is read before that directory is replaced.
        let parent = directory.parent().unwrap_or_else(|| run.directory());
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)?;
        fs::copy(source, staging.path().join(file_name))?;
        remove_dir_if_exists(&directory)?;
        fs::rename(staging.path(), &directory)?;

        run.attachments.insert(attachment_id.to_string(), kind);
        self.objects.replace_object(&run)?;
        info!(run_id = identifier, attachment = attachment_id, %kind, "attached file");
        Ok(Some(run))
    }

    /// Path of an attached data file.
    ///
    /// Returns `None` if the run or the attachment doesn't exist.
    ///
    /// # Errors
    ///
    /// `WrongKind` if the attachment is not a data file.
    pub fn get_attachment(&self, identifier: &str, attachment_id: &str) -> Result<Option<PathBuf>> {
        let Some(run) = self.get(identifier)? else {
            return Ok(None);
        };
        let Some(directory) = Self::data_file_directory(&run, attachment_id)? else {
            debug!(run_id = identifier, attachment = attachment_id, "attachment not found");
            return Ok(None);
        };
        single_file(&directory).map(Some)
    }

    /// Remove an attached data file.
    ///
    /// Returns `false` if the run or the attachment doesn't exist.
    ///
    /// # Errors
    ///
    /// `WrongKind` if the attachment is not a data file.
    pub fn delete_attachment(&self, identifier: &str, attachment_id: &str) -> Result<bool> {
        let Some(mut run) = self.get(identifier)? else {
            return Ok(false);
        };
        let Some(directory) = Self::data_file_directory(&run, attachment_id)? else {
            return Ok(false);
        };
        remove_dir_if_exists(&directory)?;
        run.attachments.remove(attachment_id);
        self.objects.replace_object(&run)?;
        info!(run_id = identifier, attachment = attachment_id, "deleted attachment");
        Ok(true)
    }

    fn data_file_directory(run: &ModelRunRecord, attachment_id: &str) -> Result<Option<PathBuf>> {
        match run.attachments().get(attachment_id) {
            None => Ok(None),
            Some(AttachmentKind::DataFile) => {
                resolve_attachment_dir(run.directory(), attachment_id).map(Some)
            }
            Some(kind) => Err(Error::WrongKind {
                attachment: attachment_id.to_string(),
                kind: kind.as_str(),
            }),
        }
    }

    /// Serialize a run into its wire document.
    pub fn to_wire_format(&self, run: &ModelRunRecord) -> Result<Document> {
        run.to_document()
    }

    /// Deserialize a wire document. The run directory is derived from the
    /// stored identifier and this manager's base directory.
    ///
    /// # Errors
    ///
    /// `MalformedRecord` if the document is not a valid run.
    pub fn from_wire_format(&self, document: Document) -> Result<ModelRunRecord> {
        ModelRunRecord::from_document(document, self.base_directory())
    }
}
