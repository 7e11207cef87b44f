//! Model Run Record - persisted state of one model execution

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AttachmentKind, RunState};
use crate::attribute::Attribute;
use crate::document::Document;
use crate::object::{self, Entity, Properties, PROPERTY_NAME};
use crate::{Error, Result};

/// Life cycle events recorded in a run's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScheduleEvent {
    /// Run was created.
    Created,
    /// Run started executing.
    Started,
    /// Run reached a terminal state.
    Finished,
}

impl ScheduleEvent {
    /// Key of the event in the schedule map.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "createdAt",
            Self::Started => "startedAt",
            Self::Finished => "finishedAt",
        }
    }
}

/// A model run: one execution of a predictive model against an experiment.
///
/// Records are created and mutated exclusively through
/// [`super::ModelRunManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRunRecord {
    identifier: String,
    timestamp: DateTime<Utc>,
    properties: Properties,
    directory: PathBuf,
    pub(crate) state: RunState,
    experiment_id: String,
    model_id: String,
    arguments: BTreeMap<String, Attribute>,
    pub(crate) attachments: BTreeMap<String, AttachmentKind>,
    pub(crate) schedule: BTreeMap<String, String>,
    active: bool,
}

impl ModelRunRecord {
    /// Create a new, idle run whose schedule holds only its creation time.
    pub(crate) fn new(
        identifier: String,
        properties: Properties,
        directory: PathBuf,
        experiment_id: String,
        model_id: String,
        arguments: BTreeMap<String, Attribute>,
    ) -> Self {
        let timestamp = object::now();
        let mut schedule = BTreeMap::new();
        schedule.insert(
            ScheduleEvent::Created.as_str().to_string(),
            object::format_timestamp(&timestamp),
        );
        Self {
            identifier,
            timestamp,
            properties,
            directory,
            state: RunState::Idle,
            experiment_id,
            model_id,
            arguments,
            attachments: BTreeMap::new(),
            schedule,
            active: true,
        }
    }

    /// Get the run identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Get the user-provided run name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.properties.get(PROPERTY_NAME).map(String::as_str)
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Get the run properties.
    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Get the directory holding the run's attachments.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Get the current state.
    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }

    /// Get the experiment the run belongs to.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the model that is executed.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Get the typed run arguments, keyed by name.
    #[must_use]
    pub const fn arguments(&self) -> &BTreeMap<String, Attribute> {
        &self.arguments
    }

    /// Get the attachments, keyed by attachment identifier.
    #[must_use]
    pub const fn attachments(&self) -> &BTreeMap<String, AttachmentKind> {
        &self.attachments
    }

    /// Get the schedule: life cycle event name to timestamp.
    #[must_use]
    pub const fn schedule(&self) -> &BTreeMap<String, String> {
        &self.schedule
    }

    /// Get the timestamp of a life cycle event, if it happened.
    #[must_use]
    pub fn scheduled(&self, event: ScheduleEvent) -> Option<&str> {
        self.schedule.get(event.as_str()).map(String::as_str)
    }

    /// Whether the run is active (not deleted).
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }
}

/// Wire layout of a run record.
#[derive(Serialize, Deserialize)]
struct RunDocument {
    #[serde(rename = "_id")]
    identifier: String,
    timestamp: String,
    properties: Properties,
    active: bool,
    state: RunState,
    schedule: BTreeMap<String, String>,
    experiment: String,
    model: String,
    arguments: Vec<Attribute>,
    attachments: BTreeMap<String, AttachmentKind>,
}

impl Entity for ModelRunRecord {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    fn to_document(&self) -> Result<Document> {
        let document = RunDocument {
            identifier: self.identifier.clone(),
            timestamp: object::format_timestamp(&self.timestamp),
            properties: self.properties.clone(),
            active: self.active,
            state: self.state.clone(),
            schedule: self.schedule.clone(),
            experiment: self.experiment_id.clone(),
            model: self.model_id.clone(),
            arguments: self.arguments.values().cloned().collect(),
            attachments: self.attachments.clone(),
        };
        Ok(serde_json::to_value(document)?)
    }

    fn from_document(document: Document, base_directory: &Path) -> Result<Self> {
        let doc: RunDocument = serde_json::from_value(document)?;
        if !object::is_path_segment(&doc.identifier) {
            return Err(Error::MalformedRecord(format!(
                "run identifier is not a directory name: {}",
                doc.identifier
            )));
        }
        let directory = base_directory.join(&doc.identifier);
        Ok(Self {
            timestamp: object::parse_timestamp(&doc.timestamp)?,
            identifier: doc.identifier,
            properties: doc.properties,
            directory,
            state: doc.state,
            experiment_id: doc.experiment,
            model_id: doc.model,
            arguments: doc
                .arguments
                .into_iter()
                .map(|arg| (arg.name.clone(), arg))
                .collect(),
            attachments: doc.attachments,
            schedule: doc.schedule,
            active: doc.active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> ModelRunRecord {
        let mut properties = Properties::new();
        properties.insert(PROPERTY_NAME.into(), "NAME".into());
        let mut arguments = BTreeMap::new();
        arguments.insert("gabor_orientations".into(), Attribute::new("gabor_orientations", 10));
        ModelRunRecord::new(
            "run-1".into(),
            properties,
            PathBuf::from("/data/run-1"),
            "exp-1".into(),
            "model-1".into(),
            arguments,
        )
    }

    #[test]
    fn test_new_record_is_idle() {
        let run = record();
        assert!(run.state().is_idle());
        assert_eq!(run.name(), Some("NAME"));
        assert!(run.attachments().is_empty());
        assert_eq!(run.schedule().len(), 1);
        assert!(run.scheduled(ScheduleEvent::Created).is_some());
        assert!(run.is_active());
    }

    #[test]
    fn test_document_layout() {
        let doc = record().to_document().unwrap();
        assert_eq!(doc["_id"], "run-1");
        assert_eq!(doc["experiment"], "exp-1");
        assert_eq!(doc["model"], "model-1");
        assert_eq!(doc["state"], json!({"type": "IDLE"}));
        assert_eq!(
            doc["arguments"],
            json!([{"name": "gabor_orientations", "value": 10}])
        );
        assert_eq!(doc["attachments"], json!({}));
        assert_eq!(doc["active"], true);
        assert!(doc.get("directory").is_none());
    }

    #[test]
    fn test_directory_recomputed_from_identifier() {
        let mut doc = record().to_document().unwrap();
        doc["directory"] = json!("/somewhere/else");
        let restored = ModelRunRecord::from_document(doc, Path::new("/other/base")).unwrap();
        assert_eq!(restored.directory(), Path::new("/other/base/run-1"));
    }

    #[test]
    fn test_document_round_trip() {
        let mut run = record();
        run.state = RunState::success("ref-1");
        run.attachments.insert("out".into(), AttachmentKind::DataFile);
        let restored =
            ModelRunRecord::from_document(run.to_document().unwrap(), Path::new("/data")).unwrap();
        assert_eq!(restored, run);
    }

    #[test]
    fn test_path_like_identifier_is_malformed() {
        for id in ["../x", "a/b", "..", ""] {
            let mut doc = record().to_document().unwrap();
            doc["_id"] = json!(id);
            assert!(
                matches!(
                    ModelRunRecord::from_document(doc, Path::new("/data")),
                    Err(Error::MalformedRecord(_))
                ),
                "{id:?} was accepted"
            );
        }
    }
}
