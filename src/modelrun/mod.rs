//! Model runs
//!
//! Persistence and life cycle management for model run records: executions
//! of a predictive model against an experiment's inputs.
//!
//! ## Schema Overview
//!
//! ```text
//! ModelRunRecord
//!     ├── state: RunState            IDLE → RUNNING → SUCCESS | FAILED
//!     ├── schedule                   createdAt, startedAt, finishedAt
//!     ├── arguments                  typed, validated at creation
//!     └── attachments ──> <base>/<run_id>/<attachment_id>/<file>
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use modelrun_db::attribute::ArgumentDefinitions;
//! use modelrun_db::document::MemoryDocumentStore;
//! use modelrun_db::modelrun::{AttachmentKind, ModelRunManager, ScheduleEvent};
//!
//! # fn example() -> modelrun_db::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let manager = ModelRunManager::new(Arc::new(MemoryDocumentStore::new()), dir.path().join("runs"));
//!
//! // Create and execute a run
//! let run = manager.create("run", "exp-001", "model-001", &ArgumentDefinitions::new(), &[], None)?;
//! manager.start(run.identifier())?;
//! let run = manager.succeed(run.identifier(), "prediction-001")?.unwrap();
//! assert!(run.scheduled(ScheduleEvent::Finished).is_some());
//!
//! // Attach a result file
//! let source = dir.path().join("result.csv");
//! std::fs::write(&source, "1")?;
//! manager.attach(run.identifier(), "result", &source, AttachmentKind::DataFile)?;
//! let path = manager.get_attachment(run.identifier(), "result")?.unwrap();
//! assert_eq!(std::fs::read_to_string(path)?, "1");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod attachment;
mod manager;
mod record;
mod state;

pub use attachment::AttachmentKind;
pub use manager::ModelRunManager;
pub use record::{ModelRunRecord, ScheduleEvent};
pub use state::{RunState, STATE_FAILED, STATE_IDLE, STATE_RUNNING, STATE_SUCCESS};
