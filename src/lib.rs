//! # modelrun-db: Model Run Lifecycle Store
//!
//! Persistence and life cycle management for executions of predictive
//! models ("model runs"). A run is created against an experiment with a set
//! of typed arguments, moves through a fixed state machine, and collects
//! result files as attachments.
//!
//! ```text
//! IDLE ──> RUNNING ──> SUCCESS
//!   │         │
//!   └─────────┴──────> FAILED
//! ```
//!
//! ## Design
//!
//! - **Injected store**: records live in a [`document::DocumentStore`]
//!   handed to each manager; there is no process-wide client
//! - **Validate, then commit**: rejected requests leave no trace
//! - **Filesystem before database**: a crash leaves at worst an orphaned file
//! - **Sandboxed attachments**: identifiers never resolve outside their run
//!
//! ## Example Usage
//!
//! ```rust
//! use modelrun_db::attribute::{ArgumentDefinitions, Attribute};
//! use modelrun_db::Database;
//!
//! # fn example() -> modelrun_db::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let db = Database::builder().base_directory(dir.path()).build()?;
//! let runs = db.model_runs();
//!
//! let run = runs.create(
//!     "V1 simulation",
//!     "exp-001",
//!     "model-001",
//!     &ArgumentDefinitions::with_defaults(),
//!     &[Attribute::new("normalized_pixels_per_degree", 15.2)],
//!     None,
//! )?;
//! runs.start(run.identifier())?;
//! runs.fail(run.identifier(), ["out of memory"])?;
//!
//! db.close();
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod attribute;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod modelrun;
pub mod object;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

pub use config::{Config, StoreBackend};
pub use error::{Error, Result, ValidationError};

use document::{DirectoryDocumentStore, DocumentStore, MemoryDocumentStore};
use modelrun::ModelRunManager;

/// Database instance: an open document store plus the directory holding
/// run resources.
///
/// Opened explicitly through [`Database::builder`] or [`Database::open`] and
/// released with [`Database::close`]. Managers obtained from it share the
/// same store handle.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    base_directory: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("base_directory", &self.base_directory)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Create a new database builder
    #[must_use]
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::default()
    }

    /// Open the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the base directory or the store cannot be created.
    pub fn open(config: &Config) -> Result<Self> {
        Self::builder()
            .base_directory(&config.base_directory)
            .backend(config.backend.clone())
            .build()
    }

    /// Manager for model run records.
    #[must_use]
    pub fn model_runs(&self) -> ModelRunManager {
        ModelRunManager::new(Arc::clone(&self.store), &self.base_directory)
    }

    /// Shared document store handle.
    #[must_use]
    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Base directory for run resources.
    #[must_use]
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Release the store handle.
    ///
    /// Managers created earlier keep their own handle and stay usable.
    pub fn close(self) {
        info!(base_directory = %self.base_directory.display(), "closing database");
    }
}

/// Database builder
#[derive(Default)]
pub struct DatabaseBuilder {
    base_directory: Option<PathBuf>,
    backend: StoreBackend,
    store: Option<Arc<dyn DocumentStore>>,
}

impl DatabaseBuilder {
    /// Set the base directory for run resources
    /// (default `./data/modelruns`)
    #[must_use]
    pub fn base_directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.base_directory = Some(directory.as_ref().to_path_buf());
        self
    }

    /// Set the document store backend
    #[must_use]
    pub fn backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Use an existing document store; overrides the backend setting
    #[must_use]
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the database
    ///
    /// # Errors
    ///
    /// Returns error if the base directory cannot be created or the
    /// directory backend cannot be opened.
    pub fn build(self) -> Result<Database> {
        let base_directory = self
            .base_directory
            .unwrap_or_else(|| PathBuf::from(config::DEFAULT_DATA_DIR));
        std::fs::create_dir_all(&base_directory).map_err(|e| {
            Error::StorageError(format!(
                "failed to create base directory {}: {e}",
                base_directory.display()
            ))
        })?;

        let store: Arc<dyn DocumentStore> = match (self.store, self.backend) {
            (Some(store), _) => store,
            (None, StoreBackend::Memory) => Arc::new(MemoryDocumentStore::new()),
            (None, StoreBackend::Directory { path }) => {
                Arc::new(DirectoryDocumentStore::open(path)?)
            }
        };
        info!(base_directory = %base_directory.display(), "opened database");
        Ok(Database {
            store,
            base_directory,
        })
    }
}
