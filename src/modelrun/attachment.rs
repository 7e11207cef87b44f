//! Attachments - result files bound to a successful run
//!
//! Each attachment lives in its own sub-directory of the run directory:
//!
//! ```text
//! <base>/<run_id>/<attachment_id>/<file name>
//! ```
//!
//! Attachment identifiers are plain directory names. Anything that could
//! alias another attachment or leave the run directory is rejected.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::object::is_path_segment;
use crate::{Error, Result};

/// Kind of an attachment. Determines how the attached resource is accessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentKind {
    /// Individual file, accessible through the data file accessors.
    #[default]
    #[serde(rename = "DATAFILE")]
    DataFile,
    /// Collection of images, browsed through a separate accessor.
    #[serde(rename = "IMAGEARCHIVE")]
    ImageArchive,
}

impl AttachmentKind {
    /// Stable string form, as stored in run documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DataFile => "DATAFILE",
            Self::ImageArchive => "IMAGEARCHIVE",
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn escape(attachment_id: &str) -> Error {
    warn!(attachment = attachment_id, "rejected attachment identifier");
    Error::InvalidIdentifier(format!("invalid attachment identifier: {attachment_id}"))
}

/// Resolve the directory backing `attachment_id` inside `run_directory`.
///
/// The identifier is a single directory name, so every attachment maps to
/// exactly one child of the canonical run directory and no two identifiers
/// share a directory. Nothing on disk is created or modified.
///
/// # Errors
///
/// `InvalidIdentifier` if the identifier is empty, hidden, contains a path
/// separator or `.`/`..`, or names an existing symlink. `StorageError` if the
/// run directory is missing.
pub(crate) fn resolve_attachment_dir(run_directory: &Path, attachment_id: &str) -> Result<PathBuf> {
    if !is_path_segment(attachment_id) {
        return Err(escape(attachment_id));
    }
    let root = run_directory.canonicalize().map_err(|e| {
        Error::StorageError(format!(
            "run directory {} unavailable: {e}",
            run_directory.display()
        ))
    })?;

    let resolved = root.join(attachment_id);
    match fs::symlink_metadata(&resolved) {
        Ok(meta) if meta.file_type().is_symlink() => Err(escape(attachment_id)),
        _ => Ok(resolved),
    }
}

/// Path of the single file stored in an attachment directory.
///
/// # Errors
///
/// `StorageError` if the directory cannot be read or does not contain
/// exactly one entry.
pub(crate) fn single_file(directory: &Path) -> Result<PathBuf> {
    let read = |e: std::io::Error| {
        Error::StorageError(format!(
            "cannot read attachment directory {}: {e}",
            directory.display()
        ))
    };
    let mut entries = fs::read_dir(directory).map_err(read)?;
    let first = entries
        .next()
        .transpose()
        .map_err(read)?
        .ok_or_else(|| {
            Error::StorageError(format!(
                "attachment directory {} is empty",
                directory.display()
            ))
        })?;
    if entries.next().is_some() {
        return Err(Error::StorageError(format!(
            "attachment directory {} holds more than one entry",
            directory.display()
        )));
    }
    Ok(first.path())
}
