//! Configuration
//!
//! Loaded from TOML or from the environment:
//!
//! ```toml
//! base_directory = "/var/lib/modelruns"
//!
//! [backend]
//! kind = "directory"
//! path = "/var/lib/modelruns/db"
//! ```
//!
//! | Variable | Effect |
//! |---|---|
//! | `MODELRUN_DATA_DIR` | base directory for run resources (default `./data/modelruns`) |
//! | `MODELRUN_STORE_DIR` | use the directory-backed document store at this path |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable naming the base directory.
pub const ENV_DATA_DIR: &str = "MODELRUN_DATA_DIR";
/// Environment variable selecting the directory-backed store.
pub const ENV_STORE_DIR: &str = "MODELRUN_STORE_DIR";
/// Base directory used when none is configured.
pub const DEFAULT_DATA_DIR: &str = "./data/modelruns";

/// Document store backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-memory store; records are lost on exit.
    #[default]
    Memory,
    /// One JSON file per record under `path`.
    Directory {
        /// Directory holding the record files.
        path: PathBuf,
    },
}

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Parent directory of the per-run resource directories.
    pub base_directory: PathBuf,
    /// Document store backend.
    #[serde(default)]
    pub backend: StoreBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from(DEFAULT_DATA_DIR),
            backend: StoreBackend::Memory,
        }
    }
}

impl Config {
    /// Parse a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the text is not a valid configuration.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Build the configuration from `MODELRUN_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from a variable lookup.
    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key| lookup(key).filter(|v: &String| !v.trim().is_empty());
        let base_directory = non_empty(ENV_DATA_DIR)
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
        let backend = non_empty(ENV_STORE_DIR).map_or(StoreBackend::Memory, |path| {
            StoreBackend::Directory {
                path: PathBuf::from(path),
            }
        });
        Self {
            base_directory,
            backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_toml() {
        let config = Config::from_toml_str(
            r#"
            base_directory = "/tmp/runs"

            [backend]
            kind = "directory"
            path = "/tmp/runs/db"
            "#,
        )
        .unwrap();
        assert_eq!(config.base_directory, PathBuf::from("/tmp/runs"));
        assert_eq!(
            config.backend,
            StoreBackend::Directory {
                path: PathBuf::from("/tmp/runs/db")
            }
        );
    }

    #[test]
    fn test_config_backend_defaults_to_memory() {
        let config = Config::from_toml_str(r#"base_directory = "/tmp/runs""#).unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_config_invalid_toml() {
        assert!(matches!(
            Config::from_toml_str("base_directory = 3"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_config_from_vars() {
        let config = Config::from_vars(|_| None);
        assert_eq!(config, Config::default());

        let config = Config::from_vars(|key| match key {
            ENV_DATA_DIR => Some("/srv/runs".into()),
            ENV_STORE_DIR => Some("/srv/db".into()),
            _ => None,
        });
        assert_eq!(config.base_directory, PathBuf::from("/srv/runs"));
        assert_eq!(
            config.backend,
            StoreBackend::Directory {
                path: PathBuf::from("/srv/db")
            }
        );
    }
}
