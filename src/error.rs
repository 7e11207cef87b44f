//! Error types for modelrun-db
//!
//! "Not found" is never an error here: lookups return `Option` so callers can
//! tell "nothing to do" apart from "something went wrong".

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Argument and property validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The same argument name was supplied more than once
    #[error("duplicate argument: {0}")]
    DuplicateArgument(String),

    /// Argument name is not part of the active definition set
    #[error("unknown argument: {0}")]
    UnknownArgument(String),

    /// Value does not satisfy the declared attribute type
    #[error("invalid value for '{name}': {reason}")]
    InvalidValue {
        /// Argument (or attribute) name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Property is managed by the store and cannot be updated directly
    #[error("cannot update immutable property: {0}")]
    ImmutableProperty(String),

    /// Property is mandatory and cannot be removed
    #[error("cannot delete mandatory property: {0}")]
    MandatoryProperty(String),
}

impl ValidationError {
    pub(crate) fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// modelrun-db error types
#[derive(Error, Debug)]
pub enum Error {
    /// Bad, unknown or duplicate argument, or a rejected property update
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Requested state change violates the run life cycle
    #[error("Illegal state transition: {from} -> {to}")]
    IllegalTransition {
        /// Current state tag
        from: &'static str,
        /// Requested state tag
        to: &'static str,
    },

    /// Operation is not permitted in the run's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Attachment exists with a different kind and cannot be replaced
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Identifier would resolve outside of its sandbox directory
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Attachment is not accessible through the data file accessors
    #[error("Attachment '{attachment}' has kind {kind}, expected DATAFILE")]
    WrongKind {
        /// Attachment identifier
        attachment: String,
        /// Stored attachment kind
        kind: &'static str,
    },

    /// Persisted document does not describe a valid record
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Document store or filesystem failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error was caused by the caller's request rather than by
    /// the storage layer. API layers map these to client-error responses.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::IllegalTransition { .. }
                | Self::InvalidState(_)
                | Self::Conflict(_)
                | Self::InvalidIdentifier(_)
                | Self::WrongKind { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedRecord(err.to_string())
    }
}
