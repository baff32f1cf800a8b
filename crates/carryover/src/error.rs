//! Error types for carryover.

use thiserror::Error;

use crate::types::{CardId, NoteId, NoteTypeId};

/// Result type for carryover operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by store failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving, indexing or transferring cards.
#[derive(Debug, Error)]
pub enum Error {
    /// No note type with this name defines a template with this name.
    #[error("template '{template}' not found in note type '{note_type}'")]
    TemplateNotFound {
        /// Note type name.
        note_type: String,
        /// Template name.
        template: String,
    },

    /// Several note types share the name and define the template.
    #[error("template '{template}' is defined by {count} note types named '{note_type}'")]
    AmbiguousTemplate {
        /// Note type name.
        note_type: String,
        /// Template name.
        template: String,
        /// Number of candidate note types.
        count: usize,
    },

    /// Field not found in a note type's schema.
    #[error("field '{field}' not found in note type '{note_type}'")]
    FieldNotFound {
        /// Note type name.
        note_type: String,
        /// Field name.
        field: String,
    },

    /// Two target cards share a field value and duplicates are rejected.
    #[error("field '{field}' has value '{value}' on both card {first} and card {second}")]
    DuplicateFieldValue {
        /// Field name.
        field: String,
        /// The repeated value.
        value: String,
        /// Card enumerated first.
        first: CardId,
        /// Card enumerated second.
        second: CardId,
    },

    /// Note type id not present in the collection.
    #[error("note type not found: {0}")]
    NoteTypeNotFound(NoteTypeId),

    /// Card id not present in the collection.
    #[error("card not found: {0}")]
    CardNotFound(CardId),

    /// Note id not present in the collection.
    #[error("note not found: {0}")]
    NoteNotFound(NoteId),

    /// A stored record could not be turned into a typed value.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The requested transfer makes no sense.
    #[error("validation error: {0}")]
    Validation(String),

    /// A job file is well-formed TOML but describes an unusable job.
    #[error("invalid job file: {0}")]
    InvalidConfig(String),

    /// An update, delete or id reassignment failed.
    #[error("store write failed during {operation}: {source}")]
    StoreWriteFailed {
        /// Store operation that failed.
        operation: &'static str,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// Pending changes could not be committed.
    #[error("commit failed: {0}")]
    CommitFailed(#[source] BoxError),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error (sqlite feature).
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Note type JSON could not be decoded (sqlite feature).
    #[cfg(feature = "sqlite")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a failed write with the name of the operation.
    pub fn write(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Error::StoreWriteFailed {
            operation,
            source: source.into(),
        }
    }

    /// Returns `true` for errors raised before any mutation is attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::TemplateNotFound { .. }
                | Error::AmbiguousTemplate { .. }
                | Error::FieldNotFound { .. }
                | Error::DuplicateFieldValue { .. }
                | Error::NoteTypeNotFound(_)
                | Error::Validation(_)
                | Error::InvalidConfig(_)
        )
    }
}
