//! Defines the custom error type for the `core` module.

use camino::Utf8PathBuf;
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// Validation variants (`NotFound`, `NameConflict`, `NotEmpty`, `InvalidMove`)
/// are always raised before storage is touched. Everything else is an
/// underlying failure passed through unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A directory or entry that the operation depends on does not exist.
    #[error("Entry not found: {0}")]
    NotFound(Utf8PathBuf),

    /// A sibling of the same kind already uses the requested name.
    #[error("Name conflict: '{name}' already exists in {parent}")]
    NameConflict { name: String, parent: Utf8PathBuf },

    /// A non-recursive folder delete found remaining children.
    #[error("Folder is not empty: {0}")]
    NotEmpty(Utf8PathBuf),

    /// The entry exists but is a folder where a note was expected.
    #[error("Not a note: {0}")]
    NotANote(Utf8PathBuf),

    /// The entry exists but is a note where a folder was expected.
    #[error("Not a folder: {0}")]
    NotAFolder(Utf8PathBuf),

    /// A name that is blank after sanitizing, or a relative path component.
    #[error("Invalid name: '{0}'")]
    InvalidName(String),

    /// A folder cannot be moved into itself or one of its descendants.
    #[error("Cannot move {from} into {target}")]
    InvalidMove {
        from: Utf8PathBuf,
        target: Utf8PathBuf,
    },

    /// An operation needed an active collection but none is open.
    #[error("No collection is open")]
    NoCollection,

    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, Utf8PathBuf),

    /// A path on disk could not be represented as UTF-8.
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(std::path::PathBuf),

    /// Represents an error from the relational backing.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Settings or catalog data could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A storage handle was left unusable by a panic in another task.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Represents an error that occurred when a Tokio task was joined.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl CoreError {
    /// Wraps an `io::Error` together with the path it happened on.
    pub fn io(err: std::io::Error, path: impl Into<Utf8PathBuf>) -> Self {
        CoreError::Io(err, path.into())
    }

    /// `true` for the validation failures that guarantee storage was left untouched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound(_)
                | CoreError::NameConflict { .. }
                | CoreError::NotEmpty(_)
                | CoreError::NotANote(_)
                | CoreError::NotAFolder(_)
                | CoreError::InvalidMove { .. }
                | CoreError::InvalidName(_)
                | CoreError::NoCollection
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
