//! Error types for the file-backed data layer.
//!
//! All errors are propagated via [`DbError`], which names the file an
//! operation touched. The engine sees them as
//! [`MythosError::Persistence`](mythos_core::MythosError::Persistence).

use std::path::PathBuf;

use mythos_core::MythosError;

/// Errors that can occur while reading or writing Mythos data files.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A file operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A YAML serialization or deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    /// A line of the event log could not be parsed.
    #[error("corrupt event log {} at line {line}: {message}", path.display())]
    CorruptLog {
        /// The event log file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What the parser reported.
        message: String,
    },

    /// A file that must exist does not.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
}

impl DbError {
    /// Attach `path` to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<DbError> for MythosError {
    fn from(err: DbError) -> Self {
        Self::persistence(err)
    }
}
