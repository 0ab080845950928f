//! Error types for the `mythos` binary.
//!
//! [`CliError`] wraps every failure a command can hit so that `main` can
//! propagate with `?`.

/// Top-level error for the `mythos` binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: mythos_core::ConfigError,
    },

    /// An engine operation failed.
    #[error("{source}")]
    Mythos {
        /// The underlying engine error.
        #[from]
        source: mythos_core::MythosError,
    },

    /// A data file could not be read or written.
    #[error("storage error: {source}")]
    Db {
        /// The underlying storage error.
        #[from]
        source: mythos_db::DbError,
    },

    /// JSON output could not be produced.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serializer error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML output could not be produced.
    #[error("YAML error: {source}")]
    Yaml {
        /// The underlying serializer error.
        #[from]
        source: serde_yml::Error,
    },

    /// Writing to stdout failed.
    #[error("output error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Arguments that parse but do not make sense together.
    #[error("usage error: {message}")]
    Usage {
        /// What was wrong.
        message: String,
    },
}
