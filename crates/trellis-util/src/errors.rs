use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Trellis operations.
#[derive(Debug, Error, Diagnostic)]
pub enum TrellisError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed coordinate, version, module id or dependency file.
    #[error("Parse error: {message}")]
    #[diagnostic(help(
        "Coordinates are written as group:name, group:name:version, \
         group:name:classifier:version or group:name:classifier:type:version"
    ))]
    Parse { message: String },

    /// Divergent versions of one module under the `fail` conflict strategy.
    #[error("Version conflict: {message}")]
    Conflict { message: String },

    /// Dependency resolution finished with errors (missing modules, conflicts, etc.).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// A repository could not be read or answered with garbage.
    #[error("Repository error: {message}")]
    Repository { message: String },

    /// Invalid settings file.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check your trellis.toml for syntax errors"))]
    Config { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl TrellisError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Convenience alias used by the model crates.
pub type TrellisResult<T> = Result<T, TrellisError>;
