//! Error types for Doxograph.
//!
//! Library crates use [`DoxographError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Doxograph operations.
#[derive(Debug, thiserror::Error)]
pub enum DoxographError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// XML parsing error for one compound file.
    #[error("xml error at {path:?}: {message}")]
    Xml { path: PathBuf, message: String },

    /// A compound file with no `<compounddef>` root definition element.
    /// Fatal for that compound only; callers skip the subtree.
    #[error("compound {path:?} has no <compounddef> element")]
    MissingRoot { path: PathBuf },

    /// A second registration of an already-bound identifier, reported only
    /// when the build runs with the `error` duplicate-id policy.
    #[error("duplicate identifier registration: {refid}")]
    DuplicateId { refid: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DoxographError>;

impl DoxographError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an XML error with the offending file path.
    pub fn xml(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Xml {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DoxographError::config("missing xml directory");
        assert_eq!(err.to_string(), "config error: missing xml directory");

        let err = DoxographError::DuplicateId {
            refid: "classshape_1a42".into(),
        };
        assert!(err.to_string().contains("classshape_1a42"));
    }
}
