//! Unified error handling for the exporter
//!
//! Fatal errors abort an export run and surface as a single message to the
//! user. Per-texture and per-path problems are not represented here; those
//! live in the subsystem that produces them and never escape a run.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all fatal exporter operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // ==================== Configuration Errors ====================

    /// Required setting was left empty
    #[error("Missing configuration: {key}")]
    MissingConfig {
        key: String,
    },

    /// Setting present but outside its allowed domain
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
    },

    /// Configured collection does not exist in the scene
    #[error("Collection not found: {name}")]
    CollectionNotFound {
        name: String,
    },

    // ==================== Export Errors ====================

    /// The mesh exporter rejected or failed an LOD export
    #[error("Mesh export failed for {path}: {message}")]
    MeshExport {
        path: PathBuf,
        message: String,
    },

    /// Manifest could not be serialized
    #[error("Manifest generation failed: {message}")]
    Manifest {
        message: String,
    },

    // ==================== General Errors ====================

    /// Internal error (should not happen)
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// External error (from other crates)
    #[error("{0}")]
    External(String),
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a missing configuration error
    pub fn missing_config(key: impl Into<String>) -> Self {
        Error::MissingConfig { key: key.into() }
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::FileNotFound(_) | Error::CollectionNotFound { .. } => true,
            Error::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error was raised while validating the configuration
    pub fn is_config_error(&self) -> bool {
        match self {
            Error::MissingConfig { .. }
            | Error::InvalidConfig { .. }
            | Error::CollectionNotFound { .. } => true,
            Error::WithContext { source, .. } => source.is_config_error(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::invalid_config(err.to_string())
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::FileNotFound(PathBuf::from("/test"));
        let contextualized = err.with_context("while writing manifest");

        assert!(contextualized.to_string().contains("while writing manifest"));
        assert!(contextualized.is_not_found());
    }

    #[test]
    fn test_is_config_error() {
        assert!(Error::missing_config("output_root").is_config_error());
        assert!(Error::CollectionNotFound { name: "Wing".into() }.is_config_error());
        assert!(!Error::MeshExport {
            path: PathBuf::from("a.gltf"),
            message: "boom".into(),
        }
        .is_config_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::missing_config("collection"));
        let with_context = result.context("validating export");

        let err = with_context.unwrap_err();
        assert!(err.to_string().contains("validating export"));
        assert!(err.is_config_error());
    }
}
