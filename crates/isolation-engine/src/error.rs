//! Error types for isolation-engine

use thiserror::Error;

/// Errors that can occur while talking to the isolation engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Engine client binary could not be started
    #[error("engine binary `{binary}` could not be started: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// Engine refused or failed the requested operation
    #[error("{operation} rejected by engine: {detail}")]
    Rejected {
        operation: &'static str,
        detail: String,
    },

    /// Host-side file to stage does not exist
    #[error("host file not found: {0}")]
    HostFileNotFound(String),

    /// Requested path does not exist inside the container
    #[error("path not found in container: {0}")]
    ContainerPathNotFound(String),

    /// Container id is not known to the engine
    #[error("no such container: {0}")]
    UnknownContainer(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn rejected(operation: &'static str, detail: impl Into<String>) -> Self {
        EngineError::Rejected {
            operation,
            detail: detail.into(),
        }
    }
}
