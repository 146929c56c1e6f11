//! Error types for the sandbox module.

use isolation_engine::EngineError;

/// Errors produced by a sandbox session.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Container not created")]
    NotCreated,

    #[error("Container already created: {0}")]
    AlreadyCreated(String),

    #[error("invalid sandbox configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to create container: {0}")]
    Create(#[source] EngineError),

    #[error("Failed to execute command: {0}")]
    Exec(#[source] EngineError),

    #[error("Failed to copy file to container: {0}")]
    CopyIn(#[source] EngineError),

    #[error("Failed to copy file from container: {0}")]
    CopyOut(#[source] EngineError),

    #[error("Failed to write {path}: {source}")]
    WriteLocal {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
