//! Error types for devloop.
//!
//! Only collaborator failures surface here. Problems *reported by* a lint pass
//! are data (`LintOutcome`), never errors.

use thiserror::Error;

/// Main error type for devloop operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lint tool failed: {0}")]
    Lint(String),

    #[error("Failed to spawn server: {0}")]
    Spawn(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Signal error: {0}")]
    Signal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for devloop operations
pub type Result<T> = std::result::Result<T, Error>;
