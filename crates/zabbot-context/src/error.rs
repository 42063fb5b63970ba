//! Error types for context aggregation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a data source while serving one operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The backing store cannot serve this operation
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The query ran but failed
    #[error("Query failed for {operation}: {reason}")]
    QueryFailed {
        operation: &'static str,
        reason: String,
    },

    /// The operation needs a host and none was given
    #[error("Operation {0} requires a host")]
    HostRequired(&'static str),

    /// The returned data had an unexpected shape
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Errors raised by the response generator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    /// The generator is not configured or not reachable
    #[error("Generator unavailable: {0}")]
    Unavailable(String),

    /// The generator was reached but failed to answer
    #[error("Generation failed: {0}")]
    Failed(String),
}

/// Errors that can occur outside the fail-open fetch path.
#[derive(Error, Debug)]
pub enum ContextError {
    /// Data source error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Generator error
    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    /// Snapshot file could not be read
    #[error("Failed to read snapshot {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot is not valid JSON or not an object
    #[error("Invalid snapshot: {0}")]
    SnapshotFormat(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid pattern in a rule table
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, ContextError>;
