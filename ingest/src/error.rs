//! Error types for the staging ingestion pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`SourceError`] - Reading and decoding source files
//! - [`TableError`] - Structural table operations
//! - [`SinkError`] - Persisting staged tables
//! - [`ConfigError`] - Environment and CLI configuration
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Bad *data* never surfaces here: repair and normalization degrade to null
//! cells. Only structural failures (unreadable file, broken feed, unavailable
//! sink) become errors, and every one of them aborts the run.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors while reading a raw source into a table.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source has no header line.
    #[error("source is empty")]
    EmptyFile,

    /// Header line contains no usable column name.
    #[error("no headers found in source")]
    NoHeaders,

    /// Delimited parsing failed beyond per-row recovery.
    #[error("invalid delimited data: {0}")]
    Csv(#[from] csv::Error),

    /// Feed is not valid JSON.
    #[error("invalid JSON feed: {0}")]
    Json(#[from] serde_json::Error),

    /// Feed is JSON but does not have the expected shape.
    #[error("unexpected feed shape: {}", .errors.join("; "))]
    FeedShape { errors: Vec<String> },

    /// A record field collides with a campaign-level field.
    #[error("record field '{0}' conflicts with campaign metadata")]
    ConflictingField(String),

    /// Parsed rows did not fit the table built from the header.
    #[error("malformed table: {0}")]
    Table(#[from] TableError),
}

// =============================================================================
// Table Errors
// =============================================================================

/// Errors from structural table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// Column not present in the table.
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Row width does not match the column count.
    #[error("row has {found} values but table has {expected} columns")]
    RowWidth { expected: usize, found: usize },

    /// Rename list does not match the column count.
    #[error("expected {expected} column names, got {found}")]
    ColumnCount { expected: usize, found: usize },
}

// =============================================================================
// Sink Errors
// =============================================================================

/// Errors from staging sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Namespace or table name is not a plain identifier.
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// Namespace was never prepared on this sink.
    #[error("namespace '{0}' has not been prepared")]
    UnknownNamespace(String),

    /// Sink was used after `close`.
    #[error("sink is closed")]
    Closed,

    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure.
    #[error("sink IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer failure.
    #[error("sink CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while assembling the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable holds an unusable value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Fatal errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source could not be read.
    #[error("source error ({source_name}): {error}")]
    Source {
        source_name: String,
        #[source]
        error: SourceError,
    },

    /// Table operation failed.
    #[error("table error: {0}")]
    Table(#[from] TableError),

    /// Sink failed.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Attach a source label to an adapter error.
    pub fn from_source(source_name: impl Into<String>, error: SourceError) -> Self {
        Self::Source {
            source_name: source_name.into(),
            error,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source adapters.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for sinks.
pub type SinkResult<T> = Result<T, SinkError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
