//! # Stageload - repair and normalization of marketing exports
//!
//! Stageload ingests a CRM revenue CSV, a Facebook Ads CSV and a Google Ads JSON
//! feed, repairs CRM rows whose fields were shifted by unescaped delimiters,
//! canonicalizes column names and values, and stages each result as a table.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Source file │────▶│   Parser    │────▶│   Repair    │────▶│  Normalize  │────▶│    Sink     │
//! │ (CSV/JSON)  │     │ (auto-enc)  │     │ (CRM only)  │     │ (names+vals)│     │ (replace)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stageload::{run_ingestion, IngestConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IngestConfig::from_env()?;
//!     let mut sink = config.sink.open()?;
//!     let report = run_ingestion(&config, sink.as_mut())?;
//!     sink.close()?;
//!     println!("Staged {} rows", report.total_rows());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells and tables
//! - [`vocabulary`] - Fixed region labels and column roles
//! - [`parser`] - Delimited and Google feed adapters
//! - [`transform`] - Column names, repair, value normalization, pipeline
//! - [`validation`] - JSON Schema checks for structured feeds
//! - [`sink`] - SQLite, CSV-directory and in-memory staging sinks
//! - [`config`] - Environment configuration
//! - [`logs`] - Tracing subscriber setup

// Core modules
pub mod error;
pub mod models;
pub mod vocabulary;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Staging
pub mod sink;

// Runtime
pub mod config;
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, PipelineError, PipelineResult, SinkError, SinkResult, SourceError, SourceResult,
    TableError, TableResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellValue, Table};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, read_delimited, read_google_feed,
    DelimitedOptions, MalformedAction, MalformedRecord, ParsedSource,
};

// =============================================================================
// Re-exports - Normalization and repair
// =============================================================================

pub use transform::{
    normalize_column_name, normalize_column_names, normalize_date, normalize_values,
    ColumnPolicy, RepairReport, RowRepairer,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    clean_parsed, clean_source, ingest_source, parse_source, run_ingestion, CleanedSource,
    IngestReport, SourceKind, SourceOutcome, SourceStatus,
};

// =============================================================================
// Re-exports - Sinks and config
// =============================================================================

pub use config::{IngestConfig, SinkTarget};
pub use sink::{CsvDirSink, Destination, MemorySink, SqliteSink, StagingSink};
