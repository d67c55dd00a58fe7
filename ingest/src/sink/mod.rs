//! Staging sinks: where cleaned tables are persisted.
//!
//! A sink is an explicit handle with a three-step lifecycle: the orchestrator
//! [`prepare`](StagingSink::prepare)s a namespace, [`replace`](StagingSink::replace)s
//! one table per source, then the caller [`close`](StagingSink::close)s it.
//!
//! | Sink           | Namespace maps to                    | Table maps to              |
//! |----------------|--------------------------------------|----------------------------|
//! | [`SqliteSink`] | attached database `<dir>/<ns>.db`    | SQLite table               |
//! | [`CsvDirSink`] | directory `<root>/<ns>/`             | `<table>.csv`              |
//! | [`MemorySink`] | map key                              | owned [`Table`] copy       |

pub mod csv_dir;
pub mod memory;
pub mod sqlite;

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{SinkError, SinkResult};
use crate::models::Table;

pub use csv_dir::CsvDirSink;
pub use memory::MemorySink;
pub use sqlite::SqliteSink;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern"));

/// Check that a namespace or table name is a plain identifier.
pub fn validate_identifier(name: &str) -> SinkResult<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(SinkError::InvalidIdentifier(name.to_string()))
    }
}

/// A namespaced staging table name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Destination {
    namespace: String,
    table: String,
}

impl Destination {
    pub fn new(namespace: impl Into<String>, table: impl Into<String>) -> SinkResult<Self> {
        let namespace = namespace.into();
        let table = table.into();
        validate_identifier(&namespace)?;
        validate_identifier(&table)?;
        Ok(Self { namespace, table })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.table)
    }
}

/// Persistence target for cleaned tables.
pub trait StagingSink {
    /// Short label used in logs.
    fn kind(&self) -> &'static str;

    /// Create the namespace if needed. Idempotent.
    fn prepare(&mut self, namespace: &str) -> SinkResult<()>;

    /// Drop any previous contents of `destination` and write `table` in row order.
    /// Returns the number of rows written.
    fn replace(&mut self, destination: &Destination, table: &Table) -> SinkResult<usize>;

    /// Release the underlying resources. Later calls fail with [`SinkError::Closed`].
    fn close(&mut self) -> SinkResult<()> {
        Ok(())
    }
}
