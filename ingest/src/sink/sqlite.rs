//! SQLite staging sink.
//!
//! Each namespace is a separate database file attached next to the main one
//! (`<dir>/<namespace>.db`), so `stg_data.stg_crm_revenue` resolves the same
//! way it would on a server with schemas. In-memory sinks attach `:memory:`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rusqlite::types::{Null, ToSqlOutput};
use rusqlite::{params, params_from_iter, Connection, ToSql};
use tracing::{debug, info};

use super::{validate_identifier, Destination, StagingSink};
use crate::error::{SinkError, SinkResult};
use crate::models::{CellValue, Table};

/// Schemas every connection already has. They are never attached.
const BUILTIN_SCHEMAS: [&str; 2] = ["main", "temp"];

fn is_builtin_schema(namespace: &str) -> bool {
    BUILTIN_SCHEMAS
        .iter()
        .any(|schema| schema.eq_ignore_ascii_case(namespace))
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Text(s) => ToSqlOutput::from(s.as_str()),
            CellValue::Int(i) => ToSqlOutput::from(*i),
            CellValue::Float(f) => ToSqlOutput::from(*f),
            CellValue::Null => ToSqlOutput::from(Null),
        })
    }
}

/// Declared SQLite type of a column, from its non-null cells. All-null columns are TEXT.
fn column_affinity<'a>(cells: impl Iterator<Item = &'a CellValue>) -> &'static str {
    let mut affinity = None;
    for cell in cells {
        match cell {
            CellValue::Null => {}
            CellValue::Int(_) => {
                affinity.get_or_insert("INTEGER");
            }
            CellValue::Float(_) => affinity = Some("REAL"),
            CellValue::Text(_) => return "TEXT",
        }
    }
    affinity.unwrap_or("TEXT")
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified(destination: &Destination) -> String {
    format!(
        "{}.{}",
        quote_identifier(destination.namespace()),
        quote_identifier(destination.table())
    )
}

pub struct SqliteSink {
    conn: Option<Connection>,
    base_dir: Option<PathBuf>,
    namespaces: BTreeSet<String>,
}

impl SqliteSink {
    /// Open (or create) the main database at `path`. Namespace files live in the same directory.
    pub fn open<P: AsRef<Path>>(path: P) -> SinkResult<Self> {
        let path = path.as_ref();
        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent)?;
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened sqlite staging database");
        Ok(Self::with_connection(conn, Some(base_dir)))
    }

    /// Fully in-memory sink; every namespace is its own `:memory:` database.
    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::with_connection(conn, None))
    }

    fn with_connection(conn: Connection, base_dir: Option<PathBuf>) -> Self {
        let namespaces = BUILTIN_SCHEMAS.iter().map(|s| s.to_string()).collect();
        Self {
            conn: Some(conn),
            base_dir,
            namespaces,
        }
    }

    fn conn(&self) -> SinkResult<&Connection> {
        self.conn.as_ref().ok_or(SinkError::Closed)
    }

    fn namespace_location(&self, namespace: &str) -> String {
        match &self.base_dir {
            Some(dir) => dir
                .join(format!("{}.db", namespace))
                .to_string_lossy()
                .into_owned(),
            None => ":memory:".to_string(),
        }
    }

    /// Number of rows currently stored at `destination`.
    pub fn row_count(&self, destination: &Destination) -> SinkResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualified(destination));
        let count: i64 = self.conn()?.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Column names of the stored table at `destination`.
    pub fn column_names(&self, destination: &Destination) -> SinkResult<Vec<String>> {
        let sql = format!("SELECT * FROM {} LIMIT 0", qualified(destination));
        let stmt = self.conn()?.prepare(&sql)?;
        Ok(stmt.column_names().into_iter().map(str::to_string).collect())
    }

    /// Declared type of each column at `destination`.
    pub fn column_types(&self, destination: &Destination) -> SinkResult<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1, ?2)")?;
        let rows = stmt.query_map(params![destination.table(), destination.namespace()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl StagingSink for SqliteSink {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn prepare(&mut self, namespace: &str) -> SinkResult<()> {
        validate_identifier(namespace)?;
        if self.namespaces.contains(namespace) {
            return Ok(());
        }
        if is_builtin_schema(namespace) {
            self.conn()?;
            self.namespaces.insert(namespace.to_string());
            return Ok(());
        }
        let location = self.namespace_location(namespace);
        let sql = format!("ATTACH DATABASE ?1 AS {}", quote_identifier(namespace));
        self.conn()?.execute(&sql, params![location])?;
        debug!(namespace, location = %location, "attached namespace");
        self.namespaces.insert(namespace.to_string());
        Ok(())
    }

    fn replace(&mut self, destination: &Destination, table: &Table) -> SinkResult<usize> {
        if !self.namespaces.contains(destination.namespace()) {
            return Err(SinkError::UnknownNamespace(destination.namespace().to_string()));
        }
        let conn = self.conn.as_mut().ok_or(SinkError::Closed)?;
        let target = qualified(destination);

        let tx = conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", target), [])?;

        if table.column_count() > 0 {
            let column_defs: Vec<String> = table
                .columns()
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    format!(
                        "{} {}",
                        quote_identifier(name),
                        column_affinity(table.column_cells(idx))
                    )
                })
                .collect();
            tx.execute(
                &format!("CREATE TABLE {} ({})", target, column_defs.join(", ")),
                [],
            )?;

            let placeholders = vec!["?"; table.column_count()].join(", ");
            let mut insert =
                tx.prepare(&format!("INSERT INTO {} VALUES ({})", target, placeholders))?;
            for row in table.rows() {
                insert.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        debug!(destination = %destination, rows = table.row_count(), "replaced sqlite table");
        Ok(table.row_count())
    }

    fn close(&mut self) -> SinkResult<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| SinkError::Sqlite(e)),
            None => Err(SinkError::Closed),
        }
    }
}
