//! CSV directory sink: one file per table under a namespace directory.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{validate_identifier, Destination, StagingSink};
use crate::error::{SinkError, SinkResult};
use crate::models::Table;

pub struct CsvDirSink {
    root: PathBuf,
    namespaces: BTreeSet<String>,
    closed: bool,
}

impl CsvDirSink {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            namespaces: BTreeSet::new(),
            closed: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `destination`.
    pub fn table_path(&self, destination: &Destination) -> PathBuf {
        self.root
            .join(destination.namespace())
            .join(format!("{}.csv", destination.table()))
    }

    fn ensure_open(&self) -> SinkResult<()> {
        if self.closed {
            Err(SinkError::Closed)
        } else {
            Ok(())
        }
    }
}

fn write_table(path: &Path, table: &Table) -> SinkResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

impl StagingSink for CsvDirSink {
    fn kind(&self) -> &'static str {
        "csv"
    }

    fn prepare(&mut self, namespace: &str) -> SinkResult<()> {
        self.ensure_open()?;
        validate_identifier(namespace)?;
        fs::create_dir_all(self.root.join(namespace))?;
        self.namespaces.insert(namespace.to_string());
        Ok(())
    }

    fn replace(&mut self, destination: &Destination, table: &Table) -> SinkResult<usize> {
        self.ensure_open()?;
        if !self.namespaces.contains(destination.namespace()) {
            return Err(SinkError::UnknownNamespace(destination.namespace().to_string()));
        }

        let path = self.table_path(destination);
        let tmp_path = path.with_extension("csv.tmp");

        let written = write_table(&tmp_path, table)
            .and_then(|()| fs::rename(&tmp_path, &path).map_err(SinkError::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        debug!(destination = %destination, path = %path.display(), rows = table.row_count(), "replaced csv table");
        Ok(table.row_count())
    }

    fn close(&mut self) -> SinkResult<()> {
        self.ensure_open()?;
        self.closed = true;
        Ok(())
    }
}
