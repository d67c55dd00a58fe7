//! In-memory sink. Keeps a copy of every replaced table.

use std::collections::{BTreeMap, BTreeSet};

use super::{validate_identifier, Destination, StagingSink};
use crate::error::{SinkError, SinkResult};
use crate::models::Table;

#[derive(Debug, Default)]
pub struct MemorySink {
    namespaces: BTreeSet<String>,
    tables: BTreeMap<Destination, Table>,
    replace_calls: usize,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, destination: &Destination) -> Option<&Table> {
        self.tables.get(destination)
    }

    /// Look up a stored table by raw names.
    pub fn table(&self, namespace: &str, table: &str) -> Option<&Table> {
        Destination::new(namespace, table)
            .ok()
            .and_then(|dest| self.tables.get(&dest))
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Destination> {
        self.tables.keys()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    /// Number of `replace` calls received, including overwrites.
    pub fn replace_calls(&self) -> usize {
        self.replace_calls
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl StagingSink for MemorySink {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn prepare(&mut self, namespace: &str) -> SinkResult<()> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        validate_identifier(namespace)?;
        self.namespaces.insert(namespace.to_string());
        Ok(())
    }

    fn replace(&mut self, destination: &Destination, table: &Table) -> SinkResult<usize> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        if !self.namespaces.contains(destination.namespace()) {
            return Err(SinkError::UnknownNamespace(destination.namespace().to_string()));
        }
        self.tables.insert(destination.clone(), table.clone());
        self.replace_calls += 1;
        Ok(table.row_count())
    }

    fn close(&mut self) -> SinkResult<()> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    #[test]
    fn test_replace_overwrites() {
        let mut sink = MemorySink::new();
        sink.prepare("stg_data").unwrap();
        let dest = Destination::new("stg_data", "t").unwrap();

        let first = Table::from_rows(vec!["a".into()], vec![vec![CellValue::Int(1)]; 3]).unwrap();
        let second = Table::from_rows(vec!["b".into()], vec![vec![CellValue::Int(2)]]).unwrap();
        assert_eq!(sink.replace(&dest, &first).unwrap(), 3);
        assert_eq!(sink.replace(&dest, &second).unwrap(), 1);

        assert_eq!(sink.get(&dest), Some(&second));
        assert_eq!(sink.table("stg_data", "t"), Some(&second));
        assert_eq!(sink.replace_calls(), 2);
        assert_eq!(sink.destinations().count(), 1);
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut sink = MemorySink::new();
        let dest = Destination::new("stg_data", "t").unwrap();
        assert!(matches!(
            sink.replace(&dest, &Table::default()),
            Err(SinkError::UnknownNamespace(_))
        ));
        assert!(sink.prepare("bad ns").is_err());

        sink.close().unwrap();
        assert!(sink.is_closed());
        assert!(matches!(sink.prepare("stg_data"), Err(SinkError::Closed)));
    }
}
