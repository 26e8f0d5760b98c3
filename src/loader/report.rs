use std::{collections::BTreeMap, path::Path, path::PathBuf};

use log::warn;

use crate::errors::DbError;

/// Longest value seen per `(table_id, attribute_id)` for values cut to the declared width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverflowTracker {
    entries: BTreeMap<(String, String), usize>,
}

impl OverflowTracker {
    pub fn record(&mut self, table_id: &str, attribute_id: &str, observed_length: usize) {
        let entry = self
            .entries
            .entry((table_id.to_string(), attribute_id.to_string()))
            .or_insert(0);
        *entry = (*entry).max(observed_length);
    }

    pub fn get(&self, table_id: &str, attribute_id: &str) -> Option<usize> {
        self.entries
            .get(&(table_id.to_string(), attribute_id.to_string()))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, usize)> {
        self.entries
            .iter()
            .map(|((t, a), l)| (t.as_str(), a.as_str(), *l))
    }

    pub fn log_summary(&self) {
        for (table_id, attribute_id, length) in self.iter() {
            warn!(
                "Truncated {}.{} values, longest was {} characters",
                table_id, attribute_id, length
            );
        }
    }

    /// Writes `table_id,attribute_id,max_length` rows.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), DbError> {
        let mut wtr = csv::Writer::from_path(path.as_ref())?;
        wtr.write_record(["table_id", "attribute_id", "max_length"])?;
        for (table_id, attribute_id, length) in self.iter() {
            wtr.write_record([table_id, attribute_id, length.to_string().as_str()])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoadStatus {
    pub table_id: String,
    pub rows: usize,
    pub success: bool,
}

/// Outcome of one load call.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub container_names: Vec<String>,
    pub tables: Vec<TableLoadStatus>,
    pub overflow: OverflowTracker,
    pub failed_sources: Vec<PathBuf>,
}

impl LoadReport {
    pub fn record(&mut self, table_id: &str, rows: usize, success: bool) {
        self.tables.push(TableLoadStatus {
            table_id: table_id.to_string(),
            rows,
            success,
        });
    }

    pub fn success(&self) -> bool {
        self.failed_sources.is_empty() && self.tables.iter().all(|t| t.success)
    }

    pub fn failed_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| !t.success)
            .map(|t| t.table_id.as_str())
            .collect()
    }

    pub fn table(&self, table_id: &str) -> Option<&TableLoadStatus> {
        self.tables.iter().find(|t| t.table_id == table_id)
    }
}
