use std::{collections::HashMap, path::PathBuf};

use log::{debug, error};

use crate::{
    errors::DbError,
    loader::report::OverflowTracker,
    models::{
        container::{DataCategory, DataContainer},
        schema::{SchemaDefinition, TableDefinition, MISSING_VALUE_SENTINELS},
    },
};

/// Attribute id to string value for one output row.
pub type RowRecord = HashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct TableRows {
    pub table_id: String,
    pub rows: Vec<RowRecord>,
}

/// Per-table rows produced from one batch of containers.
#[derive(Debug, Clone, Default)]
pub struct MappedData {
    pub container_names: Vec<String>,
    pub tables: Vec<TableRows>,
    pub overflow: OverflowTracker,
    /// Tables whose mapping failed for at least one container.
    pub failed_tables: Vec<String>,
    /// Inputs the container reader could not read.
    pub failed_sources: Vec<PathBuf>,
}

impl MappedData {
    pub fn rows(&self, table_id: &str) -> &[RowRecord] {
        self.tables
            .iter()
            .find(|t| t.table_id == table_id)
            .map(|t| t.rows.as_slice())
            .unwrap_or(&[])
    }

    fn rows_mut(&mut self, table_id: &str) -> &mut Vec<RowRecord> {
        let pos = match self.tables.iter().position(|t| t.table_id == table_id) {
            Some(pos) => pos,
            None => {
                self.tables.push(TableRows {
                    table_id: table_id.to_string(),
                    rows: Vec::new(),
                });
                self.tables.len() - 1
            }
        };
        &mut self.tables[pos].rows
    }

    fn mark_failed(&mut self, table_id: &str) {
        if !self.failed_tables.iter().any(|t| t == table_id) {
            self.failed_tables.push(table_id.to_string());
        }
    }

    pub fn is_failed(&self, table_id: &str) -> bool {
        self.failed_tables.iter().any(|t| t == table_id)
    }
}

/// Maps source categories onto schema tables.
pub struct Mapper<'a> {
    schema: &'a SchemaDefinition,
}

impl<'a> Mapper<'a> {
    pub fn new(schema: &'a SchemaDefinition) -> Self {
        Self { schema }
    }

    pub fn process(&self, containers: &[DataContainer]) -> MappedData {
        let mut data = MappedData::default();
        for container in containers {
            data.container_names.push(container.name.clone());
            for table in self.schema.tables.iter().filter(|t| t.is_mapped()) {
                match self.map_table(table, container, &mut data.overflow) {
                    Ok(rows) => {
                        debug!(
                            "Mapped {} rows into {} from {}",
                            rows.len(),
                            table.table_id,
                            container.name
                        );
                        data.rows_mut(&table.table_id).extend(rows);
                    }
                    Err(e) => {
                        error!(
                            "Mapping {} from container {} failed: {}",
                            table.table_id, container.name, e
                        );
                        data.mark_failed(&table.table_id);
                    }
                }
            }
        }
        data
    }

    fn map_table(
        &self,
        table: &TableDefinition,
        container: &DataContainer,
        overflow: &mut OverflowTracker,
    ) -> Result<Vec<RowRecord>, DbError> {
        let categories = table.map_categories();
        let mut rows = if categories.len() == 1 {
            match container.category(categories[0]) {
                Some(category) => self.copy_rows(table, category, overflow)?,
                None => Vec::new(),
            }
        } else {
            self.merge_rows(table, container, &categories, overflow)?
        };

        for mapping in table.function_mappings() {
            if let Some(function) = &mapping.function {
                let value = function.evaluate(&container.name, &mapping.function_args);
                for row in rows.iter_mut() {
                    row.insert(mapping.attribute_id.clone(), value.clone());
                }
            }
        }
        Ok(rows)
    }

    fn null_row(table: &TableDefinition) -> RowRecord {
        table
            .attributes
            .iter()
            .map(|a| (a.attribute_id.clone(), a.null_placeholder().to_string()))
            .collect()
    }

    /// `(attribute_id, value)` pairs one source row supplies; missing-value sentinels are skipped.
    fn supplied_values(
        &self,
        table: &TableDefinition,
        category: &DataCategory,
        index: &HashMap<&str, usize>,
        row_number: usize,
        row: &[String],
        overflow: &mut OverflowTracker,
    ) -> Result<Vec<(String, String)>, DbError> {
        let mut values = Vec::new();
        for (attribute_id, source_attribute) in table.category_attributes(&category.name) {
            let Some(&column) = index.get(source_attribute) else {
                continue;
            };
            let raw = row.get(column).ok_or_else(|| {
                DbError::Import(format!(
                    "row {} of category {} has {} fields, {}.{} expects column {}",
                    row_number,
                    category.name,
                    row.len(),
                    table.table_id,
                    attribute_id,
                    column
                ))
            })?;
            if let Some(value) = self.convert(table, attribute_id, raw, overflow)? {
                values.push((attribute_id.to_string(), value));
            }
        }
        Ok(values)
    }

    /// `None` for a missing-value sentinel; otherwise the value cut to the declared width.
    fn convert(
        &self,
        table: &TableDefinition,
        attribute_id: &str,
        raw: &str,
        overflow: &mut OverflowTracker,
    ) -> Result<Option<String>, DbError> {
        if MISSING_VALUE_SENTINELS.contains(&raw) {
            return Ok(None);
        }
        let width = table.string_width(attribute_id)?;
        let length = raw.chars().count();
        if width > 0 && length > width {
            overflow.record(&table.table_id, attribute_id, length);
            return Ok(Some(raw.chars().take(width).collect()));
        }
        Ok(Some(raw.to_string()))
    }

    fn copy_rows(
        &self,
        table: &TableDefinition,
        category: &DataCategory,
        overflow: &mut OverflowTracker,
    ) -> Result<Vec<RowRecord>, DbError> {
        let index = category.attribute_index_map();
        let mut rows = Vec::with_capacity(category.rows.len());
        for (n, source_row) in category.rows.iter().enumerate() {
            let mut record = Self::null_row(table);
            record.extend(self.supplied_values(table, category, &index, n, source_row, overflow)?);
            rows.push(record);
        }
        Ok(rows)
    }

    /// Rows keyed by merge-index values; a later category only overwrites the fields it supplies.
    fn merge_rows(
        &self,
        table: &TableDefinition,
        container: &DataContainer,
        categories: &[&str],
        overflow: &mut OverflowTracker,
    ) -> Result<Vec<RowRecord>, DbError> {
        let mut rows: Vec<RowRecord> = Vec::new();
        let mut positions: HashMap<Vec<String>, usize> = HashMap::new();

        for category_name in categories {
            let Some(category) = container.category(category_name) else {
                continue;
            };
            let merge_attributes = table.merge_index(category_name).ok_or_else(|| {
                DbError::schema(format!(
                    "table {} has no merge index for category {}",
                    table.table_id, category_name
                ))
            })?;
            let index = category.attribute_index_map();

            for (n, source_row) in category.rows.iter().enumerate() {
                let key: Vec<String> = merge_attributes
                    .iter()
                    .map(|a| {
                        index
                            .get(a.as_str())
                            .and_then(|&i| source_row.get(i))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect();
                let values =
                    self.supplied_values(table, category, &index, n, source_row, overflow)?;

                match positions.get(&key) {
                    Some(&pos) => rows[pos].extend(values),
                    None => {
                        let mut record = Self::null_row(table);
                        record.extend(values);
                        positions.insert(key, rows.len());
                        rows.push(record);
                    }
                }
            }
        }
        Ok(rows)
    }
}
