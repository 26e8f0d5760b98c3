use std::{fmt, path::Path};

use crate::{
    config::FlatFileFormat,
    errors::DbError,
    models::schema::{SchemaDefinition, TableDefinition},
};

/// Statement text with `?` placeholders and the values bound to them, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTemplate {
    pub sql: String,
    pub params: Vec<String>,
}

impl SqlTemplate {
    pub fn new(sql: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A statement without placeholders, sent as plain text.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    pub fn is_raw(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Display for SqlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.sql)
        } else {
            write!(f, "{} -- {:?}", self.sql, self.params)
        }
    }
}

/// Escapes a value for use inside a single-quoted MySQL string literal.
pub fn sql_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Parameterized DML and bulk import/export statements.
pub struct DmlGenerator<'a> {
    schema: &'a SchemaDefinition,
}

impl<'a> DmlGenerator<'a> {
    pub fn new(schema: &'a SchemaDefinition) -> Self {
        Self { schema }
    }

    fn qualified_table(&self, table: &TableDefinition) -> String {
        format!("{}.{}", self.schema.database_name, table.table_name)
    }

    fn names(&self, table: &TableDefinition, attribute_ids: &[&str]) -> Result<Vec<String>, DbError> {
        attribute_ids
            .iter()
            .map(|id| table.attribute_name(id).map(str::to_string))
            .collect()
    }

    pub fn truncate_table_sql(&self, table_id: &str) -> Result<String, DbError> {
        let table = self.schema.table(table_id)?;
        Ok(format!("TRUNCATE TABLE {}", self.qualified_table(table)))
    }

    pub fn insert_template(&self, table_id: &str, attribute_ids: &[&str]) -> Result<String, DbError> {
        let table = self.schema.table(table_id)?;
        let names = self.names(table, attribute_ids)?;
        let placeholders = vec!["?"; names.len()];
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified_table(table),
            names.join(","),
            placeholders.join(",")
        ))
    }

    /// Insert of `(attribute_id, value)` pairs, in the order given.
    pub fn insert(&self, table_id: &str, values: &[(&str, String)]) -> Result<SqlTemplate, DbError> {
        let ids: Vec<&str> = values.iter().map(|(id, _)| *id).collect();
        let sql = self.insert_template(table_id, &ids)?;
        Ok(SqlTemplate::new(
            sql,
            values.iter().map(|(_, v)| v.clone()).collect(),
        ))
    }

    /// Without condition attributes the update is unconditional.
    pub fn update_template(
        &self,
        table_id: &str,
        update_ids: &[&str],
        condition_ids: &[&str],
    ) -> Result<String, DbError> {
        let table = self.schema.table(table_id)?;
        let set_clause: Vec<String> = self
            .names(table, update_ids)?
            .into_iter()
            .map(|n| format!("{}=?", n))
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.qualified_table(table),
            set_clause.join(", ")
        );
        sql.push_str(&self.where_clause(table, condition_ids)?);
        Ok(sql)
    }

    /// Without condition attributes the delete is unconditional.
    pub fn delete_template(&self, table_id: &str, condition_ids: &[&str]) -> Result<String, DbError> {
        let table = self.schema.table(table_id)?;
        let mut sql = format!("DELETE FROM {}", self.qualified_table(table));
        sql.push_str(&self.where_clause(table, condition_ids)?);
        Ok(sql)
    }

    fn where_clause(&self, table: &TableDefinition, condition_ids: &[&str]) -> Result<String, DbError> {
        if condition_ids.is_empty() {
            return Ok(String::new());
        }
        let predicates: Vec<String> = self
            .names(table, condition_ids)?
            .into_iter()
            .map(|n| format!("{}=?", n))
            .collect();
        Ok(format!(" WHERE ({})", predicates.join(" AND ")))
    }

    /// One `DELETE ... IN (...)` per chunk of at most `chunk_size` values.
    pub fn delete_from_list(
        &self,
        table_id: &str,
        attribute_id: &str,
        values: &[String],
        chunk_size: usize,
    ) -> Result<Vec<SqlTemplate>, DbError> {
        let table = self.schema.table(table_id)?;
        let name = table.attribute_name(attribute_id)?;
        let qualified = self.qualified_table(table);
        let values: Vec<String> = values.iter().filter(|v| !v.is_empty()).cloned().collect();
        Ok(values
            .chunks(chunk_size.max(1))
            .map(|chunk| {
                let placeholders = vec!["?"; chunk.len()];
                SqlTemplate::new(
                    format!(
                        "DELETE FROM {} WHERE {} IN ({})",
                        qualified,
                        name,
                        placeholders.join(",")
                    ),
                    chunk.to_vec(),
                )
            })
            .collect())
    }

    fn field_clause(format: &FlatFileFormat) -> String {
        let mut clause = format!(
            "FIELDS TERMINATED BY {}",
            sql_string_literal(&format.field_separator)
        );
        if format.quoted {
            clause.push_str(" OPTIONALLY ENCLOSED BY '\"'");
        }
        clause.push_str(&format!(
            " LINES TERMINATED BY {}",
            sql_string_literal(&format.row_separator)
        ));
        clause
    }

    /// Server-side export of every attribute, in order, to `path`.
    pub fn export_table_sql(
        &self,
        table_id: &str,
        path: &Path,
        format: &FlatFileFormat,
    ) -> Result<String, DbError> {
        let table = self.schema.table(table_id)?;
        Ok(format!(
            "SELECT {} INTO OUTFILE {} {} FROM {}",
            table.attribute_names().join(","),
            sql_string_literal(&path.to_string_lossy()),
            Self::field_clause(format),
            self.qualified_table(table)
        ))
    }

    /// Bulk import of `path`, optionally preceded by a truncate.
    pub fn import_table_sql(
        &self,
        table_id: &str,
        path: &Path,
        truncate: bool,
        format: &FlatFileFormat,
        local_infile: bool,
    ) -> Result<Vec<String>, DbError> {
        let table = self.schema.table(table_id)?;
        let mut statements = Vec::new();
        if truncate {
            statements.push(self.truncate_table_sql(table_id)?);
        }
        statements.push(format!(
            "LOAD DATA {}INFILE {} INTO TABLE {} {} ({})",
            if local_infile { "LOCAL " } else { "" },
            sql_string_literal(&path.to_string_lossy()),
            self.qualified_table(table),
            Self::field_clause(format),
            table.attribute_names().join(",")
        ));
        Ok(statements)
    }
}
