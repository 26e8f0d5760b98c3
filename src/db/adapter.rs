use std::{collections::BTreeMap, path::Path};

use log::info;

use crate::{
    config::WarningAction,
    db::{executor::SqlExecutor, DbClient, RowTuple},
    errors::DbError,
    models::schema::SchemaDefinition,
    sql::{
        condition::{AttributeRef, CompareOp, ConditionBuilder, Literal, LogicalOp},
        ddl::DdlGenerator,
        dml::{DmlGenerator, SqlTemplate},
        query::QueryBuilder,
    },
};

/// Attribute id to value for one selected row.
pub type Record = BTreeMap<String, Option<String>>;

/// camelCase parameter name to value, as named by `default_attribute_parameter_map`.
pub type Request = BTreeMap<String, String>;

/// Table-level helpers keyed by attribute id.
pub struct DbAdapter<'a> {
    schema: &'a SchemaDefinition,
    executor: SqlExecutor<'a>,
}

impl<'a> DbAdapter<'a> {
    pub fn new(
        schema: &'a SchemaDefinition,
        client: &'a dyn DbClient,
        warning_action: WarningAction,
    ) -> Self {
        Self {
            schema,
            executor: SqlExecutor::new(client, warning_action),
        }
    }

    /// Drops and recreates the database with every table and index.
    pub async fn create_schema(&self, confirmed: bool) -> Result<bool, DbError> {
        if !confirmed {
            return Err(DbError::Unconfirmed(format!(
                "recreating database {}",
                self.schema.database_name
            )));
        }
        let statements: Vec<SqlTemplate> = DdlGenerator::new(self.schema)
            .create_schema_sql()?
            .into_iter()
            .map(SqlTemplate::raw)
            .collect();
        info!(
            "Creating database {} with {} tables",
            self.schema.database_name,
            self.schema.tables.len()
        );
        Ok(self.executor.sql_command(&statements).await)
    }

    /// Drops one table.
    pub async fn drop_table(&self, table_id: &str, confirmed: bool) -> Result<bool, DbError> {
        if !confirmed {
            return Err(DbError::Unconfirmed(format!("dropping table {}", table_id)));
        }
        let statements: Vec<SqlTemplate> = DdlGenerator::new(self.schema)
            .drop_table_sql(table_id)?
            .into_iter()
            .map(SqlTemplate::raw)
            .collect();
        Ok(self.executor.sql_command(&statements).await)
    }

    pub async fn drop_database(&self, confirmed: bool) -> Result<bool, DbError> {
        let name = &self.schema.database_name;
        if !confirmed {
            return Err(DbError::Unconfirmed(format!("dropping database {}", name)));
        }
        let statements: Vec<SqlTemplate> = DdlGenerator::new(self.schema)
            .drop_database_sql(name)
            .into_iter()
            .map(SqlTemplate::raw)
            .collect();
        Ok(self.executor.sql_command(&statements).await)
    }

    /// `(attribute_id, value)` pairs for a parameter-keyed request, in attribute order.
    fn request_values<'r>(
        &self,
        table_id: &str,
        request: &'r Request,
    ) -> Result<Vec<(&'a str, &'r str)>, DbError> {
        let table = self.schema.table(table_id)?;
        let parameter_map = table.default_attribute_parameter_map();
        if let Some(unknown) = request
            .keys()
            .find(|k| !parameter_map.iter().any(|(_, p)| p == *k))
        {
            return Err(DbError::schema(format!(
                "unknown parameter {} for table {}",
                unknown, table_id
            )));
        }
        Ok(parameter_map
            .into_iter()
            .filter_map(|(attribute_id, parameter)| {
                request
                    .get(&parameter)
                    .map(|value| (attribute_id, value.as_str()))
            })
            .collect())
    }

    pub async fn insert_request(&self, table_id: &str, request: &Request) -> Result<bool, DbError> {
        let values = self.request_values(table_id, request)?;
        self.insert(table_id, &values).await
    }

    /// Parameters named in `constraints` select the rows; the rest are assigned.
    pub async fn update_request(
        &self,
        table_id: &str,
        request: &Request,
        constraints: &[&str],
    ) -> Result<bool, DbError> {
        let table = self.schema.table(table_id)?;
        let constraint_ids: Vec<&str> = table
            .default_attribute_parameter_map()
            .into_iter()
            .filter(|(_, parameter)| constraints.contains(&parameter.as_str()))
            .map(|(attribute_id, _)| attribute_id)
            .collect();
        let (conditions, values): (Vec<(&str, &str)>, Vec<(&str, &str)>) = self
            .request_values(table_id, request)?
            .into_iter()
            .partition(|(attribute_id, _)| constraint_ids.contains(attribute_id));
        self.update(table_id, &values, &conditions).await
    }

    pub async fn delete_request(&self, table_id: &str, request: &Request) -> Result<bool, DbError> {
        let conditions = self.request_values(table_id, request)?;
        self.delete(table_id, &conditions).await
    }

    pub async fn select_request(&self, table_id: &str, request: &Request) -> Result<Vec<Record>, DbError> {
        let conditions = self.request_values(table_id, request)?;
        self.select_where(table_id, &conditions).await
    }

    pub async fn insert(&self, table_id: &str, values: &[(&str, &str)]) -> Result<bool, DbError> {
        let owned: Vec<(&str, String)> = values.iter().map(|(a, v)| (*a, v.to_string())).collect();
        let statement = DmlGenerator::new(self.schema).insert(table_id, &owned)?;
        Ok(self.executor.sql_template_command(&statement).await)
    }

    /// Updates rows matching every `(attribute_id, value)` condition.
    pub async fn update(
        &self,
        table_id: &str,
        values: &[(&str, &str)],
        conditions: &[(&str, &str)],
    ) -> Result<bool, DbError> {
        if conditions.is_empty() {
            return Err(DbError::Unconfirmed(format!("unconditional update of {}", table_id)));
        }
        let update_ids: Vec<&str> = values.iter().map(|(a, _)| *a).collect();
        let condition_ids: Vec<&str> = conditions.iter().map(|(a, _)| *a).collect();
        let sql = DmlGenerator::new(self.schema).update_template(table_id, &update_ids, &condition_ids)?;
        let params = values
            .iter()
            .chain(conditions.iter())
            .map(|(_, v)| v.to_string())
            .collect();
        Ok(self
            .executor
            .sql_template_command(&SqlTemplate::new(sql, params))
            .await)
    }

    pub async fn delete(&self, table_id: &str, conditions: &[(&str, &str)]) -> Result<bool, DbError> {
        if conditions.is_empty() {
            return Err(DbError::Unconfirmed(format!("unconditional delete from {}", table_id)));
        }
        let condition_ids: Vec<&str> = conditions.iter().map(|(a, _)| *a).collect();
        let sql = DmlGenerator::new(self.schema).delete_template(table_id, &condition_ids)?;
        let params = conditions.iter().map(|(_, v)| v.to_string()).collect();
        Ok(self
            .executor
            .sql_template_command(&SqlTemplate::new(sql, params))
            .await)
    }

    /// Truncates the table.
    pub async fn purge(&self, table_id: &str, confirmed: bool) -> Result<bool, DbError> {
        if !confirmed {
            return Err(DbError::Unconfirmed(format!("truncate of {}", table_id)));
        }
        let sql = DmlGenerator::new(self.schema).truncate_table_sql(table_id)?;
        Ok(self.executor.sql_template_command(&SqlTemplate::raw(sql)).await)
    }

    /// Runs the query and keys each row by the selected attribute ids.
    pub async fn select(&self, query: &QueryBuilder<'_>) -> Result<Vec<Record>, DbError> {
        let Some(sql) = query.get_sql()? else {
            return Ok(Vec::new());
        };
        let rows = self.executor.select_rows(&sql).await;
        Ok(rows_to_records(query.select_list(), rows))
    }

    /// All attributes of `table_id` for rows matching every `(attribute_id, value)` condition.
    pub async fn select_where(
        &self,
        table_id: &str,
        conditions: &[(&str, &str)],
    ) -> Result<Vec<Record>, DbError> {
        let table = self.schema.table(table_id)?;
        let mut query = QueryBuilder::new(self.schema);
        query.add_select_table(table_id)?;
        let mut cb = ConditionBuilder::new(self.schema);
        for (attribute_id, value) in conditions {
            let attribute = table.attribute(attribute_id)?;
            cb.add_value_condition(
                AttributeRef::new(table_id, attribute_id),
                CompareOp::Eq,
                Literal::typed(attribute, value),
                LogicalOp::And,
            );
        }
        query.set_condition(cb);
        self.select(&query).await
    }
}

pub fn rows_to_records(select_list: &[AttributeRef], rows: Vec<RowTuple>) -> Vec<Record> {
    rows.into_iter()
        .map(|row| {
            select_list
                .iter()
                .zip(row)
                .map(|(attr, value)| (attr.attribute_id.clone(), value))
                .collect()
        })
        .collect()
}

/// Writes records as CSV with the given attribute ids as columns; NULL becomes an empty field.
pub fn write_records_csv<P: AsRef<Path>>(
    records: &[Record],
    attribute_ids: &[&str],
    path: P,
) -> Result<(), DbError> {
    let mut wtr = csv::Writer::from_path(path.as_ref())
        .map_err(|e| DbError::Export(e.to_string()))?;
    wtr.write_record(attribute_ids)?;
    for record in records {
        let fields: Vec<&str> = attribute_ids
            .iter()
            .map(|id| record.get(*id).and_then(|v| v.as_deref()).unwrap_or(""))
            .collect();
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(())
}
