use crate::{
    errors::DbError,
    models::schema::{AttributeDefinition, IndexType, SchemaDefinition, TableDefinition},
};

/// MySQL-dialect DDL for a schema definition.
pub struct DdlGenerator<'a> {
    schema: &'a SchemaDefinition,
}

impl<'a> DdlGenerator<'a> {
    pub fn new(schema: &'a SchemaDefinition) -> Self {
        Self { schema }
    }

    pub fn create_database_sql(&self, database_name: &str) -> Vec<String> {
        let mut statements = self.drop_database_sql(database_name);
        statements.push(format!("CREATE DATABASE {}", database_name));
        statements
    }

    pub fn drop_database_sql(&self, database_name: &str) -> Vec<String> {
        vec![format!("DROP DATABASE IF EXISTS {}", database_name)]
    }

    /// `USE`, `DROP TABLE IF EXISTS` and `CREATE TABLE` for one table.
    pub fn create_table_sql(&self, table_id: &str) -> Result<Vec<String>, DbError> {
        let table = self.schema.table(table_id)?;
        Ok(vec![
            format!("USE {}", self.schema.database_name),
            format!("DROP TABLE IF EXISTS {}", table.table_name),
            create_table_statement(table),
        ])
    }

    pub fn drop_table_sql(&self, table_id: &str) -> Result<Vec<String>, DbError> {
        let table = self.schema.table(table_id)?;
        Ok(vec![
            format!("USE {}", self.schema.database_name),
            format!("DROP TABLE IF EXISTS {}", table.table_name),
        ])
    }

    pub fn create_indices_sql(&self, table_id: &str) -> Result<Vec<String>, DbError> {
        let table = self.schema.table(table_id)?;
        let mut statements = Vec::with_capacity(table.indices.len());
        for index in &table.indices {
            let names = index
                .attributes
                .iter()
                .map(|id| table.attribute_name(id))
                .collect::<Result<Vec<_>, _>>()?;
            let keyword = match index.index_type {
                IndexType::Unique => "UNIQUE ",
                IndexType::Fulltext => "FULLTEXT ",
                IndexType::Search => "",
            };
            statements.push(format!(
                "CREATE {}INDEX {} ON {} ({})",
                keyword,
                index.name,
                table.table_name,
                names.join(", ")
            ));
        }
        Ok(statements)
    }

    /// Database, then every table followed by its indices.
    pub fn create_schema_sql(&self) -> Result<Vec<String>, DbError> {
        let mut statements = self.create_database_sql(&self.schema.database_name);
        for table_id in self.schema.table_ids() {
            statements.extend(self.create_table_sql(table_id)?);
            statements.extend(self.create_indices_sql(table_id)?);
        }
        Ok(statements)
    }
}

fn create_table_statement(table: &TableDefinition) -> String {
    let mut clauses: Vec<String> = table
        .ordered_attributes()
        .into_iter()
        .map(column_clause)
        .collect();

    let keys: Vec<&str> = table
        .ordered_attributes()
        .into_iter()
        .filter(|a| a.primary_key)
        .map(|a| a.attribute_name.as_str())
        .collect();
    if !keys.is_empty() {
        clauses.push(format!("PRIMARY KEY ({})", keys.join(",")));
    }

    format!(
        "CREATE TABLE {} (\n{}\n) ENGINE={}",
        table.table_name,
        clauses.join(",\n"),
        table.table_type.engine()
    )
}

fn column_clause(attr: &AttributeDefinition) -> String {
    let base = attr.base_type();
    let type_clause = match base.as_str() {
        "CHAR" | "VARCHAR" => format!("{}({})", base, attr.width),
        "DECIMAL" | "NUMERIC" => format!("{}({},{})", base, attr.width, attr.precision),
        _ => attr.sql_type.trim().to_uppercase(),
    };
    let null_clause = if attr.nullable {
        "null default null"
    } else {
        "not null"
    };
    format!("{} {} {}", attr.attribute_name, type_clause, null_clause)
}
