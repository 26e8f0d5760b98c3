use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use log::{info, warn};
use sqlx::{
    mysql::{MySqlArguments, MySqlPoolOptions, MySqlRow},
    Executor, MySql, MySqlPool, Row, TypeInfo, ValueRef,
};

use crate::{
    errors::DbError,
    models::connections::ConnectionConfig,
    sql::dml::SqlTemplate,
};

use super::{DbClient, RowTuple, Transaction};

pub struct MySqlClient {
    pub pool: MySqlPool,
}

impl MySqlClient {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        Self::connect_with(&ConnectionConfig {
            database_url: database_url.to_string(),
            max_connections: 5,
        })
        .await
    }

    pub async fn connect_with(config: &ConnectionConfig) -> Result<Self, DbError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        info!("Connected with a pool of {} connections", config.max_connections);

        Ok(Self { pool })
    }
}

fn bind(statement: &SqlTemplate) -> sqlx::query::Query<'_, MySql, MySqlArguments> {
    statement
        .params
        .iter()
        .fold(sqlx::query(&statement.sql), |q, p| q.bind(p.as_str()))
}

/// Column value as text, whatever its MySQL type.
fn column_text(row: &MySqlRow, index: usize) -> Option<String> {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v;
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(index) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<Decimal>, _>(index) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return v.map(|v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(index) {
        return v.map(|v| v.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(index) {
        return v.map(|v| v.format("%Y-%m-%d").to_string());
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v.map(|v| String::from_utf8_lossy(&v).into_owned());
    }
    if let Ok(raw) = row.try_get_raw(index) {
        if !raw.is_null() {
            warn!(
                "Column {} of type {} has no text conversion",
                index,
                raw.type_info().name()
            );
        }
    }
    None
}

#[async_trait]
impl DbClient for MySqlClient {
    async fn execute(&self, statement: &SqlTemplate) -> Result<u64, DbError> {
        let result = if statement.is_raw() {
            (&self.pool).execute(statement.sql.as_str()).await?
        } else {
            bind(statement).execute(&self.pool).await?
        };
        Ok(result.rows_affected())
    }

    async fn query(&self, query: &str) -> Result<Vec<RowTuple>, DbError> {
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        Ok(rows
            .iter()
            .map(|row| (0..row.len()).map(|i| column_text(row, i)).collect())
            .collect())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, DbError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::Transaction(e.to_string()))?;
        Ok(Box::new(MySqlTransaction { tx }))
    }

    async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let rows = sqlx::query("SHOW TABLES")
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        Ok(rows.iter().filter_map(|row| column_text(row, 0)).collect())
    }
}

pub struct MySqlTransaction {
    tx: sqlx::Transaction<'static, MySql>,
}

#[async_trait]
impl Transaction for MySqlTransaction {
    async fn execute(&mut self, statement: &SqlTemplate) -> Result<u64, DbError> {
        let result = if statement.is_raw() {
            (&mut *self.tx).execute(statement.sql.as_str()).await
        } else {
            bind(statement).execute(&mut *self.tx).await
        };
        Ok(result.map_err(DbError::Sqlx)?.rows_affected())
    }

    async fn warnings(&mut self) -> Result<Vec<String>, DbError> {
        // Text protocol: preparing a statement would reset the diagnostics area.
        let rows = (&mut *self.tx)
            .fetch_all("SHOW WARNINGS")
            .await
            .map_err(DbError::Sqlx)?;

        Ok(rows
            .iter()
            .map(|row| {
                let level = column_text(row, 0).unwrap_or_default();
                let code = column_text(row, 1).unwrap_or_default();
                let message = column_text(row, 2).unwrap_or_default();
                format!("{} {}: {}", level, code, message)
            })
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::Transaction(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::Transaction(e.to_string()))
    }
}
