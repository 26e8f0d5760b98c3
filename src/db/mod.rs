use async_trait::async_trait;

use crate::{errors::DbError, sql::dml::SqlTemplate};

pub mod adapter;
pub mod executor;
pub mod mysql;

/// One row as returned by the driver, columns in select order.
pub type RowTuple = Vec<Option<String>>;

#[async_trait]
pub trait DbClient: Send + Sync {
    /// Runs one statement outside any explicit transaction; returns rows affected.
    async fn execute(&self, statement: &SqlTemplate) -> Result<u64, DbError>;
    async fn query(&self, query: &str) -> Result<Vec<RowTuple>, DbError>;
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, DbError>;
    async fn list_tables(&self) -> Result<Vec<String>, DbError>;
}

/// A session-bound transaction. Everything run through it shares one connection.
#[async_trait]
pub trait Transaction: Send {
    async fn execute(&mut self, statement: &SqlTemplate) -> Result<u64, DbError>;
    /// Warnings raised by the last statement.
    async fn warnings(&mut self) -> Result<Vec<String>, DbError>;
    async fn commit(self: Box<Self>) -> Result<(), DbError>;
    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}
