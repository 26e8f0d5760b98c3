use thiserror::Error;

/// Error type shared by the schema model, the SQL generators and the loader.
#[derive(Error, Debug)]
pub enum DbError {
    /// Error raised by the driver while running a statement.
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Unknown table or attribute id, or an inconsistent schema definition.
    #[error("Schema error: {0}")]
    Schema(String),
    /// Condition tree that cannot be rendered (e.g. unbalanced grouping).
    #[error("Condition error: {0}")]
    Condition(String),
    #[error("Import error: {0}")]
    Import(String),
    #[error("Export error: {0}")]
    Export(String),
    /// Configuration error (e.g. invalid database URL or unreadable config file).
    #[error("Configuration error: {0}")]
    Config(String),
    /// Transaction error (e.g. failed to commit or rollback a transaction).
    #[error("Transaction error: {0}")]
    Transaction(String),
    /// Connection error (e.g. issues with network or database connection).
    #[error("Connection error: {0}")]
    Connection(String),
    /// Driver warning escalated to an error by the warning policy.
    #[error("Warning treated as error: {0}")]
    Warning(String),
    /// Destructive operation requested without confirmation.
    #[error("Unconfirmed destructive operation: {0}")]
    Unconfirmed(String),
    #[error("Error: {0}")]
    General(String),
}

impl DbError {
    pub fn schema(msg: impl Into<String>) -> Self {
        DbError::Schema(msg.into())
    }

    pub fn unknown_table(table_id: &str) -> Self {
        DbError::Schema(format!("unknown table id {}", table_id))
    }

    pub fn unknown_attribute(table_id: &str, attribute_id: &str) -> Self {
        DbError::Schema(format!(
            "unknown attribute id {} in table {}",
            attribute_id, table_id
        ))
    }
}
