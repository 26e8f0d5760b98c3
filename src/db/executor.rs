use log::{debug, error, warn};

use crate::{
    config::WarningAction,
    db::{DbClient, RowTuple, Transaction},
    errors::DbError,
    sql::dml::SqlTemplate,
};

/// Runs generated SQL and reports success as a boolean, logging the failing statement.
/// No retries.
pub struct SqlExecutor<'a> {
    client: &'a dyn DbClient,
    warning_action: WarningAction,
}

impl<'a> SqlExecutor<'a> {
    pub fn new(client: &'a dyn DbClient, warning_action: WarningAction) -> Self {
        Self {
            client,
            warning_action,
        }
    }

    /// Runs all statements in one transaction; rolls back on the first failure.
    pub async fn sql_command(&self, statements: &[SqlTemplate]) -> bool {
        self.sql_batch_template_command(statements, &[]).await
    }

    pub async fn sql_template_command(&self, statement: &SqlTemplate) -> bool {
        self.sql_batch_template_command(std::slice::from_ref(statement), &[])
            .await
    }

    /// `prepend` runs first, inside the same transaction as `statements`.
    pub async fn sql_batch_template_command(
        &self,
        statements: &[SqlTemplate],
        prepend: &[SqlTemplate],
    ) -> bool {
        let all: Vec<&SqlTemplate> = prepend.iter().chain(statements.iter()).collect();
        if all.is_empty() {
            return true;
        }
        match self.run_in_transaction(&all).await {
            Ok(()) => true,
            Err(e) => {
                error!("Batch of {} statements failed: {}", all.len(), e);
                false
            }
        }
    }

    /// Runs one statement on whatever connection the client hands out, without a transaction.
    pub async fn sql_command_unchecked(&self, statement: &SqlTemplate) -> bool {
        debug!("{}", statement);
        match self.client.execute(statement).await {
            Ok(_) => true,
            Err(e) => {
                error!("Statement failed: {} -- {}", statement, e);
                false
            }
        }
    }

    /// Row tuples of `query`, or an empty list when it fails.
    pub async fn select_rows(&self, query: &str) -> Vec<RowTuple> {
        debug!("{}", query);
        match self.client.query(query).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Query failed: {} -- {}", query, e);
                Vec::new()
            }
        }
    }

    async fn run_in_transaction(&self, statements: &[&SqlTemplate]) -> Result<(), DbError> {
        let mut tx = self.client.begin_transaction().await?;
        for statement in statements {
            if let Err(e) = self.execute_checked(tx.as_mut(), statement).await {
                error!("Statement failed: {} -- {}", statement, e);
                if let Err(rollback_error) = tx.rollback().await {
                    warn!("Rollback failed: {}", rollback_error);
                }
                return Err(e);
            }
        }
        tx.commit().await
    }

    async fn execute_checked(
        &self,
        tx: &mut dyn Transaction,
        statement: &SqlTemplate,
    ) -> Result<u64, DbError> {
        debug!("{}", statement);
        let affected = tx.execute(statement).await?;
        match self.warning_action {
            WarningAction::Ignore => {}
            WarningAction::Default => {
                for warning in tx.warnings().await? {
                    warn!("{} -- {}", warning, statement);
                }
            }
            WarningAction::Error => {
                let warnings = tx.warnings().await?;
                if !warnings.is_empty() {
                    return Err(DbError::Warning(warnings.join("; ")));
                }
            }
        }
        Ok(affected)
    }
}
