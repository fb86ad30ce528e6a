//! SQL scripts executed atomically.
//!
//! A [`Script`] is an ordered list of statements. [`execute_script`] runs all of
//! them inside a single transaction: either every statement is committed or the
//! whole script is rolled back and the failing statement's error is returned.

use crate::db::{Connection, ConnectionError, Pool, run_in_transaction};
use crate::error::{DbError, DbResult};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Ordered SQL statements to run in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    statements: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a script from statements, skipping blank ones.
    pub fn from_statements<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut script = Self::new();
        for sql in statements {
            script.push(sql);
        }
        script
    }

    /// Append a statement. Blank statements are ignored.
    pub fn push(&mut self, sql: impl Into<String>) {
        let sql = sql.into();
        if !sql.trim().is_empty() {
            self.statements.push(sql);
        }
    }

    /// Append the contents of a SQL file as a single batch.
    pub async fn append_file(&mut self, path: impl AsRef<Path>) -> DbResult<()> {
        let path = path.as_ref();
        let sql = tokio::fs::read_to_string(path).await.map_err(|e| {
            DbError::invalid_input(format!("Cannot read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), bytes = sql.len(), "Loaded SQL file");
        self.push(sql);
        Ok(())
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Result of one committed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementReport {
    pub sql: String,
    pub rows_affected: u64,
}

/// Result of a committed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptReport {
    pub statements: Vec<StatementReport>,
    pub total_rows_affected: u64,
}

impl ScriptReport {
    fn new(statements: Vec<StatementReport>) -> Self {
        let total_rows_affected = statements.iter().map(|s| s.rows_affected).sum();
        Self {
            statements,
            total_rows_affected,
        }
    }
}

/// Run every statement of `script` inside one transaction.
pub async fn execute_script<P>(pool: &P, script: &Script) -> DbResult<ScriptReport>
where
    P: Pool,
    DbError: From<ConnectionError<P>>,
{
    if script.is_empty() {
        return Err(DbError::invalid_input("Script contains no statements"));
    }

    let statements = script.statements.clone();
    run_in_transaction(pool, move |conn| {
        Box::pin(async move {
            let mut reports = Vec::with_capacity(statements.len());
            for sql in statements {
                let rows_affected = conn.execute(&sql).await?;
                debug!(rows_affected, "Statement executed");
                reports.push(StatementReport { sql, rows_affected });
            }
            Ok::<_, DbError>(ScriptReport::new(reports))
        })
    })
    .await
}
