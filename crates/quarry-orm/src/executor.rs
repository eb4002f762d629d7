//! Statement execution against a SQLite pool.

use quarry_core::{BulkDeleteQuery, BulkUpdateQuery, Condition, DialectKind, Model, Operand};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::driver::DriverError;
use crate::error::{OrmError, Result};
use crate::normalize::normalize;

/// Runs compiled statements and classifies their failures.
pub struct Executor {
    pool: SqlitePool,
}

impl Executor {
    /// The dialect statements are compiled for.
    pub const DIALECT: DialectKind = DialectKind::Sqlite;

    /// Creates a new executor.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Executes `sql`, returning the number of affected rows.
    ///
    /// Database errors are normalized against `model` and returned as
    /// [`OrmError::Constraint`].
    pub async fn execute(&self, sql: &str, model: Option<&Model>) -> Result<u64> {
        debug!(sql = %sql, "Executing SQL");
        match sqlx::query(sql).execute(&self.pool).await {
            Ok(result) => Ok(result.rows_affected()),
            Err(err) => Err(Self::classify(&err, sql, model).unwrap_or(OrmError::Database(err))),
        }
    }

    /// Deletes every row of `model` matching `condition`.
    pub async fn bulk_delete(&self, model: &Model, condition: Condition) -> Result<u64> {
        let sql = BulkDeleteQuery::new(Self::DIALECT.policy())
            .from_model(model)
            .where_clause(condition)
            .build()?;
        let affected = self.execute(&sql, Some(model)).await?;
        info!(model = %model.name, affected, "Bulk delete finished");
        Ok(affected)
    }

    /// Updates every row of `model` matching `condition`.
    ///
    /// Does nothing when `assignments` is empty.
    pub async fn bulk_update<I, S>(
        &self,
        model: &Model,
        assignments: I,
        condition: Condition,
    ) -> Result<u64>
    where
        I: IntoIterator<Item = (S, Operand)>,
        S: AsRef<str>,
    {
        let mut assignments = assignments.into_iter();
        let Some((attribute, value)) = assignments.next() else {
            debug!(model = %model.name, "Bulk update without assignments, skipping");
            return Ok(0);
        };

        let mut query = BulkUpdateQuery::new(Self::DIALECT.policy())
            .model(model)
            .set(attribute.as_ref(), value);
        for (attribute, value) in assignments {
            query = query.set(attribute.as_ref(), value);
        }
        let sql = query.where_clause(condition).build()?;

        let affected = self.execute(&sql, Some(model)).await?;
        info!(model = %model.name, affected, "Bulk update finished");
        Ok(affected)
    }

    /// Normalizes a statement failure; `None` for errors that did not come
    /// from the database itself.
    fn classify(err: &sqlx::Error, sql: &str, model: Option<&Model>) -> Option<OrmError> {
        if !matches!(err, sqlx::Error::Database(_)) {
            return None;
        }
        let raw = DriverError::from(err).sql(sql);
        Some(OrmError::Constraint(normalize(&raw, Self::DIALECT, model)))
    }
}
